//! CCSDS frame (CADU) handling.
//!
//! Frames are expected to already be byte-synchronized, i.e., the input is a flat
//! concatenation of fixed length frames each starting with a sync marker.
mod packets;
mod source;
mod sync;

use std::io::Read;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::{Error, Result};

pub use packets::*;
pub use source::*;
pub use sync::*;

/// Default CCSDS attached sync marker.
pub const ASM: [u8; 4] = [0x1a, 0xcf, 0xfc, 0x1d];

/// Describes the layout of the frames in a framed input.
///
/// # Examples
/// ```
/// use ccsds_cadu::framing::{FramingConfig, ASM};
///
/// let config = FramingConfig::builder()
///     .frame_length(1024)
///     .sync_marker_length(4)
///     .sync_marker(ASM.to_vec())
///     .build();
/// config.validate().unwrap();
/// assert_eq!(config.payload_length(), 1020);
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TypedBuilder)]
pub struct FramingConfig {
    /// Total frame length in bytes, including the sync marker.
    pub frame_length: usize,
    /// Number of sync marker bytes at the start of each frame.
    #[builder(default)]
    #[serde(default)]
    pub sync_marker_length: usize,
    /// If set, each frame's sync marker must match these bytes exactly. Must be
    /// `sync_marker_length` bytes long.
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    pub sync_marker: Option<Vec<u8>>,
    /// Reject packets whose primary header version is not 0.
    #[builder(default)]
    #[serde(default)]
    pub strict_version: bool,
}

impl FramingConfig {
    #[must_use]
    pub fn new(frame_length: usize, sync_marker_length: usize) -> Self {
        FramingConfig {
            frame_length,
            sync_marker_length,
            sync_marker: None,
            strict_version: false,
        }
    }

    /// Read a JSON encoded config, e.g.,
    /// `{"frame_length": 1024, "sync_marker_length": 4}`.
    ///
    /// # Errors
    /// [Error::Json] if decoding fails, or [Error::Config] if the decoded config is
    /// invalid.
    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self> {
        let config: FramingConfig = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    /// Number of packet zone bytes in each frame.
    #[must_use]
    pub fn payload_length(&self) -> usize {
        self.frame_length.saturating_sub(self.sync_marker_length)
    }

    /// # Errors
    /// [Error::Config] if the frame length is 0, the sync marker does not leave room
    /// for any payload, or the expected sync marker has the wrong length.
    pub fn validate(&self) -> Result<()> {
        if self.frame_length == 0 {
            return Err(Error::Config("frame_length must be > 0".to_string()));
        }
        if self.sync_marker_length >= self.frame_length {
            return Err(Error::Config(format!(
                "sync_marker_length must be less than frame_length; sync_marker_length={} frame_length={}",
                self.sync_marker_length, self.frame_length
            )));
        }
        if let Some(ref marker) = self.sync_marker {
            if marker.len() != self.sync_marker_length {
                return Err(Error::Config(format!(
                    "sync_marker has {} bytes, expected sync_marker_length={}",
                    marker.len(),
                    self.sync_marker_length
                )));
            }
        }
        Ok(())
    }
}
