use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The input could not be opened.
    #[error("failed to open {path:?}: {source}")]
    SourceUnavailable {
        path: PathBuf,
        source: std::io::Error,
    },
    /// IO error reading from an already opened input.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The input ended part way through a frame, i.e., its length is not a multiple
    /// of the frame length.
    #[error("truncated frame {frame} at offset {offset}; got {actual} of {expected} bytes")]
    TruncatedFrame {
        /// Zero-based index of the partial frame
        frame: usize,
        /// Input byte offset of the start of the partial frame
        offset: usize,
        actual: usize,
        expected: usize,
    },
    /// The input ended with an incomplete packet in the packet zone.
    #[error("truncated packet at packet zone offset {offset}; have {buffered} of {needed} bytes")]
    TruncatedPacket {
        offset: usize,
        buffered: usize,
        needed: usize,
    },

    #[error("Not enough bytes")]
    NotEnoughData { actual: usize, minimum: usize },

    #[error("unsupported packet version {version}")]
    InvalidHeader { version: u8 },

    #[error("sync marker mismatch in frame {frame}; expected {expected:02x?}, got {actual:02x?}")]
    InvalidSyncMarker {
        frame: usize,
        expected: Vec<u8>,
        actual: Vec<u8>,
    },

    #[error("Invalid framing config: {0}")]
    Config(String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
