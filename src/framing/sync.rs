use std::io::Read;

use tracing::warn;

use super::FrameSource;
use crate::spacepacket::PayloadSource;
use crate::{Error, Result};

/// Removes the sync marker from the start of each frame.
///
/// Marker bytes are not checked unless an expected marker is provided using
/// [SyncStripper::with_marker].
#[derive(Debug, Clone)]
pub struct SyncStripper {
    sync_marker_length: usize,
    marker: Option<Vec<u8>>,
    // Number of frames stripped so far
    count: usize,
}

impl SyncStripper {
    pub fn new(sync_marker_length: usize) -> Self {
        SyncStripper {
            sync_marker_length,
            marker: None,
            count: 0,
        }
    }

    /// Require every frame to start with `marker`. The sync marker length becomes
    /// the length of `marker`.
    pub fn with_marker(marker: &[u8]) -> Self {
        SyncStripper {
            sync_marker_length: marker.len(),
            marker: Some(marker.to_vec()),
            count: 0,
        }
    }

    #[must_use]
    pub fn sync_marker_length(&self) -> usize {
        self.sync_marker_length
    }

    /// Return the payload of `frame`, i.e., everything after the sync marker.
    ///
    /// # Errors
    /// [Error::NotEnoughData] if the frame is not longer than the sync marker, or
    /// [Error::InvalidSyncMarker] if an expected marker was set and does not match.
    pub fn strip<'a>(&mut self, frame: &'a [u8]) -> Result<&'a [u8]> {
        let idx = self.count;
        self.count += 1;
        if frame.len() <= self.sync_marker_length {
            return Err(Error::NotEnoughData {
                actual: frame.len(),
                minimum: self.sync_marker_length + 1,
            });
        }
        let (marker, payload) = frame.split_at(self.sync_marker_length);
        if let Some(ref expected) = self.marker {
            if marker != &expected[..] {
                warn!(frame = idx, ?marker, "sync marker mismatch");
                return Err(Error::InvalidSyncMarker {
                    frame: idx,
                    expected: expected.clone(),
                    actual: marker.to_vec(),
                });
            }
        }
        Ok(payload)
    }
}

/// [PayloadSource] providing the payload, i.e., the packet zone bytes, of each
/// frame read from a [FrameSource].
pub struct FramedPayloads<R>
where
    R: Read,
{
    frames: FrameSource<R>,
    stripper: SyncStripper,
}

impl<R> FramedPayloads<R>
where
    R: Read,
{
    pub fn new(frames: FrameSource<R>, stripper: SyncStripper) -> Self {
        FramedPayloads { frames, stripper }
    }

    #[must_use]
    pub fn frames_read(&self) -> usize {
        self.frames.frames_read()
    }
}

impl<R> PayloadSource for FramedPayloads<R>
where
    R: Read,
{
    fn next_payload(&mut self) -> Result<Option<&[u8]>> {
        match self.frames.next_frame()? {
            Some(frame) => Ok(Some(self.stripper.strip(frame)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framing::ASM;

    #[test]
    fn strips_marker() {
        let frame = [0x1a, 0xcf, 0xfc, 0x1d, 0x1, 0x2, 0x3];
        let mut stripper = SyncStripper::new(4);
        assert_eq!(stripper.strip(&frame).unwrap(), [0x1, 0x2, 0x3]);
    }

    #[test]
    fn strips_nothing_without_marker() {
        let frame = [0x1, 0x2, 0x3];
        let mut stripper = SyncStripper::new(0);
        assert_eq!(stripper.strip(&frame).unwrap(), frame);
    }

    #[test]
    fn marker_content_is_ignored_by_default() {
        let frame = [0xde, 0xad, 0xbe, 0xef, 0x1];
        let mut stripper = SyncStripper::new(4);
        assert_eq!(stripper.strip(&frame).unwrap(), [0x1]);
    }

    #[test]
    fn frame_too_short() {
        let mut stripper = SyncStripper::new(4);
        let zult = stripper.strip(&ASM);
        assert!(
            matches!(
                zult,
                Err(Error::NotEnoughData {
                    actual: 4,
                    minimum: 5
                })
            ),
            "{zult:?}"
        );
    }

    #[test]
    fn validates_expected_marker() {
        let mut stripper = SyncStripper::with_marker(&ASM);
        assert_eq!(stripper.sync_marker_length(), 4);

        let good = [0x1a, 0xcf, 0xfc, 0x1d, 0x1];
        let bad = [0x1a, 0xcf, 0xfc, 0x1e, 0x2];
        assert_eq!(stripper.strip(&good).unwrap(), [0x1]);

        let zult = stripper.strip(&bad);
        match zult {
            Err(Error::InvalidSyncMarker {
                frame,
                expected,
                actual,
            }) => {
                assert_eq!(frame, 1);
                assert_eq!(expected, ASM);
                assert_eq!(actual, [0x1a, 0xcf, 0xfc, 0x1e]);
            }
            _ => panic!("expected sync marker error"),
        }
    }

    #[test]
    fn framed_payloads() {
        #[rustfmt::skip]
        let dat: &[u8] = &[
            0x1a, 0xcf, 0xfc, 0x1d, 0x1, 0x2,
            0x1a, 0xcf, 0xfc, 0x1d, 0x3, 0x4,
        ];
        let frames = FrameSource::new(dat, 6).unwrap();
        let mut payloads = FramedPayloads::new(frames, SyncStripper::new(4));

        assert_eq!(payloads.next_payload().unwrap(), Some(&[0x1u8, 0x2][..]));
        assert_eq!(payloads.next_payload().unwrap(), Some(&[0x3u8, 0x4][..]));
        assert_eq!(payloads.next_payload().unwrap(), None);
        assert_eq!(payloads.frames_read(), 2);
    }
}
