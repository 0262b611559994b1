use std::io::{ErrorKind, Read};
use std::iter::FusedIterator;

use tracing::{debug, trace};

use crate::{Error, Result};

/// Reads fixed length frames from a byte-synchronized frame stream.
///
/// An input that is not a whole number of frames results in
/// [Error::TruncatedFrame] for the partial frame at the end.
pub struct FrameSource<R>
where
    R: Read,
{
    reader: R,
    buf: Vec<u8>,
    frames_read: usize,
    bytes_read: usize,
    done: bool,
}

impl<R> FrameSource<R>
where
    R: Read,
{
    /// # Errors
    /// [Error::Config] if `frame_length` is 0.
    pub fn new(reader: R, frame_length: usize) -> Result<Self> {
        if frame_length == 0 {
            return Err(Error::Config("frame_length must be > 0".to_string()));
        }
        Ok(FrameSource {
            reader,
            buf: vec![0u8; frame_length],
            frames_read: 0,
            bytes_read: 0,
            done: false,
        })
    }

    #[must_use]
    pub fn frame_length(&self) -> usize {
        self.buf.len()
    }

    /// Number of complete frames read so far.
    #[must_use]
    pub fn frames_read(&self) -> usize {
        self.frames_read
    }

    /// Number of input bytes consumed by complete frames so far.
    #[must_use]
    pub fn bytes_read(&self) -> usize {
        self.bytes_read
    }

    /// Read the next frame. The returned slice is only valid until the next call.
    ///
    /// Returns `Ok(None)` if the input ended exactly on a frame boundary.
    ///
    /// # Errors
    /// [Error::TruncatedFrame] if the input ends part way through a frame, or
    /// [Error::Io] for any other read error. Once an error is returned, or the end
    /// of input is reached, all further calls return `Ok(None)`.
    pub fn next_frame(&mut self) -> Result<Option<&[u8]>> {
        if self.done {
            return Ok(None);
        }
        let num = match fill(&mut self.reader, &mut self.buf) {
            Ok(num) => num,
            Err(err) => {
                self.done = true;
                return Err(err.into());
            }
        };
        if num == 0 {
            debug!(
                frames = self.frames_read,
                bytes = self.bytes_read,
                "end of frames"
            );
            self.done = true;
            return Ok(None);
        }
        if num < self.buf.len() {
            self.done = true;
            return Err(Error::TruncatedFrame {
                frame: self.frames_read,
                offset: self.bytes_read,
                actual: num,
                expected: self.buf.len(),
            });
        }
        trace!(frame = self.frames_read, offset = self.bytes_read, "frame");
        self.frames_read += 1;
        self.bytes_read += num;

        Ok(Some(&self.buf))
    }
}

impl<R> Iterator for FrameSource<R>
where
    R: Read,
{
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_frame().map(|f| f.map(<[u8]>::to_vec)).transpose()
    }
}

impl<R> FusedIterator for FrameSource<R> where R: Read {}

/// Read from `reader` until `buf` is full or EOF, returning the number of bytes read.
fn fill<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut num = 0;
    while num < buf.len() {
        match reader.read(&mut buf[num..]) {
            Ok(0) => break,
            Ok(n) => num += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(num)
}
