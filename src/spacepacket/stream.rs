use std::io::{ErrorKind, Read};
use std::iter::FusedIterator;

use super::{Packet, PacketAssembler, PayloadSource, State};
use crate::Result;

/// [PayloadSource] for a plain, byte-synchronized packet stream, i.e., one with no
/// framing at all. The stream is read in chunks of up to `chunk_size` bytes.
pub struct StreamPayloads<R>
where
    R: Read,
{
    reader: R,
    buf: Vec<u8>,
}

impl<R> StreamPayloads<R>
where
    R: Read,
{
    pub const DEFAULT_CHUNK_SIZE: usize = 8192;

    pub fn new(reader: R) -> Self {
        Self::with_chunk_size(reader, Self::DEFAULT_CHUNK_SIZE)
    }

    /// A `chunk_size` of 0 is treated as 1.
    pub fn with_chunk_size(reader: R, chunk_size: usize) -> Self {
        StreamPayloads {
            reader,
            buf: vec![0u8; chunk_size.max(1)],
        }
    }
}

impl<R> PayloadSource for StreamPayloads<R>
where
    R: Read,
{
    fn next_payload(&mut self) -> Result<Option<&[u8]>> {
        loop {
            match self.reader.read(&mut self.buf) {
                Ok(0) => return Ok(None),
                Ok(n) => return Ok(Some(&self.buf[..n])),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            }
        }
    }
}

/// Iterator of [Packet]s read from an unframed packet stream. See [read_packets].
pub struct PacketReaderIter<R>
where
    R: Read,
{
    assembler: PacketAssembler<StreamPayloads<R>>,
}

impl<R> PacketReaderIter<R>
where
    R: Read,
{
    #[must_use]
    pub fn state(&self) -> State {
        self.assembler.state()
    }
}

impl<R> Iterator for PacketReaderIter<R>
where
    R: Read,
{
    type Item = Result<Packet>;

    fn next(&mut self) -> Option<Self::Item> {
        self.assembler.next_packet().transpose()
    }
}

impl<R> FusedIterator for PacketReaderIter<R> where R: Read {}

/// Return an iterator providing [Packet] data read from a byte synchronized
/// packet stream, e.g., a level-0 packet file.
///
/// A stream that ends part way through a packet results in a final
/// [crate::Error::TruncatedPacket].
///
/// # Examples
/// ```
/// use ccsds_cadu::read_packets;
///
/// let dat: &[u8] = &[
///     // primary header bytes
///     0xd, 0x59, 0xd2, 0xab, 0x0, 0x9,
///     // CDS timecode bytes in secondary header
///     0x52, 0xc0, 0x0, 0x0, 0x0, 0xa7, 0x0, 0xdb, 0xff,
///     // minimum 1 byte of user data
///     0xff
/// ];
///
/// read_packets(dat).for_each(|zult| {
///     let packet = zult.unwrap();
///     assert_eq!(packet.header.apid, 1369);
/// });
/// ```
pub fn read_packets<R>(reader: R) -> PacketReaderIter<R>
where
    R: Read,
{
    PacketReaderIter {
        assembler: PacketAssembler::new(StreamPayloads::new(reader)),
    }
}
