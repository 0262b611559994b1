use tracing::{debug, trace, warn};

use super::{Packet, PrimaryHeader};
use crate::{Error, Result};

/// Provides the packet zone byte stream in chunks, e.g., one frame payload at a time.
pub trait PayloadSource {
    /// Return the next chunk of packet zone bytes, or `None` at the clean end of the
    /// input. Returned chunks are never empty.
    ///
    /// # Errors
    /// Any error reading from the underlying input.
    fn next_payload(&mut self) -> Result<Option<&[u8]>>;
}

/// Where a [PacketAssembler] is in producing packets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Fewer bytes than a primary header are buffered.
    Filling,
    /// A primary header is buffered, but not yet the entire packet.
    HeaderReady,
    /// The entire packet indicated by the buffered header is available.
    PacketReady,
    /// The input ended on a packet boundary. No more packets.
    Exhausted,
    /// The input ended part way through a packet. No more packets.
    Truncated,
    /// Reading or decoding failed. No more packets.
    Failed,
}

impl State {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, State::Exhausted | State::Truncated | State::Failed)
    }
}

/// Reassembles packets from the packet zone chunks provided by a [PayloadSource].
///
/// Packets do not have to line up with chunk boundaries. The buffer only ever holds
/// the bytes of the packet currently being assembled plus whatever remains of the
/// last chunk read, so memory use is bounded by about one chunk plus one packet.
///
/// Once a terminal [State] is reached the source is dropped and no further reads are
/// performed.
pub struct PacketAssembler<S>
where
    S: PayloadSource,
{
    source: Option<S>,
    // Packet zone bytes not yet emitted as packets
    buffer: Vec<u8>,
    // Packet zone offset of buffer[0]
    offset: usize,
    state: State,
    strict_version: bool,
}

impl<S> PacketAssembler<S>
where
    S: PayloadSource,
{
    pub fn new(source: S) -> Self {
        PacketAssembler {
            source: Some(source),
            buffer: Vec::new(),
            offset: 0,
            state: State::Filling,
            strict_version: false,
        }
    }

    /// Fail with [Error::InvalidHeader] for any header that is not a version 1 CCSDS
    /// packet header. Otherwise the version is not checked.
    #[must_use]
    pub fn with_strict_version(mut self, strict: bool) -> Self {
        self.strict_version = strict;
        self
    }

    #[must_use]
    pub fn state(&self) -> State {
        self.state
    }

    /// Number of packet zone bytes currently buffered.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// True once the source has been dropped, which happens when a terminal state is
    /// reached.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.source.is_none()
    }

    /// Produce the next packet.
    ///
    /// Returns `Ok(None)` when the input is exhausted, and for every call after an
    /// error has been returned.
    ///
    /// # Errors
    /// [Error::TruncatedPacket] if the input ends with a partial packet, otherwise any
    /// error from the source. Errors are only returned once.
    pub fn next_packet(&mut self) -> Result<Option<Packet>> {
        if self.state.is_terminal() {
            return Ok(None);
        }
        match self.assemble() {
            Ok(Some(packet)) => Ok(Some(packet)),
            Ok(None) => {
                debug!(offset = self.offset, "packet zone exhausted");
                self.release(State::Exhausted);
                Ok(None)
            }
            Err(err) => {
                let state = match err {
                    Error::TruncatedPacket { .. } => State::Truncated,
                    _ => State::Failed,
                };
                self.release(state);
                Err(err)
            }
        }
    }

    fn assemble(&mut self) -> Result<Option<Packet>> {
        if !self.fill(PrimaryHeader::LEN)? {
            if self.buffer.is_empty() {
                return Ok(None);
            }
            return Err(self.truncated(PrimaryHeader::LEN));
        }

        // The start of the buffer is always the start of a packet
        let header = PrimaryHeader::decode(&self.buffer)?;
        if self.strict_version {
            if let Err(err) = header.validate_version() {
                warn!(offset = self.offset, ?header, "unsupported packet version");
                return Err(err);
            }
        }
        self.state = State::HeaderReady;

        let need = header.packet_len();
        if !self.fill(need)? {
            return Err(self.truncated(need));
        }
        self.state = State::PacketReady;

        let packet = Packet {
            header,
            data: self.buffer.drain(..need).collect(),
            offset: self.offset,
        };
        trace!(
            apid = header.apid,
            seq = header.sequence_id,
            len = need,
            offset = self.offset,
            "packet"
        );
        self.offset += need;
        self.state = if self.buffer.len() < PrimaryHeader::LEN {
            State::Filling
        } else {
            State::HeaderReady
        };

        Ok(Some(packet))
    }

    /// Pull chunks from the source until at least `len` bytes are buffered. Returns
    /// false if the source ends first.
    fn fill(&mut self, len: usize) -> Result<bool> {
        while self.buffer.len() < len {
            let Some(source) = self.source.as_mut() else {
                return Ok(false);
            };
            match source.next_payload()? {
                Some(payload) => {
                    trace!(len = payload.len(), buffered = self.buffer.len(), "payload");
                    self.buffer.extend_from_slice(payload);
                }
                None => return Ok(false),
            }
        }
        Ok(true)
    }

    fn truncated(&self, needed: usize) -> Error {
        warn!(
            offset = self.offset,
            buffered = self.buffer.len(),
            needed,
            "input ended with a partial packet"
        );
        Error::TruncatedPacket {
            offset: self.offset,
            buffered: self.buffer.len(),
            needed,
        }
    }

    fn release(&mut self, state: State) {
        self.state = state;
        self.source = None;
        self.buffer = Vec::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Source handing out pre-chunked bytes.
    struct Chunks(VecDeque<Vec<u8>>, Option<Vec<u8>>);

    impl Chunks {
        fn new(chunks: &[&[u8]]) -> Self {
            Chunks(chunks.iter().map(|c| c.to_vec()).collect(), None)
        }
    }

    impl PayloadSource for Chunks {
        fn next_payload(&mut self) -> Result<Option<&[u8]>> {
            self.1 = self.0.pop_front();
            Ok(self.1.as_deref())
        }
    }

    struct Broken;

    impl PayloadSource for Broken {
        fn next_payload(&mut self) -> Result<Option<&[u8]>> {
            Err(Error::Io(std::io::Error::other("boom")))
        }
    }

    // apid 1369, seq 1, len_minus1 0, user data 0xaa
    const P1: [u8; 7] = [0xd, 0x59, 0xc0, 0x01, 0x0, 0x0, 0xaa];
    // apid 1369, seq 2, len_minus1 2, user data 0xbb 0xcc 0xdd
    const P2: [u8; 9] = [0xd, 0x59, 0xc0, 0x02, 0x0, 0x2, 0xbb, 0xcc, 0xdd];

    #[test]
    fn packets_within_one_chunk() {
        let chunk = [&P1[..], &P2[..]].concat();
        let mut asm = PacketAssembler::new(Chunks::new(&[&chunk[..]]));

        let p = asm.next_packet().unwrap().unwrap();
        assert_eq!(p.data, P1);
        assert_eq!(p.offset, 0);
        assert_eq!(asm.state(), State::HeaderReady);

        let p = asm.next_packet().unwrap().unwrap();
        assert_eq!(p.data, P2);
        assert_eq!(p.offset, 7);
        assert_eq!(asm.state(), State::Filling);

        assert!(asm.next_packet().unwrap().is_none());
        assert_eq!(asm.state(), State::Exhausted);
        assert!(asm.is_released());
    }

    #[test]
    fn header_split_across_chunks() {
        let mut asm = PacketAssembler::new(Chunks::new(&[&P2[..2], &P2[2..5], &P2[5..]]));

        let p = asm.next_packet().unwrap().unwrap();
        assert_eq!(p.data, P2);
        assert_eq!(p.header.len_minus1, 2);
        assert!(asm.next_packet().unwrap().is_none());
    }

    #[test]
    fn empty_source_is_exhausted() {
        let mut asm = PacketAssembler::new(Chunks::new(&[]));
        assert!(asm.next_packet().unwrap().is_none());
        assert_eq!(asm.state(), State::Exhausted);
    }

    #[test]
    fn partial_header_is_truncated() {
        let chunk = [&P1[..], &P2[..3]].concat();
        let mut asm = PacketAssembler::new(Chunks::new(&[&chunk[..]]));

        assert!(asm.next_packet().unwrap().is_some());
        let zult = asm.next_packet();
        assert!(
            matches!(
                zult,
                Err(Error::TruncatedPacket {
                    offset: 7,
                    buffered: 3,
                    needed: 6
                })
            ),
            "{zult:?}"
        );
        assert_eq!(asm.state(), State::Truncated);
        assert!(asm.is_released());
        assert_eq!(asm.buffered(), 0);
        // only reported once
        assert!(asm.next_packet().unwrap().is_none());
    }

    #[test]
    fn partial_user_data_is_truncated() {
        let mut asm = PacketAssembler::new(Chunks::new(&[&P2[..8]]));
        let zult = asm.next_packet();
        assert!(
            matches!(
                zult,
                Err(Error::TruncatedPacket {
                    offset: 0,
                    buffered: 8,
                    needed: 9
                })
            ),
            "{zult:?}"
        );
    }

    #[test]
    fn source_errors_are_terminal() {
        let mut asm = PacketAssembler::new(Broken);
        assert!(matches!(asm.next_packet(), Err(Error::Io(_))));
        assert_eq!(asm.state(), State::Failed);
        assert!(asm.next_packet().unwrap().is_none());
    }

    #[test]
    fn strict_version_rejects_nonzero_version() {
        let mut bad = P1;
        bad[0] |= 0x20; // version 1
        let chunk = [&P1[..], &bad[..]].concat();
        let mut asm = PacketAssembler::new(Chunks::new(&[&chunk[..]])).with_strict_version(true);

        assert!(asm.next_packet().unwrap().is_some());
        assert!(matches!(
            asm.next_packet(),
            Err(Error::InvalidHeader { version: 1 })
        ));
        assert_eq!(asm.state(), State::Failed);
    }

    #[test]
    fn lenient_version_passes_nonzero_version() {
        let mut odd = P1;
        odd[0] |= 0x20;
        let mut asm = PacketAssembler::new(Chunks::new(&[&odd[..]]));
        let p = asm.next_packet().unwrap().unwrap();
        assert_eq!(p.header.version, 1);
    }

    #[test]
    fn buffer_is_bounded() {
        // 100 packets, 1 byte at a time
        let dat: Vec<u8> = (0..100).flat_map(|_| P2).collect();
        let chunks: Vec<&[u8]> = dat.chunks(1).collect();
        let mut asm = PacketAssembler::new(Chunks::new(&chunks));

        let mut count = 0;
        while let Some(p) = asm.next_packet().unwrap() {
            assert_eq!(p.data, P2);
            assert!(asm.buffered() < P2.len());
            count += 1;
        }
        assert_eq!(count, 100);
    }
}
