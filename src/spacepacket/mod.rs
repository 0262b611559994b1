//! CCSDS Space Packet decoding.
//!
//! References:
//! * CCSDS Space Packet Protocol 133.0-B-2
//!     - <https://public.ccsds.org/Pubs/133x0b2e1.pdf>
mod assembler;
mod stream;

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub use assembler::{PacketAssembler, PayloadSource, State};
pub use stream::{read_packets, PacketReaderIter, StreamPayloads};

pub type Apid = u16;

/// Packet represents a single CCSDS space packet and its associated data.
///
/// This packet contains the primary header data as well as the user data,
/// which may or may not contain a secondary header. See the header's
/// `has_secondary_header` flag.
///
/// # Example
/// Create a packet from the minimum number of bytes.
/// ```
/// use ccsds_cadu::{Packet, PrimaryHeader};
///
/// let dat: &[u8] = &[
///     // primary header bytes
///     0xd, 0x59, 0xd2, 0xab, 0x0, 0x9,
///     // Cds timecode bytes in secondary header (not decoded here)
///     0x52, 0xc0, 0x0, 0x0, 0x0, 0xa7, 0x0, 0xdb, 0xff,
///     // minimum 1 byte of user data
///     0xff
/// ];
/// let packet = Packet::decode(dat).unwrap();
/// assert_eq!(packet.header.apid, 1369);
/// assert_eq!(packet.data.len(), PrimaryHeader::LEN + 10);
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// All packets have a primary header
    pub header: PrimaryHeader,
    /// All packet bytes, including header and user data
    pub data: Vec<u8>,
    /// Offset of the first packet byte in the packet zone byte stream it was decoded
    /// from. Sync marker bytes are not counted.
    pub offset: usize,
}

impl Display for Packet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Packet{{header: {:?}, data:[len={}]}}",
            self.header,
            self.data.len()
        )?;
        Ok(())
    }
}

impl Packet {
    #[must_use]
    pub fn is_first(&self) -> bool {
        self.header.sequence_flags == SEQ_FIRST
    }

    #[must_use]
    pub fn is_last(&self) -> bool {
        self.header.sequence_flags == SEQ_LAST
    }

    #[must_use]
    pub fn is_cont(&self) -> bool {
        self.header.sequence_flags == SEQ_CONTINUATION
    }

    #[must_use]
    pub fn is_standalone(&self) -> bool {
        self.header.sequence_flags == SEQ_UNSEGMENTED
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.header.apid == PrimaryHeader::IDLE_APID
    }

    /// User data bytes, i.e., everything after the primary header. This includes any
    /// secondary header.
    #[must_use]
    pub fn user_data(&self) -> &[u8] {
        &self.data[PrimaryHeader::LEN..]
    }

    /// Decode a single packet from the start of `dat`. Any bytes beyond the length
    /// indicated by the header are ignored.
    ///
    /// # Errors
    /// [Error::NotEnoughData] if there are not enough bytes for the header or for the
    /// packet length indicated by the header.
    pub fn decode(dat: &[u8]) -> Result<Packet> {
        let header = PrimaryHeader::decode(dat)?;
        let need = header.packet_len();
        if dat.len() < need {
            return Err(Error::NotEnoughData {
                actual: dat.len(),
                minimum: need,
            });
        }
        Ok(Packet {
            header,
            data: dat[..need].to_vec(),
            offset: 0,
        })
    }
}

/// Packet is the first packet in a packet group
pub const SEQ_FIRST: u8 = 1;
/// Packet is a part of a packet group, but not first and not last
pub const SEQ_CONTINUATION: u8 = 0;
/// Packet is the last packet in a packet group
pub const SEQ_LAST: u8 = 2;
/// Packet is not part of a packet group, i.e., standalone.
pub const SEQ_UNSEGMENTED: u8 = 3;

/// CCSDS Primary Header
///
/// The primary header format is common to all CCSDS space packets.
///
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
pub struct PrimaryHeader {
    pub version: u8,
    pub type_flag: u8,
    pub has_secondary_header: bool,
    pub apid: Apid,
    /// Defines a packets grouping. See the `SEQ_*` values.
    pub sequence_flags: u8,
    pub sequence_id: u16,
    /// Length of the user data minus 1.
    pub len_minus1: u16,
}

impl PrimaryHeader {
    /// Size of a ``PrimaryHeader``
    pub const LEN: usize = 6;
    pub const SEQ_MAX: u16 = 16383;
    /// APID reserved for idle (fill) packets
    pub const IDLE_APID: Apid = 2047;

    /// Decode from the first [Self::LEN] bytes of `buf`. Nothing is consumed, so
    /// this can be used to peek at the head of a larger buffer.
    ///
    /// # Errors
    /// [Error::NotEnoughData] if `buf` is shorter than [Self::LEN].
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < Self::LEN {
            return Err(Error::NotEnoughData {
                actual: buf.len(),
                minimum: Self::LEN,
            });
        }
        let d1 = u16::from_be_bytes([buf[0], buf[1]]);
        let d2 = u16::from_be_bytes([buf[2], buf[3]]);
        let d3 = u16::from_be_bytes([buf[4], buf[5]]);

        Ok(PrimaryHeader {
            version: (d1 >> 13 & 0x7) as u8,
            type_flag: (d1 >> 12 & 0x1) as u8,
            has_secondary_header: (d1 >> 11 & 0x1) == 1,
            apid: (d1 & 0x7ff),
            sequence_flags: (d2 >> 14 & 0x3) as u8,
            sequence_id: (d2 & 0x3fff),
            len_minus1: d3,
        })
    }

    /// Encode to header bytes. Values wider than their fields are truncated to the
    /// field width.
    #[must_use]
    pub fn encode(&self) -> [u8; Self::LEN] {
        let d1 = (u16::from(self.version) & 0x7) << 13
            | (u16::from(self.type_flag) & 0x1) << 12
            | u16::from(self.has_secondary_header) << 11
            | (self.apid & 0x7ff);
        let d2 = (u16::from(self.sequence_flags) & 0x3) << 14 | (self.sequence_id & 0x3fff);
        let [a, b] = d1.to_be_bytes();
        let [c, d] = d2.to_be_bytes();
        let [e, f] = self.len_minus1.to_be_bytes();
        [a, b, c, d, e, f]
    }

    /// Total packet length in bytes, header included.
    #[must_use]
    pub fn packet_len(&self) -> usize {
        Self::LEN + self.len_minus1 as usize + 1
    }

    /// Make sure this is a version 1 CCSDS packet, which is encoded as 0.
    ///
    /// # Errors
    /// [Error::InvalidHeader] for any other version.
    pub fn validate_version(&self) -> Result<()> {
        if self.version != 0 {
            return Err(Error::InvalidHeader {
                version: self.version,
            });
        }
        Ok(())
    }
}

/// Calculate the number of missing sequence ids.
///
/// `cur` is the current sequence id. `last` is the sequence id seen before `cur`.
/// Sequence ids are 14 bits and roll over after [PrimaryHeader::SEQ_MAX]; any higher
/// bits in either value are ignored.
#[must_use]
pub fn missing_packets(cur: u16, last: u16) -> u16 {
    let cur = cur & PrimaryHeader::SEQ_MAX;
    let last = last & PrimaryHeader::SEQ_MAX;
    cur.wrapping_sub(last).wrapping_sub(1) & PrimaryHeader::SEQ_MAX
}
