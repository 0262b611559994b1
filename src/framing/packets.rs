use std::fs::File;
use std::io::{BufReader, Read};
use std::iter::FusedIterator;
use std::path::Path;

use tracing::debug;

use super::{FrameSource, FramedPayloads, FramingConfig, SyncStripper};
use crate::spacepacket::{Packet, PacketAssembler, State};
use crate::{Error, Result};

/// Iterator of the [Packet]s contained in the packet zone of a framed input.
///
/// Packets are provided in the order their first byte occurs in the input. The input
/// is owned by the iterator and dropped as soon as the input is exhausted or an error
/// is returned, or when the iterator itself is dropped.
///
/// After an error has been returned the iterator only returns `None`.
pub struct FramedPacketIter<R>
where
    R: Read,
{
    assembler: PacketAssembler<FramedPayloads<R>>,
}

impl<R> FramedPacketIter<R>
where
    R: Read,
{
    #[must_use]
    pub fn state(&self) -> State {
        self.assembler.state()
    }

    /// Number of packet zone bytes read but not yet provided as packets.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.assembler.buffered()
    }

    /// True once the input has been dropped.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.assembler.is_released()
    }
}

impl<R> Iterator for FramedPacketIter<R>
where
    R: Read,
{
    type Item = Result<Packet>;

    fn next(&mut self) -> Option<Self::Item> {
        self.assembler.next_packet().transpose()
    }
}

impl<R> FusedIterator for FramedPacketIter<R> where R: Read {}

/// Decodes the packets contained in the frames read from `reader`.
///
/// The sync marker is stripped from each frame and the remaining bytes of all frames
/// are treated as a single continuous packet stream. Packets may start anywhere in a
/// frame and may span any number of frames. Idle packets are not filtered.
///
/// Nothing is read until the first packet is requested.
///
/// # Examples
/// ```
/// use ccsds_cadu::framing::{decode_framed_packets, FramingConfig};
///
/// #[rustfmt::skip]
/// let dat: &[u8] = &[
///     // frame 1: 2 byte sync marker, 6 byte primary header, 1 byte of user data
///     0x1a, 0xcf, 0xd, 0x59, 0xc0, 0x01, 0x0, 0x2, 0xaa,
///     // frame 2: sync marker, remaining 2 bytes of user data, then 5 bytes of
///     // an idle packet header
///     0x1a, 0xcf, 0xbb, 0xcc, 0x7, 0xff, 0xc0, 0x0, 0x0,
///     // frame 3: sync marker, last idle packet header byte and user data
///     0x1a, 0xcf, 0x5, 0x0, 0x0, 0x0, 0x0, 0x0, 0x0,
/// ];
///
/// let packets: Vec<_> = decode_framed_packets(dat, &FramingConfig::new(9, 2))
///     .unwrap()
///     .map(Result::unwrap)
///     .collect();
///
/// assert_eq!(packets.len(), 2);
/// assert_eq!(packets[0].header.apid, 1369);
/// assert_eq!(packets[0].data, [0xd, 0x59, 0xc0, 0x01, 0x0, 0x2, 0xaa, 0xbb, 0xcc]);
/// assert!(packets[1].is_idle());
/// ```
///
/// # Errors
/// [Error::Config] if `config` is not valid.
pub fn decode_framed_packets<R>(reader: R, config: &FramingConfig) -> Result<FramedPacketIter<R>>
where
    R: Read,
{
    config.validate()?;
    let frames = FrameSource::new(reader, config.frame_length)?;
    let stripper = match config.sync_marker {
        Some(ref marker) => SyncStripper::with_marker(marker),
        None => SyncStripper::new(config.sync_marker_length),
    };
    debug!(?config, "decoding framed packets");

    Ok(FramedPacketIter {
        assembler: PacketAssembler::new(FramedPayloads::new(frames, stripper))
            .with_strict_version(config.strict_version),
    })
}

/// Open the file at `path` and decode the packets contained in its frames. See
/// [decode_framed_packets].
///
/// `frame_length` is the total length of each frame, including the sync marker of
/// `sync_marker_length` bytes.
///
/// # Errors
/// [Error::Config] for invalid lengths and [Error::SourceUnavailable] if the file
/// cannot be opened.
pub fn read_framed_packets<P>(
    path: P,
    frame_length: usize,
    sync_marker_length: usize,
) -> Result<FramedPacketIter<BufReader<File>>>
where
    P: AsRef<Path>,
{
    read_framed_packets_with_config(path, &FramingConfig::new(frame_length, sync_marker_length))
}

/// Like [read_framed_packets], using all the options in `config`.
///
/// # Errors
/// [Error::Config] for an invalid `config` and [Error::SourceUnavailable] if the file
/// cannot be opened.
pub fn read_framed_packets_with_config<P>(
    path: P,
    config: &FramingConfig,
) -> Result<FramedPacketIter<BufReader<File>>>
where
    P: AsRef<Path>,
{
    config.validate()?;
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| Error::SourceUnavailable {
        path: path.to_path_buf(),
        source,
    })?;
    decode_framed_packets(BufReader::new(file), config)
}
