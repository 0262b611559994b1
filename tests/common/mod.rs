#![allow(dead_code)]

use std::io::Write;

use ccsds_cadu::PrimaryHeader;
use rand::Rng;
use tempfile::NamedTempFile;

/// Encode a standalone packet with the provided user data, which must not be empty.
pub fn packet(apid: u16, seq: u16, user_data: &[u8]) -> Vec<u8> {
    assert!(!user_data.is_empty(), "packets require at least 1 byte of user data");
    let header = PrimaryHeader {
        version: 0,
        type_flag: 0,
        has_secondary_header: false,
        apid,
        sequence_flags: 3,
        sequence_id: seq,
        len_minus1: u16::try_from(user_data.len() - 1).unwrap(),
    };
    [&header.encode()[..], user_data].concat()
}

/// A packet with between 1 and `max_len` bytes of random user data.
pub fn random_packet<R: Rng>(rng: &mut R, apid: u16, seq: u16, max_len: usize) -> Vec<u8> {
    let mut user_data = vec![0u8; rng.gen_range(1..=max_len)];
    rng.fill(&mut user_data[..]);
    packet(apid, seq, &user_data)
}

/// Append an idle packet to `zone` such that it fills a whole number of payloads
/// of `payload_length`.
pub fn idle_fill(zone: &mut Vec<u8>, payload_length: usize) {
    let mut need = (payload_length - zone.len() % payload_length) % payload_length;
    if need == 0 {
        return;
    }
    while need < PrimaryHeader::LEN + 1 {
        need += payload_length;
    }
    let idle = packet(
        PrimaryHeader::IDLE_APID,
        0,
        &vec![0xff; need - PrimaryHeader::LEN],
    );
    zone.extend_from_slice(&idle);
}

/// Split `zone` into frames of `frame_length` bytes, each starting with `marker`. The
/// last frame is padded with zeros if necessary.
pub fn frame(zone: &[u8], frame_length: usize, marker: &[u8]) -> Vec<u8> {
    let payload_length = frame_length - marker.len();
    let mut dat = Vec::default();
    for chunk in zone.chunks(payload_length) {
        dat.extend_from_slice(marker);
        dat.extend_from_slice(chunk);
        dat.resize(dat.len() + payload_length - chunk.len(), 0);
    }
    dat
}

/// Write `dat` to a temporary file that is removed when dropped.
pub fn write_fixture(dat: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(dat).unwrap();
    file.flush().unwrap();
    file
}
