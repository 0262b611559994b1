#![doc = include_str!("../README.md")]

mod error;

pub mod framing;
pub mod spacepacket;

pub use error::{Error, Result};
pub use framing::{
    decode_framed_packets, read_framed_packets, read_framed_packets_with_config,
    FramedPacketIter, FramingConfig,
};
pub use spacepacket::{missing_packets, read_packets, Apid, Packet, PrimaryHeader};
