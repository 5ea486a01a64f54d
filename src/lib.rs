#![cfg_attr(not(test), no_std)]

pub mod decoder;
pub mod link;
pub mod packet;
pub mod protocol;
pub mod report;
pub mod serial;

pub trait Encode {
    type Error;

    /// Returns the number of bytes written
    fn encode(&self, buffer: &mut [u8]) -> Result<usize, Self::Error>;
}

pub trait Decode<'a> where Self: Sized {
    type Error;

    fn decode(data: &'a [u8]) -> Result<Self, Self::Error>;
}

pub use decoder::{DecodeError, DecodeHook, ErrorCounts, Mode, ModeError, NoHook, Output, PacketDecoder, State};
pub use link::{LinkError, PacketLink, PacketRecv, PacketRx, PacketSend, PacketTx};
pub use packet::{OUT_PACKETS, Packet, PacketError, checksum, out_packet};
pub use protocol::{CommandCode, Control, Group, name_of};
pub use report::{Report, ReportError, SampleKind};
