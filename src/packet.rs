use heapless::Vec;

use crate::{
    Decode, Encode,
    protocol::{
        CommandCode, DIO_GETVAL, DIO_RSTVAL, DIO_SETVAL, FRAME_CAPACITY, HEADER, MAX_DATA,
        MAX_PACKET, MAX_PAYLOAD, SYS_SRESET, SYS_WRESET, TSC_RPTVAL,
    },
};

/// XOR of every byte. Frames checksum the payload only, never the header or
/// length byte.
pub const fn checksum(data: &[u8]) -> u8 {
    let mut csum = 0;
    let mut i = 0;
    while i < data.len() {
        csum ^= data[i];
        i += 1;
    }
    csum
}

/// A validated packet: command code followed by its data.
///
/// Packets built locally are limited to `MAX_PAYLOAD` bytes and always carry
/// a command. Packets decoded off the wire may carry up to `MAX_PACKET` bytes
/// and may be empty (`F5 00 00`), matching what the streaming decoder admits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    payload: Vec<u8, MAX_PACKET>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketError {
    EmptyPayload,
    PayloadTooLarge {
        max: usize,
        found: usize,
    },
    MissingHeader {
        found: u8,
    },
    LengthTooLarge {
        length: u8,
    },
    EncodeBufferTooSmall {
        expected: usize,
        found: usize,
    },
    DecodeBufferTooSmall {
        expected_at_least: usize,
        found: usize,
    },
    ChecksumMismatch {
        calculated: u8,
        found: u8,
    },
}

impl Packet {
    pub fn new(payload: &[u8]) -> Result<Packet, PacketError> {
        if payload.is_empty() {
            return Err(PacketError::EmptyPayload);
        }
        if payload.len() > MAX_PAYLOAD {
            return Err(PacketError::PayloadTooLarge {
                max: MAX_PAYLOAD,
                found: payload.len(),
            });
        }
        let mut p = Vec::new();
        p.extend_from_slice(payload)
            .map_err(|_| PacketError::PayloadTooLarge {
                max: MAX_PAYLOAD,
                found: payload.len(),
            })?;
        Ok(Packet { payload: p })
    }

    /// Command byte followed by up to `MAX_DATA` bytes of data
    pub fn with_command(command: u8, data: &[u8]) -> Result<Packet, PacketError> {
        if data.len() > MAX_DATA {
            return Err(PacketError::PayloadTooLarge {
                max: MAX_PAYLOAD,
                found: data.len() + 1,
            });
        }
        let mut buf = [0; MAX_PAYLOAD];
        buf[0] = command;
        buf[1..data.len() + 1].copy_from_slice(data);
        Packet::new(&buf[..data.len() + 1])
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// `None` for an empty frame
    pub fn command(&self) -> Option<CommandCode> {
        self.payload.first().map(|&code| CommandCode::from(code))
    }

    /// Everything after the command code
    pub fn data(&self) -> &[u8] {
        self.payload.get(1..).unwrap_or_default()
    }

    pub fn checksum(&self) -> u8 {
        checksum(&self.payload)
    }

    /// Length on the wire including header, length and checksum bytes
    pub fn size(&self) -> usize {
        self.payload.len() + 3
    }

    pub fn to_bytes(&self) -> Vec<u8, FRAME_CAPACITY> {
        let mut buf = [0; FRAME_CAPACITY];
        let mut v = Vec::new();
        // size() never exceeds FRAME_CAPACITY
        if let Ok(n) = self.encode(&mut buf) {
            let _ = v.extend_from_slice(&buf[..n]);
        }
        v
    }
}

impl Encode for Packet {
    type Error = PacketError;

    fn encode(&self, buffer: &mut [u8]) -> Result<usize, Self::Error> {
        let size = self.size();
        if buffer.len() < size {
            return Err(PacketError::EncodeBufferTooSmall {
                expected: size,
                found: buffer.len(),
            });
        }
        // HEADER: 1, LEN: 1, PLD: len, CSM: 1
        //                   |--XOR--|
        buffer[0] = HEADER;
        buffer[1] = self.payload.len() as u8;
        buffer[2..size - 1].copy_from_slice(&self.payload);
        buffer[size - 1] = self.checksum();
        Ok(size)
    }
}

impl<'a> Decode<'a> for Packet {
    type Error = PacketError;

    fn decode(data: &'a [u8]) -> Result<Self, Self::Error> {
        // Header and length
        if data.len() < 2 {
            return Err(PacketError::DecodeBufferTooSmall {
                expected_at_least: 2,
                found: data.len(),
            });
        }
        if data[0] != HEADER {
            return Err(PacketError::MissingHeader { found: data[0] });
        }
        let length = data[1];
        if length as usize > MAX_PACKET {
            return Err(PacketError::LengthTooLarge { length });
        }
        let size = length as usize + 3;
        if data.len() < size {
            return Err(PacketError::DecodeBufferTooSmall {
                expected_at_least: size,
                found: data.len(),
            });
        }

        let payload = &data[2..size - 1];
        let calculated = checksum(payload);
        let found = data[size - 1];
        if calculated != found {
            return Err(PacketError::ChecksumMismatch { calculated, found });
        }

        let mut p = Vec::new();
        p.extend_from_slice(payload)
            .map_err(|_| PacketError::LengthTooLarge { length })?;
        Ok(Packet { payload: p })
    }
}

/// Pre-built frames the host sends to the device, keyed by label
pub static OUT_PACKETS: [(&str, &[u8]); 8] = [
    ("System Reset", &[HEADER, 0x01, SYS_SRESET, SYS_SRESET]),
    ("Watchdog Reset", &[HEADER, 0x01, SYS_WRESET, SYS_WRESET]),
    ("DIO 01 Set", &[HEADER, 0x02, DIO_SETVAL, 0x01, DIO_SETVAL ^ 0x01]),
    ("DIO 01 Clear", &[HEADER, 0x02, DIO_RSTVAL, 0x01, DIO_RSTVAL ^ 0x01]),
    ("DIO 01 Get", &[HEADER, 0x02, DIO_GETVAL, 0x01, DIO_GETVAL ^ 0x01]),
    ("TSC Report Set", &[HEADER, 0x02, TSC_RPTVAL, 0x01, TSC_RPTVAL ^ 0x01]),
    ("TSC Report Clear", &[HEADER, 0x02, TSC_RPTVAL, 0x00, TSC_RPTVAL ^ 0x00]),
    (
        "Unknown",
        &[HEADER, 0x05, 0xFF, 0x02, 0x03, 0x04, 0x05, 0xFF ^ 0x02 ^ 0x03 ^ 0x04 ^ 0x05],
    ),
];

pub fn out_packet(label: &str) -> Option<&'static [u8]> {
    OUT_PACKETS
        .iter()
        .find(|(l, _)| *l == label)
        .map(|(_, frame)| *frame)
}
