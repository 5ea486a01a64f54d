use embedded_hal_nb::serial::{Read, Write};
use embedded_io::Write as IoWrite;

use crate::{
    Encode,
    decoder::{DecodeHook, NoHook, Output, PacketDecoder},
    packet::{Packet, PacketError},
    protocol::{Control, FRAME_CAPACITY},
    serial::{BufferedTx, ErrorShim},
};

#[derive(Debug)]
pub enum LinkError<E> {
    Packet(PacketError),
    Write(E),
}

impl<E> From<PacketError> for LinkError<E> {
    fn from(value: PacketError) -> Self {
        LinkError::Packet(value)
    }
}

pub trait PacketRecv<Rx: Read> {
    fn recv(&mut self) -> nb::Result<Output, Rx::Error>;
}

pub trait PacketSend<Tx: Write> {
    fn flush(&mut self) -> nb::Result<(), Tx::Error>;

    fn send(&mut self, payload: &[u8]) -> Result<(), LinkError<Tx::Error>>;
}

/// Receive half: every byte read off the port goes through the decoder.
pub struct PacketRx<Rx: Read, H: DecodeHook = NoHook> {
    rx: Rx,
    decoder: PacketDecoder<H>,
}

impl<Rx: Read> PacketRx<Rx> {
    pub fn new(rx: Rx, decoder: PacketDecoder) -> PacketRx<Rx> {
        PacketRx { rx, decoder }
    }
}

impl<Rx: Read, H: DecodeHook> PacketRx<Rx, H> {
    pub fn with_decoder(rx: Rx, decoder: PacketDecoder<H>) -> PacketRx<Rx, H> {
        PacketRx { rx, decoder }
    }

    pub fn decoder(&self) -> &PacketDecoder<H> {
        &self.decoder
    }

    pub fn decoder_mut(&mut self) -> &mut PacketDecoder<H> {
        &mut self.decoder
    }

    pub fn into_inner(self) -> (Rx, PacketDecoder<H>) {
        (self.rx, self.decoder)
    }
}

impl<Rx: Read, H: DecodeHook> PacketRecv<Rx> for PacketRx<Rx, H> {
    /// Read until the decoder completes a unit. `WouldBlock` once the port
    /// runs dry; the partial frame stays in the decoder for the next call.
    fn recv(&mut self) -> nb::Result<Output, Rx::Error> {
        loop {
            let byte = self.rx.read()?;
            if let Some(out) = self.decoder.add_byte(byte) {
                return Ok(out);
            }
        }
    }
}

/// Transmit half
pub struct PacketTx<Tx: Write> {
    pub tx: BufferedTx<Tx>,
}

impl<Tx: Write> PacketTx<Tx> {
    pub fn new(tx: Tx) -> PacketTx<Tx> {
        PacketTx {
            tx: BufferedTx::new(tx),
        }
    }

    /// Queue a pre-built frame as is, e.g. an `OUT_PACKETS` entry
    pub fn send_frame(&mut self, frame: &[u8]) -> Result<(), LinkError<Tx::Error>> {
        IoWrite::write_all(&mut self.tx, frame).map_err(|ErrorShim(e)| {
            log::warn!("frame of {} bytes not sent", frame.len());
            LinkError::Write(e)
        })
    }

    pub fn send_control(&mut self, control: Control) -> Result<(), LinkError<Tx::Error>> {
        self.send_frame(control.as_bytes())
    }

    pub fn send_packet(&mut self, packet: &Packet) -> Result<(), LinkError<Tx::Error>> {
        let mut buf = [0; FRAME_CAPACITY];
        let size = packet.encode(&mut buf)?;
        self.send_frame(&buf[..size])
    }
}

impl<Tx: Write> PacketSend<Tx> for PacketTx<Tx> {
    fn flush(&mut self) -> nb::Result<(), Tx::Error> {
        Write::flush(&mut self.tx)
    }

    fn send(&mut self, payload: &[u8]) -> Result<(), LinkError<Tx::Error>> {
        let packet = Packet::new(payload)?;
        self.send_packet(&packet)
    }
}

/// Both halves of one serial link
pub struct PacketLink<Tx: Write, Rx: Read, H: DecodeHook = NoHook> {
    ptx: PacketTx<Tx>,
    pub prx: PacketRx<Rx, H>,
}

impl<Tx: Write, Rx: Read, H: DecodeHook> PacketLink<Tx, Rx, H> {
    pub fn new(tx: Tx, rx: Rx, decoder: PacketDecoder<H>) -> PacketLink<Tx, Rx, H> {
        PacketLink {
            ptx: PacketTx::new(tx),
            prx: PacketRx::with_decoder(rx, decoder),
        }
    }

    pub fn tx(&mut self) -> &mut PacketTx<Tx> {
        &mut self.ptx
    }

    pub fn split(self) -> (PacketTx<Tx>, PacketRx<Rx, H>) {
        (self.ptx, self.prx)
    }
}

impl<Tx: Write, Rx: Read, H: DecodeHook> PacketSend<Tx> for PacketLink<Tx, Rx, H> {
    fn flush(&mut self) -> nb::Result<(), Tx::Error> {
        self.ptx.flush()
    }

    fn send(&mut self, payload: &[u8]) -> Result<(), LinkError<Tx::Error>> {
        self.ptx.send(payload)
    }
}

impl<Tx: Write, Rx: Read, H: DecodeHook> PacketRecv<Rx> for PacketLink<Tx, Rx, H> {
    fn recv(&mut self) -> nb::Result<Output, Rx::Error> {
        self.prx.recv()
    }
}
