use std::{collections::VecDeque, convert::Infallible, process::ExitCode};

use embedded_hal_nb::serial::{ErrorType, Read, Write};
use serialcom::{
    ErrorCounts, Mode, OUT_PACKETS, PacketDecoder, PacketRecv, PacketRx, PacketSend, PacketTx,
};

fn main() -> ExitCode {
    let mode = match std::env::args().nth(1) {
        Some(arg) => match arg.parse::<Mode>() {
            Ok(m) => m,
            Err(_) => {
                eprintln!("unknown mode {arg:?}, expected full, payload or decode");
                return ExitCode::FAILURE;
            }
        },
        None => Mode::Decode,
    };

    println!("Unit Test for PacketDecoder");

    // retrieve payload of every packet and compare with the frame
    let mut prx = PacketRx::new(transmit(), PacketDecoder::new(Mode::Payload));
    let mut mismatches = 0;
    for (label, frame) in OUT_PACKETS.iter() {
        match prx.recv() {
            Ok(out) if out.as_bytes() == Some(&frame[2..frame.len() - 1]) => {
                println!("{label}: packet received and match.");
            }
            Ok(out) => {
                println!("{label}: packet received but does not match: {out:?}");
                mismatches += 1;
            }
            Err(_) => {
                println!("{label}: no packet received.");
                mismatches += 1;
            }
        }
    }

    // print every unit in the requested mode
    let decoder = PacketDecoder::with_hook(mode, ErrorCounts::default());
    let mut prx = PacketRx::with_decoder(transmit(), decoder);
    while let Ok(out) = prx.recv() {
        match out.as_str() {
            Some(text) => println!("{text}"),
            None => println!("{:02X?}", out.as_bytes().unwrap_or_default()),
        }
    }
    let (_, decoder) = prx.into_inner();
    let counts = decoder.hook();
    if counts.total() > 0 {
        println!("discarded: {counts:?}");
    }

    if mismatches > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Every outbound packet written through the link into memory
fn transmit() -> Loopback {
    let mut ptx = PacketTx::new(Loopback::default());
    for (_, frame) in OUT_PACKETS.iter() {
        if let Err(e) = ptx.send_frame(frame) {
            eprintln!("send failed: {e:?}");
        }
    }
    if let Err(e) = nb::block!(ptx.flush()) {
        eprintln!("flush failed: {e:?}");
    }
    ptx.tx.into_inner()
}

#[derive(Debug, Default)]
struct Loopback(VecDeque<u8>);

impl ErrorType for Loopback {
    type Error = Infallible;
}

impl Write for Loopback {
    fn write(&mut self, c: u8) -> nb::Result<(), Self::Error> {
        self.0.push_back(c);
        Ok(())
    }

    fn flush(&mut self) -> nb::Result<(), Self::Error> {
        Ok(())
    }
}

impl Read for Loopback {
    fn read(&mut self) -> nb::Result<u8, Self::Error> {
        self.0.pop_front().ok_or(nb::Error::WouldBlock)
    }
}
