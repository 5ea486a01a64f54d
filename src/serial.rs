use embedded_hal_nb::serial::{Error, ErrorType, Write};
use heapless::Deque;

use crate::protocol::FRAME_CAPACITY;

/// Room for a handful of full frames
pub const TX_QUEUE: usize = 4 * FRAME_CAPACITY;

/// Transmit queue in front of a serial writer.
///
/// Bytes leave the queue only once the port has accepted them, so a
/// `WouldBlock` from the port never loses data.
#[derive(Debug)]
pub struct BufferedTx<Tx: Write> {
    tx: Tx,
    buf: Deque<u8, TX_QUEUE>,
}

impl<Tx: Write> BufferedTx<Tx> {
    pub fn new(tx: Tx) -> BufferedTx<Tx> {
        BufferedTx {
            tx,
            buf: Deque::new(),
        }
    }

    /// Bytes waiting to go out
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    pub fn inner(&self) -> &Tx {
        &self.tx
    }

    pub fn inner_mut(&mut self) -> &mut Tx {
        &mut self.tx
    }

    pub fn into_inner(self) -> Tx {
        self.tx
    }
}

impl<Tx: Write> ErrorType for BufferedTx<Tx> {
    type Error = Tx::Error;
}

impl<Tx: Write> Write for BufferedTx<Tx> {
    /// Queue a byte. Makes room by pushing queued bytes out when full.
    fn write(&mut self, word: u8) -> nb::Result<(), Self::Error> {
        if self.buf.is_full() {
            match Write::flush(self) {
                Ok(()) | Err(nb::Error::WouldBlock) => {}
                Err(nb::Error::Other(e)) => return Err(nb::Error::Other(e)),
            }
        }
        self.buf.push_back(word).map_err(|_| nb::Error::WouldBlock)
    }

    fn flush(&mut self) -> nb::Result<(), Self::Error> {
        while let Some(&x) = self.buf.front() {
            // Attempt to write, and we'll drop out if write WouldBlock or Err
            self.tx.write(x)?;
            self.buf.pop_front();
        }
        self.tx.flush()
    }
}

#[derive(Debug)]
pub struct ErrorShim<T: Error>(pub T);

impl<T: Error> embedded_io::Error for ErrorShim<T> {
    fn kind(&self) -> embedded_io::ErrorKind {
        use embedded_hal_nb::serial::ErrorKind::*;
        match self.0.kind() {
            Overrun => embedded_io::ErrorKind::OutOfMemory,
            FrameFormat => embedded_io::ErrorKind::InvalidData,
            Parity => embedded_io::ErrorKind::InvalidData,
            Noise => embedded_io::ErrorKind::Other,
            _ => embedded_io::ErrorKind::Other,
        }
    }
}

impl<T: Error> From<T> for ErrorShim<T> {
    fn from(value: T) -> Self {
        ErrorShim(value)
    }
}

impl<Tx: Write> embedded_io::ErrorType for BufferedTx<Tx> {
    type Error = ErrorShim<Tx::Error>;
}

/// Blocking view: `write` waits for queue space, `flush` waits until the
/// port took every byte.
impl<Tx: Write> embedded_io::Write for BufferedTx<Tx> {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        if buf.is_empty() {
            return Ok(0);
        }
        while self.buf.is_full() {
            if let Err(nb::Error::Other(e)) = Write::flush(self) {
                return Err(ErrorShim(e));
            }
        }
        let mut written = 0;
        for &b in buf {
            if self.buf.push_back(b).is_err() {
                break;
            }
            written += 1;
        }
        Ok(written)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        nb::block!(Write::flush(self)).map_err(ErrorShim)
    }
}
