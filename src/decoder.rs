//! Streaming packet decoder.
//!
//! Bytes are fed one at a time, in arrival order, straight off the serial
//! link. The decoder does not need to start on a frame boundary: anything
//! that is not a header or control byte is dropped while waiting for a new
//! frame, and any frame with an oversize length or a bad checksum is thrown
//! away. The state machine always ends up back in [`State::Header`], so it
//! can never get stuck.
//!
//! Payload bytes are opaque. A payload byte equal to `HEADER`, `ACK`, `NAK`
//! or `IAM` is data; only in [`State::Header`] are those bytes special.
//!
//! A length of zero carries no payload byte at all: the decoder moves
//! straight from [`State::Length`] to [`State::Checksum`] and expects `0x00`,
//! so `F5 00 00` is a complete, empty frame.

use core::{fmt::Write as _, str::FromStr};

use heapless::{String, Vec};

use crate::protocol::{Control, FRAME_CAPACITY, HEADER, MAX_PACKET, name_of};

/// Longest decoded line: a ten character name, the colon, and two hex
/// digits for every payload byte after the command code.
pub const TEXT_CAPACITY: usize = 11 + 2 * (MAX_PACKET - 1);

/// Shape of the units the decoder hands back
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Whole frame, header and checksum included. Control bytes come back
    /// as [`Output::Control`].
    #[default]
    Full,
    /// Payload bytes only. Control bytes produce nothing.
    Payload,
    /// `"<command>:<hex data>"` text. Control bytes come back as their
    /// names.
    Decode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeError;

impl FromStr for Mode {
    type Err = ModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("full") {
            Ok(Mode::Full)
        } else if s.eq_ignore_ascii_case("payload") {
            Ok(Mode::Payload)
        } else if s.eq_ignore_ascii_case("decode") {
            Ok(Mode::Decode)
        } else {
            Err(ModeError)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Waiting for a header or control byte
    Header,
    Length,
    Payload,
    Checksum,
}

/// A completed unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    Control(Control),
    Frame(Vec<u8, FRAME_CAPACITY>),
    Payload(Vec<u8, MAX_PACKET>),
    Text(String<TEXT_CAPACITY>),
}

impl Output {
    /// Raw bytes of a control, frame or payload unit. `None` for text.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Output::Control(c) => Some(c.as_bytes()),
            Output::Frame(f) => Some(f.as_slice()),
            Output::Payload(p) => Some(p.as_slice()),
            Output::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Output::Text(t) => Some(t.as_str()),
            _ => None,
        }
    }
}

/// Why the decoder discarded input. None of these reach the caller through
/// [`PacketDecoder::add_byte`]; they only go to the [`DecodeHook`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Byte that is neither a header nor a control byte while waiting for a
    /// new frame
    BadHeader { found: u8 },
    /// Length byte above `MAX_PACKET`
    OversizeLength { length: u8 },
    ChecksumMismatch { calculated: u8, found: u8 },
}

/// Diagnostic sink for discarded input
pub trait DecodeHook {
    fn on_error(&mut self, _error: DecodeError) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoHook;

impl DecodeHook for NoHook {}

/// Counts each kind of discarded input
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ErrorCounts {
    pub bad_header: u32,
    pub oversize_length: u32,
    pub checksum_mismatch: u32,
}

impl ErrorCounts {
    pub fn total(&self) -> u32 {
        self.bad_header + self.oversize_length + self.checksum_mismatch
    }
}

impl DecodeHook for ErrorCounts {
    fn on_error(&mut self, error: DecodeError) {
        match error {
            DecodeError::BadHeader { .. } => self.bad_header = self.bad_header.saturating_add(1),
            DecodeError::OversizeLength { .. } => {
                self.oversize_length = self.oversize_length.saturating_add(1)
            }
            DecodeError::ChecksumMismatch { .. } => {
                self.checksum_mismatch = self.checksum_mismatch.saturating_add(1)
            }
        }
    }
}

impl<H: DecodeHook> DecodeHook for &mut H {
    fn on_error(&mut self, error: DecodeError) {
        (**self).on_error(error)
    }
}

/// Byte-at-a-time decoder for `[HDR][LEN][PLD..][CSM]` frames.
///
/// ```
/// use serialcom::{Mode, Output, PacketDecoder};
///
/// let mut pd = PacketDecoder::new(Mode::Decode);
/// let out: Vec<Output> = pd.feed(&[0xF5, 0x01, 0x00, 0x00]).collect();
/// assert_eq!(out[0].as_str(), Some("SYS_SRESET:"));
/// ```
#[derive(Debug, Clone)]
pub struct PacketDecoder<H: DecodeHook = NoHook> {
    state: State,
    mode: Mode,
    packet: Vec<u8, FRAME_CAPACITY>,
    csum: u8,
    len: u8,
    hook: H,
}

impl Default for PacketDecoder {
    fn default() -> Self {
        Self::new(Mode::default())
    }
}

impl PacketDecoder {
    pub fn new(mode: Mode) -> PacketDecoder {
        PacketDecoder::with_hook(mode, NoHook)
    }
}

impl<H: DecodeHook> PacketDecoder<H> {
    pub fn with_hook(mode: Mode, hook: H) -> PacketDecoder<H> {
        PacketDecoder {
            state: State::Header,
            mode,
            packet: Vec::new(),
            csum: 0,
            len: 0,
            hook,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Takes effect on the next completed unit. A frame in progress is not
    /// aborted.
    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    /// Case-insensitive mode by name. An unknown name leaves the current
    /// mode in place and returns `false`.
    pub fn set_mode_str(&mut self, mode: &str) -> bool {
        match mode.parse() {
            Ok(m) => {
                self.mode = m;
                true
            }
            Err(ModeError) => false,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn hook(&self) -> &H {
        &self.hook
    }

    pub fn hook_mut(&mut self) -> &mut H {
        &mut self.hook
    }

    pub fn into_hook(self) -> H {
        self.hook
    }

    /// Drop any partial frame and wait for a header
    pub fn reset(&mut self) {
        self.state = State::Header;
        self.packet.clear();
        self.csum = 0;
        self.len = 0;
    }

    /// Run one byte through the state machine. Returns at most one unit.
    pub fn add_byte(&mut self, byte: u8) -> Option<Output> {
        match self.state {
            State::Header => {
                if byte == HEADER {
                    self.packet.clear();
                    self.csum = 0;
                    let _ = self.packet.push(byte);
                    self.state = State::Length;
                    return None;
                }
                if let Some(control) = Control::from_byte(byte) {
                    log::trace!("{} received", control.name());
                    return self.render_control(control);
                }
                log::trace!("dropping {byte:#04x} while waiting for header");
                self.hook.on_error(DecodeError::BadHeader { found: byte });
                None
            }
            State::Length => {
                if byte as usize > MAX_PACKET {
                    log::debug!("frame aborted: length {byte} exceeds {MAX_PACKET}");
                    self.hook.on_error(DecodeError::OversizeLength { length: byte });
                    self.reset();
                    return None;
                }
                let _ = self.packet.push(byte);
                self.len = byte;
                // Nothing to collect, the checksum of an empty payload is 0
                self.state = if byte == 0 { State::Checksum } else { State::Payload };
                None
            }
            State::Payload => {
                // Cannot overflow: len <= MAX_PACKET and the buffer holds
                // MAX_PACKET + 3 bytes
                let _ = self.packet.push(byte);
                self.csum ^= byte;
                if self.packet.len() >= 2 + self.len as usize {
                    self.state = State::Checksum;
                }
                None
            }
            State::Checksum => {
                if byte != self.csum {
                    log::debug!(
                        "frame aborted: checksum {byte:#04x}, calculated {:#04x}",
                        self.csum
                    );
                    self.hook.on_error(DecodeError::ChecksumMismatch {
                        calculated: self.csum,
                        found: byte,
                    });
                    self.reset();
                    return None;
                }
                let _ = self.packet.push(byte);
                self.state = State::Header;
                Some(self.render_frame())
            }
        }
    }

    /// Outputs produced by a run of bytes, in order
    pub fn feed<'a>(&'a mut self, bytes: &'a [u8]) -> impl Iterator<Item = Output> + 'a {
        bytes.iter().filter_map(move |b| self.add_byte(*b))
    }

    fn render_control(&self, control: Control) -> Option<Output> {
        match self.mode {
            Mode::Full => Some(Output::Control(control)),
            Mode::Payload => None,
            Mode::Decode => {
                let mut text = String::new();
                let _ = text.push_str(control.name());
                Some(Output::Text(text))
            }
        }
    }

    fn render_frame(&self) -> Output {
        let payload = &self.packet[2..self.packet.len() - 1];
        match self.mode {
            Mode::Full => Output::Frame(self.packet.clone()),
            Mode::Payload => {
                let mut p = Vec::new();
                let _ = p.extend_from_slice(payload);
                Output::Payload(p)
            }
            Mode::Decode => {
                let mut text = String::new();
                let name = payload.first().and_then(|c| name_of(*c)).unwrap_or("Unknown");
                let _ = text.push_str(name);
                let _ = text.push(':');
                for b in payload.iter().skip(1) {
                    let _ = write!(text, "{b:02x}");
                }
                Output::Text(text)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ACK, DIO_SETVAL, IAM, NAK, SYS_SRESET};

    fn run<H: DecodeHook>(pd: &mut PacketDecoder<H>, bytes: &[u8]) -> std::vec::Vec<Output> {
        pd.feed(bytes).collect()
    }

    #[test]
    fn decode_reset_command() {
        let mut pd = PacketDecoder::new(Mode::Decode);
        let out = run(&mut pd, &[HEADER, 0x01, SYS_SRESET, 0x00]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].as_str(), Some("SYS_SRESET:"));
    }

    #[test]
    fn decode_hex_data() {
        let mut pd = PacketDecoder::new(Mode::Decode);
        let out = run(&mut pd, &[HEADER, 0x02, DIO_SETVAL, 0x01, DIO_SETVAL ^ 0x01]);
        assert_eq!(out[0].as_str(), Some("DIO_SETVAL:01"));

        let out = run(&mut pd, &[HEADER, 0x05, 0xFF, 0x02, 0x03, 0xAB, 0x05, 0xFF ^ 0x02 ^ 0x03 ^ 0xAB ^ 0x05]);
        assert_eq!(out[0].as_str(), Some("Unknown:0203ab05"));
    }

    #[test]
    fn full_mode_control_byte() {
        let mut pd = PacketDecoder::new(Mode::Full);
        let out = run(&mut pd, &[ACK]);
        assert_eq!(out, [Output::Control(Control::Ack)]);
        assert_eq!(out[0].as_bytes(), Some(&[0xF6][..]));
        assert_eq!(pd.state(), State::Header);
    }

    #[test]
    fn control_byte_rendering_per_mode() {
        let mut pd = PacketDecoder::new(Mode::Decode);
        let out = run(&mut pd, &[ACK, NAK, IAM]);
        let names: std::vec::Vec<_> = out.iter().map(|o| o.as_str().unwrap()).collect();
        assert_eq!(names, ["ACK", "NAK", "IAM"]);

        pd.set_mode(Mode::Payload);
        assert!(run(&mut pd, &[ACK, NAK, IAM]).is_empty());
    }

    #[test]
    fn oversize_length_aborts() {
        let mut counts = ErrorCounts::default();
        let mut pd = PacketDecoder::with_hook(Mode::Full, &mut counts);
        assert!(run(&mut pd, &[HEADER, 0xFF]).is_empty());
        assert_eq!(pd.state(), State::Header);
        // a fresh header is accepted straight away
        let out = run(&mut pd, &[HEADER, 0x01, SYS_SRESET, 0x00]);
        assert_eq!(out[0].as_bytes(), Some(&[HEADER, 0x01, SYS_SRESET, 0x00][..]));
        drop(pd);
        assert_eq!(counts.oversize_length, 1);
        assert_eq!(counts.total(), 1);
    }

    #[test]
    fn length_bound_is_max_packet() {
        let mut pd = PacketDecoder::new(Mode::Payload);
        let mut frame = std::vec![HEADER, MAX_PACKET as u8];
        frame.extend(1..=MAX_PACKET as u8);
        frame.push((1..=MAX_PACKET as u8).fold(0u8, |a, b| a ^ b));
        let out = run(&mut pd, &frame);
        assert_eq!(out[0].as_bytes().unwrap().len(), MAX_PACKET);

        assert!(pd.add_byte(HEADER).is_none());
        assert!(pd.add_byte(MAX_PACKET as u8 + 1).is_none());
        assert_eq!(pd.state(), State::Header);
    }

    #[test]
    fn checksum_mismatch_aborts() {
        let mut pd = PacketDecoder::with_hook(Mode::Full, ErrorCounts::default());
        assert!(run(&mut pd, &[HEADER, 0x02, DIO_SETVAL, 0x01, 0x00]).is_empty());
        assert_eq!(pd.state(), State::Header);
        assert_eq!(pd.hook().checksum_mismatch, 1);
    }

    #[test]
    fn bad_header_bytes_are_counted() {
        let mut pd = PacketDecoder::with_hook(Mode::Full, ErrorCounts::default());
        assert!(run(&mut pd, &[0x00, 0x12, 0xFF]).is_empty());
        assert_eq!(pd.into_hook().bad_header, 3);
    }

    #[test]
    fn zero_length_payload() {
        let mut pd = PacketDecoder::new(Mode::Payload);
        let out = run(&mut pd, &[HEADER, 0x00, 0x00]);
        assert_eq!(out, [Output::Payload(Vec::new())]);

        pd.set_mode(Mode::Decode);
        let out = run(&mut pd, &[HEADER, 0x00, 0x00]);
        assert_eq!(out[0].as_str(), Some("Unknown:"));

        // the byte after a zero length is the checksum, never payload
        pd.set_mode(Mode::Payload);
        assert!(run(&mut pd, &[HEADER, 0x00, 0x07, 0x07]).is_empty());
        assert_eq!(pd.state(), State::Header);
    }

    #[test]
    fn reserved_bytes_inside_payload_are_data() {
        let payload = [HEADER, ACK, NAK, IAM];
        let mut frame = std::vec![HEADER, payload.len() as u8];
        frame.extend_from_slice(&payload);
        frame.push(HEADER ^ ACK ^ NAK ^ IAM);

        let mut pd = PacketDecoder::new(Mode::Payload);
        let out = run(&mut pd, &frame);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].as_bytes(), Some(&payload[..]));
    }

    #[test]
    fn header_as_length_or_checksum_is_not_resync() {
        // 0xF5 in the length slot is an oversize length, not a new frame
        let mut pd = PacketDecoder::new(Mode::Payload);
        assert!(run(&mut pd, &[HEADER, HEADER]).is_empty());
        assert_eq!(pd.state(), State::Header);

        // payload XORs to 0xF5, so 0xF5 is the valid checksum
        let out = run(&mut pd, &[HEADER, 0x01, HEADER, HEADER]);
        assert_eq!(out[0].as_bytes(), Some(&[HEADER][..]));
    }

    #[test]
    fn back_to_back_frames() {
        let mut pd = PacketDecoder::new(Mode::Payload);
        let out = run(
            &mut pd,
            &[HEADER, 0x01, 0x01, 0x01, HEADER, 0x02, DIO_SETVAL, 0x01, 0x11, ACK],
        );
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].as_bytes(), Some(&[0x01][..]));
        assert_eq!(out[1].as_bytes(), Some(&[DIO_SETVAL, 0x01][..]));
    }

    #[test]
    fn mode_change_mid_frame_applies_to_that_frame() {
        let mut pd = PacketDecoder::new(Mode::Full);
        assert!(run(&mut pd, &[HEADER, 0x02, DIO_SETVAL]).is_empty());
        pd.set_mode(Mode::Payload);
        assert_eq!(pd.state(), State::Payload);
        let out = run(&mut pd, &[0x01, 0x11]);
        assert_eq!(out[0].as_bytes(), Some(&[DIO_SETVAL, 0x01][..]));
    }

    #[test]
    fn mode_strings() {
        assert_eq!("FULL".parse(), Ok(Mode::Full));
        assert_eq!("Payload".parse(), Ok(Mode::Payload));
        assert_eq!("decode".parse(), Ok(Mode::Decode));
        assert_eq!("hex".parse::<Mode>(), Err(ModeError));

        let mut pd = PacketDecoder::new(Mode::Payload);
        assert!(!pd.set_mode_str("ascii"));
        assert_eq!(pd.mode(), Mode::Payload);
        assert!(pd.set_mode_str("DeCoDe"));
        assert_eq!(pd.mode(), Mode::Decode);
    }

    #[test]
    fn reset_discards_partial_frame() {
        let mut pd = PacketDecoder::new(Mode::Payload);
        assert!(run(&mut pd, &[HEADER, 0x03, 0x01]).is_empty());
        pd.reset();
        assert_eq!(pd.state(), State::Header);
        let out = run(&mut pd, &[HEADER, 0x01, 0x07, 0x07]);
        assert_eq!(out[0].as_bytes(), Some(&[0x07][..]));
    }

    #[test]
    fn longest_text_fits() {
        let mut pd = PacketDecoder::new(Mode::Decode);
        let mut frame = std::vec![HEADER, MAX_PACKET as u8, 0x00];
        frame.extend(std::iter::repeat_n(0xAB, MAX_PACKET - 1));
        frame.push(frame[2..].iter().fold(0u8, |a, b| a ^ b));
        let out = run(&mut pd, &frame);
        let text = out[0].as_str().unwrap();
        assert_eq!(text.len(), "SYS_SRESET:".len() + 2 * (MAX_PACKET - 1));
        assert!(text.ends_with("abab"));
    }
}
