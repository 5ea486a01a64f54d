//! Wire constants and command codes shared with the device firmware.
//!
//! ```text
//! [HDR=0xF5][LEN][PLD...(LEN bytes)][CSM]
//! CSM = XOR of all PLD bytes (header and length excluded)
//! ```
//!
//! The first payload byte is the command code. ACK, NAK and IAM travel as
//! bare single bytes outside of any frame.

use bilge::prelude::*;

/// Largest payload the device sends or accepts
pub const MAX_PAYLOAD: usize = 10;
/// Header: 1, Length: 1, Checksum: 1
pub const MAX_PACKET: usize = MAX_PAYLOAD + 3;
/// Data bytes following the command code
pub const MAX_DATA: usize = MAX_PAYLOAD - 1;
/// Largest frame admitted by the length check, which bounds the length
/// byte by `MAX_PACKET` rather than `MAX_PAYLOAD`
pub const FRAME_CAPACITY: usize = MAX_PACKET + 3;

/// Header signature
pub const HEADER: u8 = 0xF5;
pub const ACK: u8 = 0xF6;
pub const NAK: u8 = 0xF7;
pub const IAM: u8 = 0xF8;

// System control
pub const SYS_SRESET: u8 = 0x00;
pub const SYS_WRESET: u8 = 0x01;
pub const SYS_STPMOD: u8 = 0x02;
pub const SYS_DSLMOD: u8 = 0x03;
pub const SYS_SLPMOD: u8 = 0x04;

// DIO control
pub const DIO_SETVAL: u8 = 0x10;
pub const DIO_RSTVAL: u8 = 0x11;
pub const DIO_GETVAL: u8 = 0x12;
pub const DIO_TGLVAL: u8 = 0x13;

// ADC control
pub const ADC_SETMAG: u8 = 0x20;
pub const ADC_SETFRQ: u8 = 0x21;
pub const ADC_CONSTV: u8 = 0x23;
pub const ADC_SINEWV: u8 = 0x24;
pub const ADC_SWTHWV: u8 = 0x25;
pub const ADC_TRNGWV: u8 = 0x26;

// DAC control
pub const DAC_SETFRQ: u8 = 0x30;
pub const DAC_CAPSGL: u8 = 0x31;
pub const DAC_CAPCNT: u8 = 0x32;

// TSC control
pub const TSC_RPTVAL: u8 = 0x40;

// Report data
pub const RPT_FINISH: u8 = 0x80;
pub const RPT_U08XXX: u8 = 0x81;
pub const RPT_S08XXX: u8 = 0x82;
pub const RPT_U16XXX: u8 = 0x83;
pub const RPT_S16XXX: u8 = 0x84;
pub const RPT_U32XXX: u8 = 0x85;
pub const RPT_S32XXX: u8 = 0x86;

/// Display name of a command code. Unknown codes are valid payload content,
/// so a miss is `None` rather than an error.
pub fn name_of(code: u8) -> Option<&'static str> {
    let name = match code {
        SYS_SRESET => "SYS_SRESET",
        SYS_WRESET => "SYS_WRESET",
        SYS_STPMOD => "SYS_STPMOD",
        SYS_DSLMOD => "SYS_DSLMOD",
        SYS_SLPMOD => "SYS_SLPMOD",
        DIO_SETVAL => "DIO_SETVAL",
        DIO_RSTVAL => "DIO_RSTVAL",
        DIO_GETVAL => "DIO_GETVAL",
        DIO_TGLVAL => "DIO_TGLVAL",
        ADC_SETMAG => "ADC_SETMAG",
        ADC_SETFRQ => "ADC_SETFRQ",
        ADC_CONSTV => "ADC_CONSTV",
        ADC_SINEWV => "ADC_SINEWV",
        ADC_SWTHWV => "ADC_SWTHWV",
        ADC_TRNGWV => "ADC_TRNGWV",
        DAC_SETFRQ => "DAC_SETFRQ",
        DAC_CAPSGL => "DAC_CAPSGL",
        DAC_CAPCNT => "DAC_CAPCNT",
        TSC_RPTVAL => "TSC_RPTVAL",
        RPT_FINISH => "RPT_FINISH",
        RPT_U08XXX => "RPT_U08XXX",
        RPT_S08XXX => "RPT_S08XXX",
        RPT_U16XXX => "RPT_U16XXX",
        RPT_S16XXX => "RPT_S16XXX",
        RPT_U32XXX => "RPT_U32XXX",
        RPT_S32XXX => "RPT_S32XXX",
        _ => return None,
    };
    Some(name)
}

/// Command group, taken from the leading nibble of the command code
#[bitsize(4)]
#[derive(FromBits, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Group {
    Sys = 0x0,
    Dio = 0x1,
    Adc = 0x2,
    Dac = 0x3,
    Tsc = 0x4,
    Rpt = 0x8,
    #[fallback]
    Reserved,
}

/// Bit view of a command byte: `[group: 4][index: 4]`
#[bitsize(8)]
#[derive(DebugBits, Clone, Copy, PartialEq, FromBits)]
pub struct CommandCode {
    pub index: u4,
    pub group: Group,
}

impl CommandCode {
    pub fn name(&self) -> Option<&'static str> {
        name_of(self.value)
    }
}

/// Single-byte control signals that bypass framing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Ack,
    Nak,
    Iam,
}

impl Control {
    pub fn from_byte(byte: u8) -> Option<Control> {
        match byte {
            ACK => Some(Control::Ack),
            NAK => Some(Control::Nak),
            IAM => Some(Control::Iam),
            _ => None,
        }
    }

    pub fn byte(&self) -> u8 {
        match self {
            Control::Ack => ACK,
            Control::Nak => NAK,
            Control::Iam => IAM,
        }
    }

    /// The wire form as a one byte slice
    pub fn as_bytes(&self) -> &'static [u8] {
        match self {
            Control::Ack => &[ACK],
            Control::Nak => &[NAK],
            Control::Iam => &[IAM],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Control::Ack => "ACK",
            Control::Nak => "NAK",
            Control::Iam => "IAM",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_have_names() {
        assert_eq!(name_of(SYS_SRESET), Some("SYS_SRESET"));
        assert_eq!(name_of(DAC_CAPCNT), Some("DAC_CAPCNT"));
        assert_eq!(name_of(TSC_RPTVAL), Some("TSC_RPTVAL"));
        assert_eq!(name_of(RPT_S32XXX), Some("RPT_S32XXX"));
    }

    #[test]
    fn unknown_codes_miss() {
        // gap in the ADC group
        assert_eq!(name_of(0x22), None);
        assert_eq!(name_of(0xFF), None);
        assert_eq!(name_of(HEADER), None);
    }

    #[test]
    fn command_code_nibbles() {
        let code = CommandCode::from(ADC_SINEWV);
        assert_eq!(code.group(), Group::Adc);
        assert_eq!(code.index().value(), 4);
        assert_eq!(code.name(), Some("ADC_SINEWV"));

        let code = CommandCode::from(RPT_U16XXX);
        assert_eq!(code.group(), Group::Rpt);
        assert_eq!(code.index().value(), 3);

        assert_eq!(CommandCode::from(0xF5).group(), Group::Reserved);
        assert_eq!(CommandCode::from(0x5A).group(), Group::Reserved);
    }

    #[test]
    fn every_named_code_sits_in_a_group() {
        for code in 0..=u8::MAX {
            if name_of(code).is_some() {
                assert_ne!(CommandCode::from(code).group(), Group::Reserved, "{code:#04x}");
            }
        }
    }

    #[test]
    fn control_bytes() {
        for byte in [ACK, NAK, IAM] {
            let control = Control::from_byte(byte).unwrap();
            assert_eq!(control.byte(), byte);
            assert_eq!(control.as_bytes(), &[byte]);
        }
        assert_eq!(Control::from_byte(HEADER), None);
        assert_eq!(Control::Nak.name(), "NAK");
    }
}
