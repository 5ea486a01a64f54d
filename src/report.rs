//! Sample reports sent by the device.
//!
//! A report payload is an `RPT_*` command code followed by one big endian
//! value per channel, all of the width named by the code. `RPT_FINISH`
//! carries no data and ends a run of reports.

use crate::{
    Decode,
    protocol::{
        RPT_FINISH, RPT_S08XXX, RPT_S16XXX, RPT_S32XXX, RPT_U08XXX, RPT_U16XXX, RPT_U32XXX,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleKind {
    U8,
    S8,
    U16,
    S16,
    U32,
    S32,
}

impl SampleKind {
    pub fn from_code(code: u8) -> Option<SampleKind> {
        match code {
            RPT_U08XXX => Some(SampleKind::U8),
            RPT_S08XXX => Some(SampleKind::S8),
            RPT_U16XXX => Some(SampleKind::U16),
            RPT_S16XXX => Some(SampleKind::S16),
            RPT_U32XXX => Some(SampleKind::U32),
            RPT_S32XXX => Some(SampleKind::S32),
            _ => None,
        }
    }

    /// Bytes per sample
    pub fn width(&self) -> usize {
        match self {
            SampleKind::U8 | SampleKind::S8 => 1,
            SampleKind::U16 | SampleKind::S16 => 2,
            SampleKind::U32 | SampleKind::S32 => 4,
        }
    }

    fn read(&self, chunk: &[u8]) -> i64 {
        match self {
            SampleKind::U8 => chunk[0] as i64,
            SampleKind::S8 => chunk[0] as i8 as i64,
            SampleKind::U16 => u16::from_be_bytes([chunk[0], chunk[1]]) as i64,
            SampleKind::S16 => i16::from_be_bytes([chunk[0], chunk[1]]) as i64,
            SampleKind::U32 => {
                u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]) as i64
            }
            SampleKind::S32 => {
                i32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]) as i64
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Report<'a> {
    Finish,
    Samples { kind: SampleKind, data: &'a [u8] },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportError {
    Empty,
    NotAReport { code: u8 },
    /// Data length is not a multiple of the sample width
    Misaligned { kind: SampleKind, len: usize },
}

impl<'a> Report<'a> {
    pub fn kind(&self) -> Option<SampleKind> {
        match self {
            Report::Finish => None,
            Report::Samples { kind, .. } => Some(*kind),
        }
    }

    /// Number of channels carried
    pub fn channels(&self) -> usize {
        match self {
            Report::Finish => 0,
            Report::Samples { kind, data } => data.len() / kind.width(),
        }
    }

    /// One value per channel, widened to `i64`
    pub fn samples(&self) -> impl Iterator<Item = i64> + 'a {
        let (kind, data) = match *self {
            Report::Finish => (SampleKind::U8, &[][..]),
            Report::Samples { kind, data } => (kind, data),
        };
        data.chunks_exact(kind.width()).map(move |c| kind.read(c))
    }
}

impl<'a> Decode<'a> for Report<'a> {
    type Error = ReportError;

    fn decode(payload: &'a [u8]) -> Result<Self, Self::Error> {
        let (&code, data) = payload.split_first().ok_or(ReportError::Empty)?;
        if code == RPT_FINISH {
            return Ok(Report::Finish);
        }
        let kind = SampleKind::from_code(code).ok_or(ReportError::NotAReport { code })?;
        if data.len() % kind.width() != 0 {
            return Err(ReportError::Misaligned {
                kind,
                len: data.len(),
            });
        }
        Ok(Report::Samples { kind, data })
    }
}
