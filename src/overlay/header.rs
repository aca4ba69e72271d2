use std::fmt;

use asserteq_pretty_macros::PrettyDiff;
use serde::{Deserialize, Serialize};

use crate::error::{OverlayError, OverlayResult};

pub const HEADER_LENGTH: usize = 64;
pub const VERSION_1: u32 = 1;

const NSEC_PER_SEC: f64 = 1_000_000_000.0;

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Copy)]
pub enum HeaderType {
    Directory,
    File,
}

impl HeaderType {
    pub const fn tag(self) -> &'static [u8; 4] {
        match self {
            HeaderType::Directory => b"OVDR",
            HeaderType::File => b"OVFL",
        }
    }

    pub fn from_tag(tag: &[u8]) -> Option<Self> {
        match tag {
            b"OVDR" => Some(HeaderType::Directory),
            b"OVFL" => Some(HeaderType::File),
            _ => None,
        }
    }
}

impl fmt::Display for HeaderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HeaderType::Directory => "OVDR",
            HeaderType::File => "OVFL",
        })
    }
}

impl asserteq_pretty::PrettyDiff for HeaderType {
    fn pretty_diff(left: &Self, right: &Self) -> String {
        format!("`{:?}` != `{:?}`", left, right)
    }
}

/// The fixed 64 byte prefix of every overlay file.
///
/// Layout (big-endian): 4 byte type tag, u32 version, then atime, ctime and
/// mtime as (u64 seconds, u64 nanoseconds) pairs, then 8 reserved bytes.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, PrettyDiff)]
pub struct OverlayHeader {
    pub kind: HeaderType,
    pub version: u32,
    pub atime_sec: u64,
    pub atime_nsec: u64,
    pub ctime_sec: u64,
    pub ctime_nsec: u64,
    pub mtime_sec: u64,
    pub mtime_nsec: u64,
    pub padding: u64,
}

fn to_secs_f64(sec: u64, nsec: u64) -> f64 {
    sec as f64 + nsec as f64 / NSEC_PER_SEC
}

fn from_secs_f64(value: f64) -> (u64, u64) {
    let sec = value.trunc();
    let nsec = ((value - sec) * NSEC_PER_SEC) as u64;
    (sec as u64, nsec)
}

fn be_u32(data: &[u8], offset: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&data[offset..offset + 4]);
    u32::from_be_bytes(buf)
}

fn be_u64(data: &[u8], offset: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&data[offset..offset + 8]);
    u64::from_be_bytes(buf)
}

impl OverlayHeader {
    pub fn new(kind: HeaderType) -> Self {
        Self {
            kind,
            version: VERSION_1,
            atime_sec: 0,
            atime_nsec: 0,
            ctime_sec: 0,
            ctime_nsec: 0,
            mtime_sec: 0,
            mtime_nsec: 0,
            padding: 0,
        }
    }

    /// Parses the header from the start of `data`. Bytes past the header are
    /// ignored.
    pub fn parse(data: &[u8]) -> OverlayResult<Self> {
        // Zero-length files show up after unclean shutdowns, so they get
        // their own message.
        if data.is_empty() {
            return Err(OverlayError::InvalidFormat(String::from(
                "zero-sized overlay file",
            )));
        }
        if data.len() < HEADER_LENGTH {
            return Err(OverlayError::InvalidFormat(format!(
                "overlay file is too short to contain a header: length={}",
                data.len()
            )));
        }

        let kind = HeaderType::from_tag(&data[0..4]).ok_or_else(|| {
            OverlayError::InvalidFormat(format!(
                "unknown overlay file type {}",
                stfu8::encode_u8(&data[0..4])
            ))
        })?;
        let version = be_u32(data, 4);
        if version != VERSION_1 {
            return Err(OverlayError::InvalidFormat(format!(
                "unsupported overlay file version {}",
                version
            )));
        }

        Ok(Self {
            kind,
            version,
            atime_sec: be_u64(data, 8),
            atime_nsec: be_u64(data, 16),
            ctime_sec: be_u64(data, 24),
            ctime_nsec: be_u64(data, 32),
            mtime_sec: be_u64(data, 40),
            mtime_nsec: be_u64(data, 48),
            padding: be_u64(data, 56),
        })
    }

    pub fn serialize(&self) -> [u8; HEADER_LENGTH] {
        let mut out = [0u8; HEADER_LENGTH];
        out[0..4].copy_from_slice(self.kind.tag());
        out[4..8].copy_from_slice(&self.version.to_be_bytes());
        let fields = [
            self.atime_sec,
            self.atime_nsec,
            self.ctime_sec,
            self.ctime_nsec,
            self.mtime_sec,
            self.mtime_nsec,
            self.padding,
        ];
        for (i, v) in fields.iter().enumerate() {
            let offset = 8 + i * 8;
            out[offset..offset + 8].copy_from_slice(&v.to_be_bytes());
        }
        out
    }

    pub fn atime(&self) -> f64 {
        to_secs_f64(self.atime_sec, self.atime_nsec)
    }

    pub fn set_atime(&mut self, value: f64) {
        (self.atime_sec, self.atime_nsec) = from_secs_f64(value);
    }

    pub fn ctime(&self) -> f64 {
        to_secs_f64(self.ctime_sec, self.ctime_nsec)
    }

    pub fn set_ctime(&mut self, value: f64) {
        (self.ctime_sec, self.ctime_nsec) = from_secs_f64(value);
    }

    pub fn mtime(&self) -> f64 {
        to_secs_f64(self.mtime_sec, self.mtime_nsec)
    }

    pub fn set_mtime(&mut self, value: f64) {
        (self.mtime_sec, self.mtime_nsec) = from_secs_f64(value);
    }
}
