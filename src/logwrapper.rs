use std::ffi::{OsStr, OsString};
use std::os::unix::ffi::OsStrExt;

use crate::error::OverlayError;

/// Compact renderings for trace lines and listings.
pub trait LogWrapper {
    fn lw(&self) -> String;
}

impl LogWrapper for u32 {
    fn lw(&self) -> String {
        format!("{:#o}", self)
    }
}

impl LogWrapper for u64 {
    fn lw(&self) -> String {
        format!("{}", self)
    }
}

impl LogWrapper for OsStr {
    fn lw(&self) -> String {
        stfu8::encode_u8(self.as_bytes())
    }
}

impl LogWrapper for OsString {
    fn lw(&self) -> String {
        self.as_os_str().lw()
    }
}

impl LogWrapper for Vec<u8> {
    fn lw(&self) -> String {
        hex::encode(self)
    }
}

impl<T: LogWrapper> LogWrapper for Option<T> {
    fn lw(&self) -> String {
        match self {
            Some(v) => v.lw(),
            None => String::from("-"),
        }
    }
}

impl<T: LogWrapper + ?Sized> LogWrapper for &T {
    fn lw(&self) -> String {
        (**self).lw()
    }
}

impl LogWrapper for OverlayError {
    fn lw(&self) -> String {
        format!("{}", self)
    }
}

impl<T: LogWrapper, E: LogWrapper> LogWrapper for Result<T, E> {
    fn lw(&self) -> String {
        match self {
            Ok(v) => format!("Ok({})", v.lw()),
            Err(e) => format!("Err({})", e.lw()),
        }
    }
}
