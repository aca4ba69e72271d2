use std::{fs::File, os::unix::io::AsRawFd, path::Path};

use crate::{log_call, log_res};

pub const INFO_FILE_NAME: &str = "info";

/// A scoped, advisory, non-blocking exclusive lock on the overlay's info file.
///
/// Failing to get the lock is not an error: the guard simply reports
/// `is_locked() == false`. When the guard is dropped the lock is released and
/// the file closed.
#[derive(Debug)]
pub struct OverlayLock {
    file: Option<File>,
    locked: bool,
}

impl OverlayLock {
    pub(crate) fn acquire(overlay_root: &Path) -> Self {
        let info_path = overlay_root.join(INFO_FILE_NAME);
        let callid = log_call!("LOCK", "path={:?}", info_path);
        let file = match File::open(&info_path) {
            Ok(f) => f,
            Err(e) => {
                log_res!(callid, "open failed: {}", e);
                return Self {
                    file: None,
                    locked: false,
                };
            }
        };
        let res = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
        let locked = res == 0;
        log_res!(callid, "locked={}", locked);
        Self {
            file: Some(file),
            locked,
        }
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }
}

impl Drop for OverlayLock {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            if self.locked {
                unsafe {
                    libc::flock(file.as_raw_fd(), libc::LOCK_UN);
                }
            }
        }
    }
}
