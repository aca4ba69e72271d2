use std::{ffi::OsStr, os::unix::ffi::OsStrExt};

use crate::{
    error::{OverlayError, OverlayResult},
    log_call, log_res,
};

use super::{Overlay, ROOT_INODE_NUMBER};

impl Overlay {
    /// Resolves a relative, `/`-separated path to an inode number using only
    /// the overlay.
    ///
    /// - `Ok(Some(n))`: the path is materialized as inode `n`.
    /// - `Ok(None)`: some directory along the way is not materialized (or the
    ///   final entry has no inode number yet), so the answer depends on source
    ///   control data this function does not have.
    /// - `Err(NotFound)` / `Err(NotADirectory)`: the path does not exist.
    ///
    /// Other errors come from reading the directories themselves.
    pub fn lookup_path(&self, path: &str) -> OverlayResult<Option<u64>> {
        let callid = log_call!("LOOKUP", "path={:?}", path);
        let res = self.do_lookup_path(path);
        log_res!(callid, "{:?}", res);
        res
    }

    fn do_lookup_path(&self, path: &str) -> OverlayResult<Option<u64>> {
        if path.is_empty() || path.starts_with('/') {
            return Err(OverlayError::InvalidPath(path.to_string()));
        }
        let parts: Vec<&str> = path.split('/').collect();

        let mut parent = ROOT_INODE_NUMBER;
        for (index, desired) in parts.iter().enumerate() {
            let dir = self.read_dir_inode(parent)?;
            let entry = dir
                .get(OsStr::from_bytes(desired.as_bytes()))
                .ok_or_else(|| OverlayError::NotFound(path.to_string()))?;

            if index + 1 == parts.len() {
                return Ok(match entry.inode() {
                    0 => None,
                    n => Some(n),
                });
            }

            if !entry.is_dir() {
                return Err(OverlayError::NotADirectory {
                    path: path.to_string(),
                    prefix: parts[..=index].join("/"),
                });
            }
            if entry.hash.as_ref().map_or(false, |h| !h.is_empty()) {
                // This directory is not materialized.
                return Ok(None);
            }
            match entry.inode() {
                0 => return Ok(None),
                n => parent = n,
            }
        }
        Err(OverlayError::InvalidPath(path.to_string()))
    }
}
