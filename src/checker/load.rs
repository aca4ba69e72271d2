use std::io::{Read, Write};

use crate::{
    error::OverlayResult,
    inode_table::{ChildInfo, InodeInfo, InodeType},
    log_call, log_more, log_res,
    overlay::{dir::OverlayDir, header::HeaderType},
};

use super::FilesystemChecker;

impl<W: Write> FilesystemChecker<'_, W> {
    /// Loads one inode file. Read and decode failures are recorded on the
    /// returned info.
    pub fn load_inode_info(&self, inode_number: u64) -> InodeInfo {
        let callid = log_call!("LOAD", "ino={}", inode_number);
        let mut mtime = None;

        // The file is closed when this closure returns, on every path.
        let read = (|| -> OverlayResult<(HeaderType, Option<Vec<u8>>)> {
            let mut f = self.overlay.open_overlay_file(inode_number)?;
            mtime = f.metadata().and_then(|m| m.modified()).ok();
            let header = self.overlay.read_header(&mut f)?;
            match header.kind {
                HeaderType::Directory => {
                    let mut data = Vec::new();
                    f.read_to_end(&mut data)?;
                    Ok((header.kind, Some(data)))
                }
                HeaderType::File => Ok((header.kind, None)),
            }
        })();

        let info = match read {
            Err(e) => {
                log_more!(callid, "read failed: {}", e);
                InodeInfo::new(inode_number, InodeType::Error, Vec::new(), mtime, Some(e))
            }
            Ok((HeaderType::File, _)) => {
                InodeInfo::new(inode_number, InodeType::File, Vec::new(), mtime, None)
            }
            Ok((HeaderType::Directory, data)) => {
                let data = data.unwrap_or_default();
                match self.overlay.parse_dir_inode_data(&data) {
                    Ok(dir) => InodeInfo::new(
                        inode_number,
                        InodeType::Dir,
                        children_of(dir),
                        mtime,
                        None,
                    ),
                    Err(e) => {
                        log_more!(callid, "decode failed: {}", e);
                        InodeInfo::new(inode_number, InodeType::DirError, Vec::new(), mtime, Some(e))
                    }
                }
            }
        };
        log_res!(callid, "{:?} children={}", info.kind, info.children.len());
        info
    }
}

fn children_of(dir: OverlayDir) -> Vec<ChildInfo> {
    dir.entries
        .into_iter()
        .map(|(name, entry)| ChildInfo::from_entry(name, &entry))
        .collect()
}
