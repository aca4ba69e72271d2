use std::{
    fs::File,
    io::{self, Read},
    path::{Path, PathBuf},
};

use once_cell::sync::Lazy;

use crate::{
    error::{OverlayError, OverlayResult},
    log_call, log_more, log_res,
    logwrapper::LogWrapper,
};

use self::{
    dir::OverlayDir,
    header::{HeaderType, OverlayHeader, HEADER_LENGTH},
    lock::OverlayLock,
};

pub mod dir;
pub mod header;
pub mod lock;
pub mod lookup;

pub const ROOT_INODE_NUMBER: u64 = 1;
pub const NUM_SHARDS: usize = 256;

static SHARD_NAMES: Lazy<Vec<String>> =
    Lazy::new(|| (0..NUM_SHARDS).map(|i| format!("{:02x}", i)).collect());

/// Name of the shard subdirectory holding `inode_number`.
pub fn shard_name(inode_number: u64) -> &'static str {
    &SHARD_NAMES[(inode_number % NUM_SHARDS as u64) as usize]
}

/// All shard subdirectory names, `00` through `ff`.
pub fn shard_names() -> &'static [String] {
    &SHARD_NAMES
}

/// Read access to an overlay directory.
#[derive(Debug, Clone)]
pub struct Overlay {
    root: PathBuf,
}

impl Overlay {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn shard_path(&self, shard: &str) -> PathBuf {
        self.root.join(shard)
    }

    pub fn inode_path(&self, inode_number: u64) -> PathBuf {
        self.root
            .join(shard_name(inode_number))
            .join(inode_number.to_string())
    }

    pub fn try_lock(&self) -> OverlayLock {
        OverlayLock::acquire(&self.root)
    }

    pub fn open_overlay_file(&self, inode_number: u64) -> OverlayResult<File> {
        let path = self.inode_path(inode_number);
        File::open(&path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                OverlayError::NotMaterialized(inode_number)
            } else {
                OverlayError::Io(e)
            }
        })
    }

    /// Reads and parses the header from the current position of `f`.
    pub fn read_header<R: Read>(&self, f: &mut R) -> OverlayResult<OverlayHeader> {
        let mut data = Vec::with_capacity(HEADER_LENGTH);
        f.take(HEADER_LENGTH as u64).read_to_end(&mut data)?;
        OverlayHeader::parse(&data)
    }

    pub fn check_header<R: Read>(
        &self,
        f: &mut R,
        inode_number: u64,
        expected: HeaderType,
    ) -> OverlayResult<OverlayHeader> {
        let header = self.read_header(f)?;
        if header.kind != expected {
            return Err(OverlayError::TypeMismatch {
                inode: inode_number,
                expected,
                found: header.kind,
            });
        }
        Ok(header)
    }

    pub fn parse_dir_inode_data(&self, data: &[u8]) -> OverlayResult<OverlayDir> {
        Ok(OverlayDir::parse(data)?)
    }

    pub fn read_dir_inode(&self, inode_number: u64) -> OverlayResult<OverlayDir> {
        Ok(self.read_dir_inode_with_header(inode_number)?.1)
    }

    pub fn read_dir_inode_with_header(
        &self,
        inode_number: u64,
    ) -> OverlayResult<(OverlayHeader, OverlayDir)> {
        let callid = log_call!("READDIR", "ino={}", inode_number);
        let res = (|| -> OverlayResult<(OverlayHeader, OverlayDir)> {
            let mut f = self.open_overlay_file(inode_number)?;
            let header = self.check_header(&mut f, inode_number, HeaderType::Directory)?;
            let mut data = Vec::new();
            f.read_to_end(&mut data)?;
            log_more!(callid, "body={} bytes", data.len());
            Ok((header, self.parse_dir_inode_data(&data)?))
        })();
        log_res!(
            callid,
            "{}",
            res.as_ref().map(|(_, d)| d.entries.len() as u64).lw()
        );
        res
    }

    /// Opens a file inode, returning its header and the file positioned at
    /// the start of the contents.
    pub fn open_file_inode(&self, inode_number: u64) -> OverlayResult<(OverlayHeader, File)> {
        let mut f = self.open_overlay_file(inode_number)?;
        let header = self.check_header(&mut f, inode_number, HeaderType::File)?;
        Ok((header, f))
    }
}

#[cfg(test)]
mod tests {
    use std::{ffi::OsString, io::Read, path::PathBuf};

    use maplit::btreemap;
    use proptest::prelude::*;

    use super::{shard_name, shard_names, Overlay};
    use crate::{
        error::OverlayError,
        overlay::{
            dir::{OverlayDir, OverlayEntry},
            header::HeaderType,
        },
        test::TestOverlay,
    };

    #[test]
    fn shard_layout() {
        assert_eq!(shard_name(0), "00");
        assert_eq!(shard_name(1), "01");
        assert_eq!(shard_name(255), "ff");
        assert_eq!(shard_name(256), "00");
        assert_eq!(shard_name(0x1234), "34");
        assert_eq!(shard_name(u64::MAX), "ff");
        assert_eq!(shard_names().len(), 256);
        let o = Overlay::new("/ov");
        assert_eq!(o.inode_path(0xab), PathBuf::from("/ov/ab/171"));
        assert_eq!(o.inode_path(1000), PathBuf::from("/ov/e8/1000"));
    }

    #[test]
    fn open_missing_is_not_materialized() {
        let t = TestOverlay::new();
        assert!(matches!(
            t.overlay.open_overlay_file(42),
            Err(OverlayError::NotMaterialized(42))
        ));
    }

    #[test]
    fn read_dir_and_file() {
        let t = TestOverlay::new();
        let dir = OverlayDir {
            entries: btreemap! {
                OsString::from("a") => OverlayEntry {
                    mode: Some(0o100644),
                    inode_number: Some(2),
                    hash: None,
                },
            },
        };
        t.write_dir(1, &dir);
        t.write_file(2, b"hello");

        let (header, read) = t.overlay.read_dir_inode_with_header(1).unwrap();
        assert_eq!(header.kind, HeaderType::Directory);
        assert_eq!(read, dir);

        let (header, mut f) = t.overlay.open_file_inode(2).unwrap();
        assert_eq!(header.kind, HeaderType::File);
        let mut contents = String::new();
        f.read_to_string(&mut contents).unwrap();
        assert_eq!(contents, "hello");
    }

    #[test]
    fn type_confusion() {
        let t = TestOverlay::new();
        t.write_file(3, b"not a directory");
        assert!(matches!(
            t.overlay.read_dir_inode(3),
            Err(OverlayError::TypeMismatch {
                inode: 3,
                expected: HeaderType::Directory,
                found: HeaderType::File
            })
        ));
        t.write_dir(4, &OverlayDir::new());
        assert!(matches!(
            t.overlay.open_file_inode(4),
            Err(OverlayError::TypeMismatch { inode: 4, .. })
        ));
    }

    #[test]
    fn short_header_from_stream() {
        let t = TestOverlay::new();
        let mut data: &[u8] = b"OVDR";
        assert!(matches!(
            t.overlay.read_header(&mut data),
            Err(OverlayError::InvalidFormat(_))
        ));
    }

    #[test]
    fn corrupt_dir_body() {
        let t = TestOverlay::new();
        t.write_raw_dir_body(5, &[0x1b, 0x05]);
        assert!(matches!(
            t.overlay.read_dir_inode(5),
            Err(OverlayError::Decode(_))
        ));
    }

    proptest! {
        #[test]
        fn inode_paths_follow_low_byte(ino in any::<u64>()) {
            let o = Overlay::new("/ov");
            let expected = PathBuf::from("/ov")
                .join(format!("{:02x}", ino % 256))
                .join(ino.to_string());
            let shard = o.shard_path(shard_name(ino));
            prop_assert_eq!(expected.parent(), Some(shard.as_path()));
            prop_assert_eq!(o.inode_path(ino), expected);
        }
    }
}
