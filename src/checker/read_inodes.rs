use std::io::Write;

use walkdir::WalkDir;

use crate::{
    diagnostics::Diagnostic,
    error::OverlayResult,
    inode_table::InodeTable,
    log_call, log_more, log_res,
    overlay::shard_names,
};

use super::FilesystemChecker;

/// Parses an overlay file name: plain decimal digits only.
pub fn parse_inode_name(name: &str) -> Option<u64> {
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    name.parse().ok()
}

impl<W: Write> FilesystemChecker<'_, W> {
    /// Loads every file from every shard directory.
    ///
    /// Files whose names are not inode numbers are reported and skipped.
    /// Failing to list a shard directory aborts the scan.
    pub fn read_inodes(&mut self) -> OverlayResult<InodeTable> {
        let callid = log_call!("READ_INODES", "path={:?}", self.overlay.path());
        let mut inodes = InodeTable::new();

        for shard in shard_names() {
            let dir_path = self.overlay.shard_path(shard);
            let walker = WalkDir::new(&dir_path)
                .min_depth(1)
                .max_depth(1)
                .sort_by_file_name();
            for entry in walker {
                let entry = entry?;
                let inode_number = entry.file_name().to_str().and_then(parse_inode_name);
                let Some(inode_number) = inode_number else {
                    let mtime = entry
                        .path()
                        .symlink_metadata()
                        .and_then(|m| m.modified())
                        .ok();
                    self.add_error(Diagnostic::UnexpectedFile {
                        path: entry.into_path(),
                        mtime,
                    })?;
                    continue;
                };

                log_more!(callid, "{:?} -> {}", entry.path(), inode_number);
                inodes.insert(self.load_inode_info(inode_number));
            }
        }

        log_res!(callid, "{} inodes", inodes.len());
        Ok(inodes)
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;

    use maplit::btreemap;

    use super::parse_inode_name;
    use crate::{
        checker::{CheckerOptions, FilesystemChecker},
        diagnostics::Diagnostic,
        inode_table::InodeType,
        overlay::dir::{OverlayDir, OverlayEntry},
        test::TestOverlay,
    };

    #[test]
    fn inode_names() {
        assert_eq!(parse_inode_name("0"), Some(0));
        assert_eq!(parse_inode_name("1234"), Some(1234));
        assert_eq!(parse_inode_name(""), None);
        assert_eq!(parse_inode_name("+5"), None);
        assert_eq!(parse_inode_name("-5"), None);
        assert_eq!(parse_inode_name(" 5"), None);
        assert_eq!(parse_inode_name("5.tmp"), None);
        assert_eq!(parse_inode_name("99999999999999999999999"), None);
    }

    #[test]
    fn reads_every_shard() {
        let t = TestOverlay::new();
        t.write_dir(
            1,
            &OverlayDir {
                entries: btreemap! {
                    OsString::from("x") => OverlayEntry {
                        mode: Some(0o100644),
                        inode_number: Some(300),
                        hash: None,
                    },
                },
            },
        );
        t.write_file(300, b"x");
        t.write_file(255, b"y");
        t.write_raw(9, b"garbage");
        let mut checker =
            FilesystemChecker::with_output(&t.overlay, CheckerOptions::default(), Vec::new());
        let inodes = checker.read_inodes().unwrap();
        assert_eq!(inodes.len(), 4);
        assert_eq!(inodes.get(1).unwrap().kind, InodeType::Dir);
        assert_eq!(inodes.get(300).unwrap().kind, InodeType::File);
        assert_eq!(inodes.get(255).unwrap().kind, InodeType::File);
        assert_eq!(inodes.get(9).unwrap().kind, InodeType::Error);
        assert!(checker.errors().is_empty());
    }

    #[test]
    fn unexpected_files_reported() {
        let t = TestOverlay::new();
        t.write_dir(1, &OverlayDir::new());
        std::fs::write(t.overlay.path().join("0a").join("notes.txt"), b"hi").unwrap();
        let mut checker =
            FilesystemChecker::with_output(&t.overlay, CheckerOptions::default(), Vec::new());
        let inodes = checker.read_inodes().unwrap();
        assert_eq!(inodes.len(), 1);
        assert_eq!(checker.errors().len(), 1);
        match &checker.errors()[0] {
            Diagnostic::UnexpectedFile { path, mtime } => {
                assert!(path.ends_with("0a/notes.txt"));
                assert!(mtime.is_some());
            }
            other => panic!("unexpected {:?}", other),
        }
        let out = String::from_utf8(checker.output().clone()).unwrap();
        assert!(out.starts_with("warning: unexpected file present in overlay: "));
    }

    #[test]
    fn missing_shard_aborts() {
        let t = TestOverlay::new();
        std::fs::remove_dir(t.overlay.path().join("7f")).unwrap();
        let mut checker =
            FilesystemChecker::with_output(&t.overlay, CheckerOptions::default(), Vec::new());
        assert!(checker.read_inodes().is_err());
    }
}
