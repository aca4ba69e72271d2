use std::path::PathBuf;

use crate::overlay::{
    dir::OverlayDir,
    header::{HeaderType, OverlayHeader},
    lock::INFO_FILE_NAME,
    shard_names, Overlay,
};

/// A freshly laid out overlay in its own directory, removed on drop.
///
/// Lives under `$OVERLAY_TEST_PATH` when set, else the system temp dir.
pub struct TestOverlay {
    pub overlay: Overlay,
}

impl TestOverlay {
    pub fn new() -> Self {
        let base: PathBuf = std::env::var_os("OVERLAY_TEST_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(std::env::temp_dir);
        let root = base.join(format!("overlay-fsck-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&root).unwrap();
        for shard in shard_names() {
            std::fs::create_dir(root.join(shard)).unwrap();
        }
        std::fs::write(root.join(INFO_FILE_NAME), b"\xed\xe0\x00\x01").unwrap();
        Self {
            overlay: Overlay::new(root),
        }
    }

    pub fn write_raw(&self, ino: u64, data: &[u8]) {
        std::fs::write(self.overlay.inode_path(ino), data).unwrap();
    }

    pub fn write_with_header(&self, ino: u64, kind: HeaderType, body: &[u8]) {
        let mut data = OverlayHeader::new(kind).serialize().to_vec();
        data.extend_from_slice(body);
        self.write_raw(ino, &data);
    }

    pub fn write_dir(&self, ino: u64, dir: &OverlayDir) {
        self.write_with_header(ino, HeaderType::Directory, &dir.serialize().unwrap());
    }

    pub fn write_raw_dir_body(&self, ino: u64, body: &[u8]) {
        self.write_with_header(ino, HeaderType::Directory, body);
    }

    pub fn write_file(&self, ino: u64, contents: &[u8]) {
        self.write_with_header(ino, HeaderType::File, contents);
    }
}

impl Drop for TestOverlay {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(self.overlay.path());
    }
}
