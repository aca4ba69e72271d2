use crate::{
    error::OverlayError,
    logwrapper::LogWrapper,
    overlay::{dir::OverlayDir, header::OverlayHeader},
};

/// Multi-line dumps of overlay records, for the `show` command.
pub trait PPOverlay {
    fn ppoverlay(&self) -> String;
}

impl PPOverlay for OverlayHeader {
    fn ppoverlay(&self) -> String {
        format!(
            "
HEADER[
    type={}
    version={}
    atime={}.{:09}
    ctime={}.{:09}
    mtime={}.{:09}
]",
            self.kind,
            self.version,
            self.atime_sec,
            self.atime_nsec,
            self.ctime_sec,
            self.ctime_nsec,
            self.mtime_sec,
            self.mtime_nsec,
        )
    }
}

impl PPOverlay for OverlayDir {
    fn ppoverlay(&self) -> String {
        let mut out = String::from("\nENTRIES[");
        for (name, entry) in &self.entries {
            out.push_str(&format!(
                "\n    {:<30} {} {} {}",
                name.lw(),
                entry.mode_bits().lw(),
                entry.inode(),
                entry.hash.lw()
            ));
        }
        out.push_str("\n]");
        out
    }
}

impl<S: PPOverlay, T: PPOverlay> PPOverlay for (S, T) {
    fn ppoverlay(&self) -> String {
        format!("{}{}", self.0.ppoverlay(), self.1.ppoverlay())
    }
}

impl<S: PPOverlay> PPOverlay for Result<S, OverlayError> {
    fn ppoverlay(&self) -> String {
        match self {
            Ok(v) => format!("Ok({})", v.ppoverlay()),
            Err(e) => format!("Err({})", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;

    use maplit::btreemap;

    use super::PPOverlay;
    use crate::{
        error::OverlayError,
        overlay::{
            dir::{OverlayDir, OverlayEntry},
            header::{HeaderType, OverlayHeader},
        },
    };

    #[test]
    fn header_dump() {
        let mut h = OverlayHeader::new(HeaderType::Directory);
        h.mtime_sec = 10;
        h.mtime_nsec = 5;
        let s = h.ppoverlay();
        assert!(s.contains("type=OVDR"));
        assert!(s.contains("mtime=10.000000005"));
    }

    #[test]
    fn dir_dump() {
        let dir = OverlayDir {
            entries: btreemap! {
                OsString::from("a") => OverlayEntry {
                    mode: Some(0o100644),
                    inode_number: Some(3),
                    hash: None,
                },
            },
        };
        let s = dir.ppoverlay();
        assert!(s.contains("\n    a "));
        assert!(s.contains("0o100644 3 -"));
    }

    #[test]
    fn error_dump() {
        let r: Result<OverlayHeader, OverlayError> = Err(OverlayError::NotMaterialized(9));
        assert_eq!(
            r.ppoverlay(),
            "Err(inode 9 is not materialized in the overlay)"
        );
    }
}
