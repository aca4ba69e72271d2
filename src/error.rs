use std::io;

use thiserror::Error;

use crate::overlay::{dir::DecodeError, header::HeaderType};

/// Everything that can go wrong while reading the overlay.
///
/// Callers branch on the variant rather than on the message: an absent inode
/// file (`NotMaterialized`) is frequently expected, while the remaining kinds
/// describe real anomalies.
#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("inode {0} is not materialized in the overlay")]
    NotMaterialized(u64),

    #[error("invalid overlay file: {0}")]
    InvalidFormat(String),

    #[error("unexpected type for inode {inode} in overlay: expected {expected} but found {found}")]
    TypeMismatch {
        inode: u64,
        expected: HeaderType,
        found: HeaderType,
    },

    #[error("{0} does not exist")]
    NotFound(String),

    #[error("error looking up {path}: {prefix} is not a directory")]
    NotADirectory { path: String, prefix: String },

    #[error("invalid overlay path {0:?}: must be a non-empty relative path")]
    InvalidPath(String),

    #[error("invalid directory data: {0}")]
    Decode(#[from] DecodeError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("error listing overlay: {0}")]
    Walk(#[from] walkdir::Error),
}

impl OverlayError {
    pub fn errno(&self) -> i32 {
        match self {
            OverlayError::NotMaterialized(_) | OverlayError::NotFound(_) => libc::ENOENT,
            OverlayError::NotADirectory { .. } => libc::ENOTDIR,
            OverlayError::InvalidPath(_) => libc::EINVAL,
            OverlayError::InvalidFormat(_)
            | OverlayError::TypeMismatch { .. }
            | OverlayError::Decode(_) => libc::EIO,
            OverlayError::Io(e) => e.raw_os_error().unwrap_or(libc::EIO),
            OverlayError::Walk(e) => e
                .io_error()
                .and_then(|e| e.raw_os_error())
                .unwrap_or(libc::EIO),
        }
    }
}

pub type OverlayResult<T> = Result<T, OverlayError>;

#[cfg(test)]
mod tests {
    use std::io;

    use thrift::protocol::TType;

    use super::OverlayError;
    use crate::overlay::{dir::DecodeError, header::HeaderType};

    #[test]
    fn errno_not_materialized() {
        assert_eq!(OverlayError::NotMaterialized(5).errno(), libc::ENOENT);
    }

    #[test]
    fn errno_not_a_directory() {
        let e = OverlayError::NotADirectory {
            path: "a/b".into(),
            prefix: "a".into(),
        };
        assert_eq!(e.errno(), libc::ENOTDIR);
        assert_eq!(e.to_string(), "error looking up a/b: a is not a directory");
    }

    #[test]
    fn errno_io_passthrough() {
        let e = OverlayError::from(io::Error::from_raw_os_error(libc::EACCES));
        assert_eq!(e.errno(), libc::EACCES);
    }

    #[test]
    fn type_mismatch_message() {
        let e = OverlayError::TypeMismatch {
            inode: 12,
            expected: HeaderType::Directory,
            found: HeaderType::File,
        };
        assert_eq!(
            e.to_string(),
            "unexpected type for inode 12 in overlay: expected OVDR but found OVFL"
        );
        assert_eq!(e.errno(), libc::EIO);
    }

    #[test]
    fn decode_errors_are_eio() {
        let e = OverlayError::from(DecodeError::MapTypes {
            key: Some(TType::I32),
            value: None,
        });
        assert_eq!(e.errno(), libc::EIO);
        assert!(e.to_string().starts_with("invalid directory data: "));
    }
}
