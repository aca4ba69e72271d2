use std::{fmt, path::PathBuf, time::SystemTime};

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::inode_table::{ChildInfo, InodeType};

#[derive(Serialize, PartialEq, Eq, PartialOrd, Ord, Debug, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum ErrorLevel {
    /// Does not affect our ability to show file contents correctly.
    Warning = 1,
    /// Prevents reading some file or directory contents.
    Error = 2,
}

impl ErrorLevel {
    pub fn label(self) -> &'static str {
        match self {
            ErrorLevel::Warning => "warning",
            ErrorLevel::Error => "error",
        }
    }
}

/// What an unreadable inode was probably supposed to be.
#[derive(Serialize, PartialEq, Eq, Debug, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum ExpectedType {
    File,
    Dir,
}

/// One problem found by the checker.
#[derive(Serialize, PartialEq, Debug, Clone)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    UnexpectedFile {
        path: PathBuf,
        mtime: Option<SystemTime>,
    },
    MissingMaterializedInode {
        parent: u64,
        path: String,
        child: ChildInfo,
    },
    InvalidMaterializedInode {
        inode_number: u64,
        path: String,
        expected_type: Option<ExpectedType>,
        mtime: Option<SystemTime>,
        error: String,
    },
    OrphanInode {
        inode_number: u64,
        inode_type: InodeType,
        mtime: Option<SystemTime>,
        children: Vec<ChildInfo>,
    },
    HardLinkedInode {
        inode_number: u64,
        parent_paths: Vec<String>,
    },
    /// Directories that only name each other, so none of them is reachable
    /// from the root. Reported once, at the lowest inode number on the loop.
    DetachedCycle {
        inode_number: u64,
        members: Vec<u64>,
    },
}

impl Diagnostic {
    pub fn level(&self) -> ErrorLevel {
        match self {
            Diagnostic::UnexpectedFile { .. }
            | Diagnostic::OrphanInode { .. }
            | Diagnostic::HardLinkedInode { .. }
            | Diagnostic::DetachedCycle { .. } => ErrorLevel::Warning,
            Diagnostic::MissingMaterializedInode { .. }
            | Diagnostic::InvalidMaterializedInode { .. } => ErrorLevel::Error,
        }
    }

    pub fn inode_number(&self) -> Option<u64> {
        match self {
            Diagnostic::UnexpectedFile { .. } => None,
            Diagnostic::MissingMaterializedInode { child, .. } => Some(child.inode_number),
            Diagnostic::InvalidMaterializedInode { inode_number, .. }
            | Diagnostic::OrphanInode { inode_number, .. }
            | Diagnostic::HardLinkedInode { inode_number, .. }
            | Diagnostic::DetachedCycle { inode_number, .. } => Some(*inode_number),
        }
    }

    /// Extra lines shown under the summary in verbose mode.
    pub fn detailed_description(&self) -> Option<String> {
        match self {
            Diagnostic::OrphanInode {
                inode_type: InodeType::Dir,
                children,
                ..
            } if !children.is_empty() => Some(
                children
                    .iter()
                    .map(ChildInfo::listing)
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
            Diagnostic::HardLinkedInode { parent_paths, .. } => Some(parent_paths.join("\n")),
            Diagnostic::DetachedCycle { members, .. } => Some(
                members
                    .iter()
                    .map(|ino| ino.to_string())
                    .collect::<Vec<_>>()
                    .join(" -> "),
            ),
            _ => None,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::UnexpectedFile { path, mtime } => write!(
                f,
                "unexpected file present in overlay: {}{}",
                path.display(),
                mtime_suffix(*mtime)
            ),
            Diagnostic::MissingMaterializedInode { path, child, .. } => write!(
                f,
                "missing overlay file for materialized inode {} with file mode {:#o}",
                path, child.mode
            ),
            Diagnostic::InvalidMaterializedInode {
                path,
                expected_type,
                mtime,
                error,
                ..
            } => {
                let type_str = match expected_type {
                    None => "inode",
                    Some(ExpectedType::Dir) => "directory inode",
                    Some(ExpectedType::File) => "file inode",
                };
                write!(
                    f,
                    "invalid overlay file for materialized {} {}{}: {}",
                    type_str,
                    path,
                    mtime_suffix(*mtime),
                    error
                )
            }
            Diagnostic::OrphanInode {
                inode_number,
                inode_type,
                mtime,
                ..
            } => write!(
                f,
                "found orphan {} inode {}{}",
                inode_type,
                inode_number,
                mtime_suffix(*mtime)
            ),
            Diagnostic::HardLinkedInode {
                inode_number,
                parent_paths,
            } => write!(
                f,
                "found hard linked inode {} with {} parent directory entries",
                inode_number,
                parent_paths.len()
            ),
            Diagnostic::DetachedCycle {
                inode_number,
                members,
            } => write!(
                f,
                "found directory cycle of {} inodes through inode {}, unreachable from the root",
                members.len(),
                inode_number
            ),
        }
    }
}

fn mtime_suffix(mtime: Option<SystemTime>) -> String {
    match mtime {
        Some(t) => format!(", with mtime {}", format_mtime(t)),
        None => String::new(),
    }
}

/// Formats a timestamp like ctime(3), in local time, without the newline.
pub fn format_mtime(t: SystemTime) -> String {
    DateTime::<Local>::from(t)
        .format("%a %b %e %H:%M:%S %Y")
        .to_string()
}
