use std::io::Write;

use crate::{
    diagnostics::{Diagnostic, ExpectedType},
    error::OverlayResult,
    inode_table::{InodeInfo, InodeTable, InodeType},
    log_call, log_res,
    overlay::ROOT_INODE_NUMBER,
};

use super::FilesystemChecker;

/// Guess what an unreadable inode should have been: the mode in the entry
/// that names it, else whether the header at least said directory. Only a
/// hint for the message.
pub fn expected_type(inode: &InodeInfo) -> Option<ExpectedType> {
    match inode.parents.first() {
        Some(link) if link.entry.is_dir() => Some(ExpectedType::Dir),
        Some(_) => Some(ExpectedType::File),
        None if inode.kind == InodeType::DirError => Some(ExpectedType::Dir),
        None => None,
    }
}

impl<W: Write> FilesystemChecker<'_, W> {
    pub fn scan_inodes_for_errors(&mut self, inodes: &InodeTable) -> OverlayResult<()> {
        let callid = log_call!("CLASSIFY", "inodes={}", inodes.len());
        let before = self.errors.len();

        for inode in inodes.iter() {
            if inode.kind.is_error() {
                self.add_error(Diagnostic::InvalidMaterializedInode {
                    inode_number: inode.inode_number,
                    path: inodes.compute_path(inode.inode_number),
                    expected_type: expected_type(inode),
                    mtime: inode.mtime,
                    error: inode
                        .error
                        .as_ref()
                        .map_or_else(|| String::from("unknown error"), |e| e.to_string()),
                })?;
            }

            let num_parents = inode.parents.len();
            if num_parents == 0 && inode.inode_number != ROOT_INODE_NUMBER {
                self.add_error(Diagnostic::OrphanInode {
                    inode_number: inode.inode_number,
                    inode_type: inode.kind,
                    mtime: inode.mtime,
                    children: inode.children.clone(),
                })?;
            } else if num_parents > 1 {
                let parent_paths = inode
                    .parents
                    .iter()
                    .map(|link| inodes.child_path(link.parent, &link.entry))
                    .collect();
                self.add_error(Diagnostic::HardLinkedInode {
                    inode_number: inode.inode_number,
                    parent_paths,
                })?;
            }

            if num_parents > 0 {
                if let Some(members) = inodes.parent_cycle(inode.inode_number) {
                    if members.iter().min() == Some(&inode.inode_number) {
                        self.add_error(Diagnostic::DetachedCycle {
                            inode_number: inode.inode_number,
                            members,
                        })?;
                    }
                }
            }
        }

        log_res!(callid, "{} problems", self.errors.len() - before);
        Ok(())
    }
}
