use std::io::Write;

use crate::{
    diagnostics::Diagnostic,
    error::OverlayResult,
    inode_table::{ChildInfo, InodeTable, ParentLink},
    log_call, log_res,
};

use super::FilesystemChecker;

impl<W: Write> FilesystemChecker<'_, W> {
    /// Records, on every loaded child, which directory entries name it, then
    /// reports materialized children whose overlay files are missing.
    pub fn link_inode_children(&mut self, inodes: &mut InodeTable) -> OverlayResult<()> {
        let callid = log_call!("LINK", "inodes={}", inodes.len());
        let mut links = Vec::new();
        let mut missing: Vec<(u64, ChildInfo)> = Vec::new();

        for inode in inodes.iter() {
            for child in &inode.children {
                // Older writers left the inode number at 0 for children that
                // were never loaded. Such a child cannot be in the overlay.
                if child.inode_number == 0 {
                    continue;
                }
                if inodes.contains(child.inode_number) {
                    links.push((
                        child.inode_number,
                        ParentLink {
                            parent: inode.inode_number,
                            entry: child.clone(),
                        },
                    ));
                } else if child.hash.is_none() {
                    // No source control hash means the child is materialized,
                    // so its data must be in the overlay.
                    missing.push((inode.inode_number, child.clone()));
                }
            }
        }

        let linked = links.len();
        for (child, link) in links {
            inodes.add_parent(child, link);
        }

        for (parent, child) in missing {
            let path = inodes.child_path(parent, &child);
            self.add_error(Diagnostic::MissingMaterializedInode {
                parent,
                path,
                child,
            })?;
        }

        log_res!(callid, "{} edges", linked);
        Ok(())
    }
}
