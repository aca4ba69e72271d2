use std::{
    collections::{btree_map, BTreeMap, BTreeSet},
    ffi::OsString,
    fmt,
    time::SystemTime,
};

use serde::{Serialize, Serializer};

use crate::{
    error::OverlayError,
    logwrapper::LogWrapper,
    overlay::{dir::OverlayEntry, ROOT_INODE_NUMBER},
};

pub const UNLINKED_PATH: &str = "[unlinked]";
pub const CYCLIC_PATH: &str = "[cyclic path]";

#[derive(Serialize, PartialEq, Eq, Debug, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum InodeType {
    File,
    Dir,
    /// The file could not be opened or its header could not be read.
    Error,
    /// The header said directory but the body could not be decoded.
    DirError,
}

impl InodeType {
    pub fn is_error(self) -> bool {
        matches!(self, InodeType::Error | InodeType::DirError)
    }
}

impl fmt::Display for InodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InodeType::File => "file",
            InodeType::Dir => "directory",
            InodeType::Error => "unreadable",
            InodeType::DirError => "unreadable directory",
        })
    }
}

fn serialize_name<S: Serializer>(name: &OsString, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&name.lw())
}

fn serialize_hash<S: Serializer>(hash: &Option<Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
    match hash {
        Some(h) => s.serialize_some(&hex::encode(h)),
        None => s.serialize_none(),
    }
}

/// A directory's claim about one of its children.
#[derive(Serialize, PartialEq, Eq, Debug, Clone)]
pub struct ChildInfo {
    /// 0 means the child never had an inode number allocated.
    pub inode_number: u64,
    #[serde(serialize_with = "serialize_name")]
    pub name: OsString,
    pub mode: u32,
    #[serde(serialize_with = "serialize_hash")]
    pub hash: Option<Vec<u8>>,
}

impl ChildInfo {
    pub fn from_entry(name: OsString, entry: &OverlayEntry) -> Self {
        Self {
            inode_number: entry.inode(),
            name,
            mode: entry.mode_bits(),
            hash: entry.hash.clone(),
        }
    }

    pub fn is_dir(&self) -> bool {
        self.mode & libc::S_IFMT == libc::S_IFDIR
    }

    /// One line of a directory listing: name, mode, inode number, hash.
    pub fn listing(&self) -> String {
        format!(
            "{:<30} {} {} {}",
            self.name.lw(),
            self.mode.lw(),
            self.inode_number,
            self.hash.lw()
        )
    }
}

/// A back-reference from a child to one directory entry that names it.
#[derive(Serialize, PartialEq, Eq, Debug, Clone)]
pub struct ParentLink {
    pub parent: u64,
    pub entry: ChildInfo,
}

/// Everything found on disk about one overlay inode.
#[derive(Debug)]
pub struct InodeInfo {
    pub inode_number: u64,
    pub kind: InodeType,
    pub children: Vec<ChildInfo>,
    /// Modification time of the overlay file itself, not of the logical file.
    pub mtime: Option<SystemTime>,
    pub error: Option<OverlayError>,
    /// Filled in while linking; the first entry is the one used for paths.
    pub parents: Vec<ParentLink>,
}

impl InodeInfo {
    pub fn new(
        inode_number: u64,
        kind: InodeType,
        children: Vec<ChildInfo>,
        mtime: Option<SystemTime>,
        error: Option<OverlayError>,
    ) -> Self {
        Self {
            inode_number,
            kind,
            children,
            mtime,
            error,
            parents: Vec::new(),
        }
    }
}

/// All inodes found during one scan, keyed by inode number.
#[derive(Debug, Default)]
pub struct InodeTable(BTreeMap<u64, InodeInfo>);

impl InodeTable {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn insert(&mut self, info: InodeInfo) {
        self.0.insert(info.inode_number, info);
    }

    pub fn get(&self, ino: u64) -> Option<&InodeInfo> {
        self.0.get(&ino)
    }

    pub fn contains(&self, ino: u64) -> bool {
        self.0.contains_key(&ino)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_map::Values<'_, u64, InodeInfo> {
        self.0.values()
    }

    /// Records that `link.parent` lists `child` as one of its entries.
    /// Returns false if `child` is not in the table.
    pub fn add_parent(&mut self, child: u64, link: ParentLink) -> bool {
        match self.0.get_mut(&child) {
            Some(info) => {
                info.parents.push(link);
                true
            }
            None => false,
        }
    }

    /// A best-effort path for diagnostics, following the first parent of each
    /// inode up to the root.
    pub fn compute_path(&self, ino: u64) -> String {
        let mut segments = Vec::new();
        let mut visited = BTreeSet::new();
        let mut current = ino;
        loop {
            if !visited.insert(current) {
                return String::from(CYCLIC_PATH);
            }
            let link = self.get(current).and_then(|info| info.parents.first());
            match link {
                None => {
                    if current == ROOT_INODE_NUMBER && segments.is_empty() {
                        return String::from("/");
                    }
                    if current != ROOT_INODE_NUMBER {
                        segments.push(String::from(UNLINKED_PATH));
                    }
                    break;
                }
                Some(link) => {
                    segments.push(link.entry.name.lw());
                    if link.parent == ROOT_INODE_NUMBER {
                        break;
                    }
                    current = link.parent;
                }
            }
        }
        segments.reverse();
        segments.join("/")
    }

    /// The inodes on a first-parent cycle through `ino`, starting with `ino`
    /// itself. None when the chain reaches the root, ends at an inode with no
    /// parent, or loops without passing back through `ino`.
    pub fn parent_cycle(&self, ino: u64) -> Option<Vec<u64>> {
        let mut members = vec![ino];
        let mut visited = BTreeSet::new();
        visited.insert(ino);
        let mut current = ino;
        while current != ROOT_INODE_NUMBER {
            let parent = self.get(current)?.parents.first()?.parent;
            if parent == ino {
                return Some(members);
            }
            if parent == ROOT_INODE_NUMBER || !visited.insert(parent) {
                return None;
            }
            members.push(parent);
            current = parent;
        }
        None
    }

    /// Path of a child entry of `parent`, which may itself not be in the
    /// table.
    pub fn child_path(&self, parent: u64, child: &ChildInfo) -> String {
        let name = child.name.lw();
        if parent == ROOT_INODE_NUMBER {
            return name;
        }
        format!("{}/{}", self.compute_path(parent), name)
    }
}
