use std::{
    collections::BTreeMap,
    ffi::{OsStr, OsString},
    os::unix::ffi::{OsStrExt, OsStringExt},
};

use thiserror::Error;
use thrift::protocol::{
    TCompactInputProtocol, TCompactOutputProtocol, TFieldIdentifier, TInputProtocol,
    TMapIdentifier, TOutputProtocol, TStructIdentifier, TType,
};

const DIR_ENTRIES_FIELD: i16 = 1;
const ENTRY_MODE_FIELD: i16 = 1;
const ENTRY_INODE_FIELD: i16 = 2;
const ENTRY_HASH_FIELD: i16 = 3;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("{0}")]
    Protocol(#[from] thrift::Error),

    #[error("unexpected entry map types: key {key:?}, value {value:?}")]
    MapTypes {
        key: Option<TType>,
        value: Option<TType>,
    },
}

pub type DecodeResult<T> = Result<T, DecodeError>;

/// One record of a directory body, exactly as stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlayEntry {
    pub mode: Option<i32>,
    pub inode_number: Option<i64>,
    /// Source control object id. Present only for entries that are not
    /// materialized.
    pub hash: Option<Vec<u8>>,
}

impl OverlayEntry {
    pub fn mode_bits(&self) -> u32 {
        self.mode.map_or(0, |m| m as u32)
    }

    /// Absent, negative and zero inode numbers all mean "never allocated".
    pub fn inode(&self) -> u64 {
        self.inode_number
            .and_then(|n| u64::try_from(n).ok())
            .unwrap_or(0)
    }

    pub fn is_dir(&self) -> bool {
        self.mode
            .map_or(false, |m| (m as u32) & libc::S_IFMT == libc::S_IFDIR)
    }

    pub fn is_materialized(&self) -> bool {
        self.hash.is_none()
    }

    fn read<P: TInputProtocol>(i: &mut P) -> DecodeResult<Self> {
        let mut entry = OverlayEntry::default();
        i.read_struct_begin()?;
        loop {
            let field = i.read_field_begin()?;
            match (field.id, field.field_type) {
                (_, TType::Stop) => break,
                (Some(ENTRY_MODE_FIELD), TType::I32) => entry.mode = Some(i.read_i32()?),
                (Some(ENTRY_INODE_FIELD), TType::I64) => {
                    entry.inode_number = Some(i.read_i64()?)
                }
                (Some(ENTRY_HASH_FIELD), TType::String) => entry.hash = Some(i.read_bytes()?),
                (_, ty) => i.skip(ty)?,
            }
            i.read_field_end()?;
        }
        i.read_struct_end()?;
        Ok(entry)
    }

    fn write<P: TOutputProtocol>(&self, o: &mut P) -> thrift::Result<()> {
        o.write_struct_begin(&TStructIdentifier::new("OverlayEntry"))?;
        if let Some(mode) = self.mode {
            o.write_field_begin(&TFieldIdentifier::new("mode", TType::I32, ENTRY_MODE_FIELD))?;
            o.write_i32(mode)?;
            o.write_field_end()?;
        }
        if let Some(ino) = self.inode_number {
            o.write_field_begin(&TFieldIdentifier::new(
                "inodeNumber",
                TType::I64,
                ENTRY_INODE_FIELD,
            ))?;
            o.write_i64(ino)?;
            o.write_field_end()?;
        }
        if let Some(hash) = &self.hash {
            o.write_field_begin(&TFieldIdentifier::new("hash", TType::String, ENTRY_HASH_FIELD))?;
            o.write_bytes(hash)?;
            o.write_field_end()?;
        }
        o.write_field_stop()?;
        o.write_struct_end()
    }
}

/// The decoded body of a directory inode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlayDir {
    pub entries: BTreeMap<OsString, OverlayEntry>,
}

impl OverlayDir {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &OsStr) -> Option<&OverlayEntry> {
        self.entries.get(name)
    }

    /// Decodes a Thrift Compact `OverlayDir` struct. Fields this reader does
    /// not know, or known ids carrying another wire type, are skipped.
    pub fn parse(data: &[u8]) -> DecodeResult<Self> {
        let mut i = TCompactInputProtocol::new(data);
        let mut entries = BTreeMap::new();
        i.read_struct_begin()?;
        loop {
            let field = i.read_field_begin()?;
            match (field.id, field.field_type) {
                (_, TType::Stop) => break,
                (Some(DIR_ENTRIES_FIELD), TType::Map) => entries = read_entries(&mut i)?,
                (_, ty) => i.skip(ty)?,
            }
            i.read_field_end()?;
        }
        i.read_struct_end()?;
        Ok(Self { entries })
    }

    pub fn serialize(&self) -> thrift::Result<Vec<u8>> {
        let mut buf = Vec::new();
        {
            let mut o = TCompactOutputProtocol::new(&mut buf);
            o.write_struct_begin(&TStructIdentifier::new("OverlayDir"))?;
            o.write_field_begin(&TFieldIdentifier::new(
                "entries",
                TType::Map,
                DIR_ENTRIES_FIELD,
            ))?;
            o.write_map_begin(&TMapIdentifier::new(
                TType::String,
                TType::Struct,
                self.entries.len() as i32,
            ))?;
            for (name, entry) in &self.entries {
                o.write_bytes(name.as_bytes())?;
                entry.write(&mut o)?;
            }
            o.write_map_end()?;
            o.write_field_end()?;
            o.write_field_stop()?;
            o.write_struct_end()?;
            o.flush()?;
        }
        Ok(buf)
    }
}

fn read_entries<P: TInputProtocol>(i: &mut P) -> DecodeResult<BTreeMap<OsString, OverlayEntry>> {
    let map = i.read_map_begin()?;
    let mut entries = BTreeMap::new();
    if map.size > 0
        && (map.key_type != Some(TType::String) || map.value_type != Some(TType::Struct))
    {
        return Err(DecodeError::MapTypes {
            key: map.key_type,
            value: map.value_type,
        });
    }
    for _ in 0..map.size {
        let name = OsString::from_vec(i.read_bytes()?);
        let entry = OverlayEntry::read(i)?;
        entries.insert(name, entry);
    }
    i.read_map_end()?;
    Ok(entries)
}
