//! Git tree object
//!
//! Trees are directory snapshots: a sorted list of `(mode, name, oid)` entries
//! where the oid points to a blob (file) or another tree (subdirectory).
//!
//! ## Format
//!
//! Each entry: `<octal-mode> <name>\0<20-byte-sha1>`

use crate::artifacts::objects::object::{Object, Packable, Unpackable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use anyhow::Context;
use bytes::Bytes;
use derive_new::new;
use std::collections::BTreeMap;
use std::io::BufRead;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryMode {
    Regular,
    Executable,
    Symlink,
    Submodule,
    Directory,
}

impl EntryMode {
    pub fn as_str(&self) -> &str {
        match self {
            EntryMode::Regular => "100644",
            EntryMode::Executable => "100755",
            EntryMode::Symlink => "120000",
            EntryMode::Submodule => "160000",
            EntryMode::Directory => "40000",
        }
    }

    pub fn from_octal_str(mode: &str) -> anyhow::Result<Self> {
        match mode {
            "100644" | "100664" => Ok(EntryMode::Regular),
            "100755" => Ok(EntryMode::Executable),
            "120000" => Ok(EntryMode::Symlink),
            "160000" => Ok(EntryMode::Submodule),
            "40000" | "040000" => Ok(EntryMode::Directory),
            _ => Err(anyhow::anyhow!("Invalid entry mode: {mode}")),
        }
    }

    pub fn is_tree(&self) -> bool {
        matches!(self, EntryMode::Directory)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct TreeEntry {
    pub oid: ObjectId,
    pub mode: EntryMode,
}

impl TreeEntry {
    pub fn is_tree(&self) -> bool {
        self.mode.is_tree()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tree {
    entries: BTreeMap<String, TreeEntry>,
}

impl Tree {
    pub fn insert(&mut self, name: impl Into<String>, entry: TreeEntry) {
        self.entries.insert(name.into(), entry);
    }

    pub fn get(&self, name: &str) -> Option<&TreeEntry> {
        self.entries.get(name)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&String, &TreeEntry)> {
        self.entries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in git's canonical order: directories compare as `name/`
    fn canonical_entries(&self) -> Vec<(&String, &TreeEntry)> {
        let mut entries = self.entries.iter().collect::<Vec<_>>();
        entries.sort_by_cached_key(|(name, entry)| {
            let mut key = name.as_bytes().to_vec();
            if entry.is_tree() {
                key.push(b'/');
            }
            key
        });
        entries
    }
}

impl Packable for Tree {
    fn content(&self) -> anyhow::Result<Bytes> {
        let mut content = Vec::new();

        for (name, entry) in self.canonical_entries() {
            content.extend_from_slice(format!("{} {}", entry.mode.as_str(), name).as_bytes());
            content.push(0);
            entry.oid.write_h40_to(&mut content)?;
        }

        Ok(Bytes::from(content))
    }
}

impl Unpackable for Tree {
    fn deserialize(mut reader: impl BufRead) -> anyhow::Result<Self> {
        let mut tree = Tree::default();
        let mut mode_bytes = Vec::new();
        let mut name_bytes = Vec::new();

        loop {
            mode_bytes.clear();
            if reader.read_until(b' ', &mut mode_bytes)? == 0 {
                break;
            }
            if mode_bytes.pop() != Some(b' ') {
                anyhow::bail!("unexpected EOF in tree entry mode");
            }
            let mode = EntryMode::from_octal_str(std::str::from_utf8(&mode_bytes)?)?;

            name_bytes.clear();
            reader.read_until(b'\0', &mut name_bytes)?;
            if name_bytes.pop() != Some(b'\0') {
                anyhow::bail!("unexpected EOF in tree entry name");
            }
            let name = String::from_utf8(name_bytes.clone())?;

            let oid = ObjectId::read_h40_from(&mut reader)
                .context("unexpected EOF in tree entry object id")?;

            tree.insert(name, TreeEntry::new(oid, mode));
        }

        Ok(tree)
    }
}

impl Object for Tree {
    fn object_type(&self) -> ObjectType {
        ObjectType::Tree
    }
}
