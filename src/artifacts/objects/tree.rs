//! Git tree object
//!
//! Trees represent directory snapshots in Git. They contain entries for files (blobs)
//! and subdirectories (other trees), along with their names and modes.
//!
//! ## Format
//!
//! On disk: `tree <size>\0<entries>`
//! Each entry: `<mode> <name>\0<20-byte-sha1>`

use crate::artifacts::objects::entry_mode::EntryMode;
use crate::artifacts::objects::object::Unpackable;
use crate::artifacts::objects::object_id::ObjectId;
use anyhow::Context;
use derive_new::new;
use std::collections::BTreeMap;
use std::io::BufRead;

/// A single named entry of a tree object
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

/// Git tree object as read from the database
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tree {
    entries: BTreeMap<String, TreeEntry>,
}

impl Tree {
    pub fn entries(&self) -> impl Iterator<Item = (&String, &TreeEntry)> {
        self.entries.iter()
    }

    pub fn into_entries(self) -> impl Iterator<Item = (String, TreeEntry)> {
        self.entries.into_iter()
    }
}

impl Unpackable for Tree {
    fn deserialize(reader: impl BufRead) -> anyhow::Result<Self> {
        let mut entries = BTreeMap::new();
        let mut reader = reader;

        // Reuse scratch buffers to reduce allocs
        let mut mode_bytes = Vec::new();
        let mut name_bytes = Vec::new();

        loop {
            mode_bytes.clear();
            // Read "mode " (space-delimited)
            let n = reader.read_until(b' ', &mut mode_bytes)?;
            if n == 0 {
                break; // clean EOF: no more entries
            }
            // Must end with ' ' or it's malformed
            if mode_bytes.pop() != Some(b' ') {
                return Err(anyhow::anyhow!("unexpected EOF in mode"));
            }

            let mode = EntryMode::from_octal_str(std::str::from_utf8(&mode_bytes)?)?;

            // Read "name\0"
            name_bytes.clear();
            reader.read_until(b'\0', &mut name_bytes)?;
            if name_bytes.pop() != Some(b'\0') {
                return Err(anyhow::anyhow!("unexpected EOF in name"));
            }
            let name = String::from_utf8_lossy(&name_bytes).into_owned();

            let oid =
                ObjectId::read_h40_from(&mut reader).context("unexpected EOF in object id")?;

            entries.insert(name, TreeEntry::new(oid, mode));
        }

        Ok(Tree { entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn raw_entry(mode: &str, name: &str, byte: u8) -> Vec<u8> {
        let mut raw = format!("{mode} {name}\0").into_bytes();
        raw.extend([byte; 20]);
        raw
    }

    #[test]
    fn tree_entries_are_parsed_in_name_order() {
        let mut raw = raw_entry("100644", "b.txt", 0xbb);
        raw.extend(raw_entry("40000", "a", 0xaa));
        raw.extend(raw_entry("100755", "run.sh", 0x01));

        let tree = Tree::deserialize(Cursor::new(raw)).unwrap();
        let entries = tree.into_entries().collect::<Vec<_>>();

        assert_eq!(
            entries.iter().map(|(name, _)| name.as_str()).collect::<Vec<_>>(),
            vec!["a", "b.txt", "run.sh"]
        );
        assert!(entries[0].1.is_tree());
        assert_eq!(entries[1].1.oid.as_ref(), "bb".repeat(20));
        assert_eq!(entries[2].1.mode, EntryMode::Executable);
    }

    #[test]
    fn unrecognized_modes_do_not_fail_the_tree() {
        let mut raw = raw_entry("100664", "legacy.txt", 0x01);
        raw.extend(raw_entry("100600", "odd", 0x02));

        let tree = Tree::deserialize(Cursor::new(raw)).unwrap();
        let modes = tree
            .entries()
            .map(|(_, entry)| entry.mode)
            .collect::<Vec<_>>();

        assert_eq!(
            modes,
            vec![EntryMode::GroupWritable, EntryMode::Unknown(0o100600)]
        );
    }

    #[test]
    fn empty_tree_has_no_entries() {
        let tree = Tree::deserialize(Cursor::new(Vec::new())).unwrap();

        assert_eq!(tree.entries().count(), 0);
    }

    #[test]
    fn truncated_tree_is_rejected() {
        let mut raw = raw_entry("100644", "a.txt", 0x01);
        raw.truncate(raw.len() - 3);

        assert!(Tree::deserialize(Cursor::new(raw)).is_err());
    }
}
