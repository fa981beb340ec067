use crate::artifacts::objects::entry_mode::EntryMode;
use crate::artifacts::objects::object_id::ObjectId;
use derive_new::new;
use std::collections::BTreeMap;

/// Identity of a file within one commit
///
/// Two entries are equal only when mode, content hash and size all match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, new)]
pub struct FileEntry {
    pub mode: EntryMode,
    pub oid: ObjectId,
    pub size: u64,
}

/// Every file of one commit's tree, keyed by `/`-separated path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitSnapshot {
    entries: BTreeMap<String, FileEntry>,
}

impl CommitSnapshot {
    pub fn from_entries(entries: impl IntoIterator<Item = (String, FileEntry)>) -> Self {
        CommitSnapshot {
            entries: entries.into_iter().collect(),
        }
    }

    pub fn insert(&mut self, path: String, entry: FileEntry) {
        self.entries.insert(path, entry);
    }

    pub fn get(&self, path: &str) -> Option<&FileEntry> {
        self.entries.get(path)
    }

    pub fn entries(&self) -> &BTreeMap<String, FileEntry> {
        &self.entries
    }
}
