use crate::artifacts::diff::snapshot::{CommitSnapshot, FileEntry};
use std::cmp::Ordering;
use std::iter::Peekable;

/// Rendering of a side with no entry, never compared against real entries
pub const NULL_ENTRY_LABEL: &str = "0000000:0000000000000000000000000000000000000000";

/// A file that differs between two snapshots
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChange {
    Create {
        path: String,
        new: FileEntry,
    },
    Delete {
        path: String,
        old: FileEntry,
    },
    Modify {
        path: String,
        old: FileEntry,
        new: FileEntry,
    },
}

impl FileChange {
    pub fn from_entries(
        path: &str,
        old: Option<&FileEntry>,
        new: Option<&FileEntry>,
    ) -> Option<Self> {
        let path = path.to_string();

        match (old, new) {
            (None, Some(new)) => Some(FileChange::Create {
                path,
                new: new.clone(),
            }),
            (Some(old), None) => Some(FileChange::Delete {
                path,
                old: old.clone(),
            }),
            (Some(old), Some(new)) if old != new => Some(FileChange::Modify {
                path,
                old: old.clone(),
                new: new.clone(),
            }),
            _ => None, // No change or both are None
        }
    }

    pub fn path(&self) -> &str {
        match self {
            FileChange::Create { path, .. }
            | FileChange::Delete { path, .. }
            | FileChange::Modify { path, .. } => path,
        }
    }

    pub fn old_entry(&self) -> Option<&FileEntry> {
        match self {
            FileChange::Delete { old, .. } | FileChange::Modify { old, .. } => Some(old),
            FileChange::Create { .. } => None,
        }
    }

    pub fn new_entry(&self) -> Option<&FileEntry> {
        match self {
            FileChange::Create { new, .. } | FileChange::Modify { new, .. } => Some(new),
            FileChange::Delete { .. } => None,
        }
    }

    /// `<path> change|delete|create <mode>:<hash> ...`
    pub fn report_line(&self) -> String {
        match self {
            FileChange::Modify { path, old, new } => format!(
                "{path} change {} {}",
                entry_label(Some(old)),
                entry_label(Some(new))
            ),
            FileChange::Delete { path, old } => {
                format!("{path} delete {}", entry_label(Some(old)))
            }
            FileChange::Create { path, new } => {
                format!("{path} create {}", entry_label(Some(new)))
            }
        }
    }
}

/// `<mode>:<hash>`, or the null label for a missing side
pub fn entry_label(entry: Option<&FileEntry>) -> String {
    match entry {
        Some(entry) => format!("{}:{}", entry.mode, entry.oid),
        None => NULL_ENTRY_LABEL.to_string(),
    }
}

/// Compare two snapshots, `old` being empty for a root commit
///
/// The result is sorted by path (byte order) and holds one change per path
/// that differs.
pub fn diff_snapshots(old: &CommitSnapshot, new: &CommitSnapshot) -> Vec<FileChange> {
    let mut changes = MergedPaths::new(old, new)
        .filter_map(|(path, old_entry, new_entry)| {
            FileChange::from_entries(path, old_entry, new_entry)
        })
        .collect::<Vec<_>>();

    changes.sort_by(|a, b| a.path().as_bytes().cmp(b.path().as_bytes()));
    changes
}

type SnapshotIter<'s> = Peekable<std::collections::btree_map::Iter<'s, String, FileEntry>>;

/// Walks the union of two snapshots' paths, once per path
struct MergedPaths<'s> {
    old: SnapshotIter<'s>,
    new: SnapshotIter<'s>,
}

impl<'s> MergedPaths<'s> {
    fn new(old: &'s CommitSnapshot, new: &'s CommitSnapshot) -> Self {
        MergedPaths {
            old: old.entries().iter().peekable(),
            new: new.entries().iter().peekable(),
        }
    }
}

impl<'s> Iterator for MergedPaths<'s> {
    type Item = (&'s str, Option<&'s FileEntry>, Option<&'s FileEntry>);

    fn next(&mut self) -> Option<Self::Item> {
        let order = match (self.old.peek(), self.new.peek()) {
            (None, None) => return None,
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (Some((old_path, _)), Some((new_path, _))) => old_path.cmp(new_path),
        };

        match order {
            Ordering::Less => {
                let (path, entry) = self.old.next()?;
                Some((path.as_str(), Some(entry), None))
            }
            Ordering::Greater => {
                let (path, entry) = self.new.next()?;
                Some((path.as_str(), None, Some(entry)))
            }
            Ordering::Equal => {
                let (path, old_entry) = self.old.next()?;
                let (_, new_entry) = self.new.next()?;
                Some((path.as_str(), Some(old_entry), Some(new_entry)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::objects::entry_mode::EntryMode;
    use crate::artifacts::objects::object_id::ObjectId;
    use pretty_assertions::assert_eq;
    use proptest::collection::btree_map;
    use proptest::prelude::*;

    fn oid(fill: char) -> ObjectId {
        ObjectId::try_parse(fill.to_string().repeat(40)).unwrap()
    }

    fn entry(mode: EntryMode, fill: char, size: u64) -> FileEntry {
        FileEntry::new(mode, oid(fill), size)
    }

    fn snapshot(entries: Vec<(&str, FileEntry)>) -> CommitSnapshot {
        CommitSnapshot::from_entries(
            entries
                .into_iter()
                .map(|(path, entry)| (path.to_string(), entry)),
        )
    }

    #[test]
    fn modified_and_created_files_are_reported_in_path_order() {
        let old = snapshot(vec![("a.txt", entry(EntryMode::Regular, '1', 10))]);
        let new = snapshot(vec![
            ("b.txt", entry(EntryMode::Regular, '3', 3)),
            ("a.txt", entry(EntryMode::Regular, '2', 12)),
        ]);

        let changes = diff_snapshots(&old, &new);

        assert_eq!(
            changes,
            vec![
                FileChange::Modify {
                    path: "a.txt".to_string(),
                    old: entry(EntryMode::Regular, '1', 10),
                    new: entry(EntryMode::Regular, '2', 12),
                },
                FileChange::Create {
                    path: "b.txt".to_string(),
                    new: entry(EntryMode::Regular, '3', 3),
                },
            ]
        );
    }

    #[test]
    fn root_commit_creates_every_file() {
        let new = snapshot(vec![
            ("src/main.rs", entry(EntryMode::Regular, 'a', 1)),
            ("README", entry(EntryMode::Regular, 'b', 2)),
            ("run.sh", entry(EntryMode::Executable, 'c', 3)),
        ]);

        let changes = diff_snapshots(&CommitSnapshot::default(), &new);

        assert_eq!(
            changes.iter().map(FileChange::path).collect::<Vec<_>>(),
            vec!["README", "run.sh", "src/main.rs"]
        );
        assert!(
            changes
                .iter()
                .all(|change| matches!(change, FileChange::Create { .. }))
        );
    }

    #[test]
    fn any_field_difference_is_a_modification() {
        let base = entry(EntryMode::Regular, 'a', 5);
        let cases = [
            entry(EntryMode::Executable, 'a', 5),
            entry(EntryMode::GroupWritable, 'a', 5),
            entry(EntryMode::Regular, 'b', 5),
            entry(EntryMode::Regular, 'a', 6),
        ];

        for changed in cases {
            let old = snapshot(vec![("f", base.clone())]);
            let new = snapshot(vec![("f", changed)]);

            assert_eq!(diff_snapshots(&old, &new).len(), 1);
        }
    }

    #[test]
    fn identical_snapshots_have_no_changes() {
        let files = vec![
            ("a", entry(EntryMode::Regular, 'a', 1)),
            ("b/c", entry(EntryMode::Symlink, 'b', 2)),
        ];

        assert!(diff_snapshots(&snapshot(files.clone()), &snapshot(files)).is_empty());
    }

    #[test]
    fn report_lines_follow_the_change_kind() {
        let h1 = entry(EntryMode::Regular, '1', 1);
        let h2 = entry(EntryMode::Executable, '2', 1);

        assert_eq!(
            FileChange::from_entries("c.txt", None, Some(&h1))
                .unwrap()
                .report_line(),
            format!("c.txt create 100644:{}", "1".repeat(40))
        );
        assert_eq!(
            FileChange::from_entries("c.txt", Some(&h1), None)
                .unwrap()
                .report_line(),
            format!("c.txt delete 100644:{}", "1".repeat(40))
        );
        assert_eq!(
            FileChange::from_entries("c.txt", Some(&h1), Some(&h2))
                .unwrap()
                .report_line(),
            format!(
                "c.txt change 100644:{} 100755:{}",
                "1".repeat(40),
                "2".repeat(40)
            )
        );
    }

    #[test]
    fn group_writable_mode_change_is_reported_with_its_raw_mode() {
        let old = entry(EntryMode::GroupWritable, '1', 1);
        let new = entry(EntryMode::Regular, '1', 1);

        assert_eq!(
            FileChange::from_entries("legacy.txt", Some(&old), Some(&new))
                .unwrap()
                .report_line(),
            format!(
                "legacy.txt change 100664:{} 100644:{}",
                "1".repeat(40),
                "1".repeat(40)
            )
        );
    }

    #[test]
    fn missing_side_renders_as_null_label() {
        assert_eq!(
            entry_label(None),
            "0000000:0000000000000000000000000000000000000000"
        );
    }

    fn arb_entry() -> impl Strategy<Value = FileEntry> {
        (
            prop_oneof![
                Just(EntryMode::Regular),
                Just(EntryMode::Executable),
                Just(EntryMode::Symlink)
            ],
            prop_oneof![Just('a'), Just('b'), Just('c')],
            0u64..4,
        )
            .prop_map(|(mode, fill, size)| entry(mode, fill, size))
    }

    fn arb_snapshot() -> impl Strategy<Value = CommitSnapshot> {
        btree_map("[a-c]{1,2}(/[a-c]{1,2})?", arb_entry(), 0..12)
            .prop_map(|entries| CommitSnapshot::from_entries(entries))
    }

    proptest! {
        #[test]
        fn changes_are_sorted_and_unique(old in arb_snapshot(), new in arb_snapshot()) {
            let changes = diff_snapshots(&old, &new);
            let paths = changes.iter().map(FileChange::path).collect::<Vec<_>>();

            prop_assert!(paths.windows(2).all(|pair| pair[0].as_bytes() < pair[1].as_bytes()));
        }

        #[test]
        fn unchanged_paths_never_appear(old in arb_snapshot(), new in arb_snapshot()) {
            for change in diff_snapshots(&old, &new) {
                let path = change.path();
                prop_assert_ne!(old.get(path), new.get(path));
            }
        }

        #[test]
        fn swapping_sides_inverts_every_change(old in arb_snapshot(), new in arb_snapshot()) {
            let forward = diff_snapshots(&old, &new);
            let backward = diff_snapshots(&new, &old);

            prop_assert_eq!(forward.len(), backward.len());
            for (f, b) in forward.iter().zip(backward.iter()) {
                prop_assert_eq!(f.path(), b.path());
                prop_assert_eq!(f.old_entry(), b.new_entry());
                prop_assert_eq!(f.new_entry(), b.old_entry());
            }
        }

        #[test]
        fn every_differing_path_is_reported(old in arb_snapshot(), new in arb_snapshot()) {
            let reported = diff_snapshots(&old, &new).len();
            let expected = old
                .entries()
                .keys()
                .chain(new.entries().keys())
                .collect::<std::collections::BTreeSet<_>>()
                .into_iter()
                .filter(|path| old.get(path) != new.get(path))
                .count();

            prop_assert_eq!(reported, expected);
        }
    }
}
