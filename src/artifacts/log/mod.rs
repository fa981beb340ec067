//! Commit history traversal
//!
//! - `rev_list`: walk from a set of start commits, newest committer time
//!   first, yielding the commits a [`LogQuery`] selects
//!
//! Report generation only sees a repository through the two traits below,
//! so it can run against an in-memory history in tests.

pub mod rev_list;

use crate::artifacts::diff::snapshot::CommitSnapshot;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::query::log_query::LogQuery;
use crate::artifacts::report::commit_report::CommitMeta;

/// Ordered source of commits matching a query
pub trait HistoryProvider {
    /// Matching commits, newest first
    ///
    /// Resolving the start references happens eagerly, so an unknown
    /// reference fails here rather than during iteration.
    fn history(
        &self,
        query: &LogQuery,
    ) -> anyhow::Result<impl Iterator<Item = anyhow::Result<CommitMeta>>>;
}

/// Source of the complete file tree of a commit
pub trait SnapshotProvider {
    fn snapshot(&self, commit_oid: &ObjectId) -> anyhow::Result<CommitSnapshot>;
}
