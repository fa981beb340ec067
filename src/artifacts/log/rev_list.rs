use crate::areas::database::Database;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::query::log_query::LogQuery;
use crate::artifacts::report::commit_report::CommitMeta;
use anyhow::Context;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

/// A commit waiting in the walk queue
#[derive(Debug)]
struct PendingCommit {
    oid: ObjectId,
    commit: Commit,
}

impl PendingCommit {
    fn sort_key(&self) -> (i64, &ObjectId) {
        (self.commit.committer().timestamp().timestamp(), &self.oid)
    }
}

impl PartialEq for PendingCommit {
    fn eq(&self, other: &Self) -> bool {
        self.sort_key() == other.sort_key()
    }
}

impl Eq for PendingCommit {}

impl PartialOrd for PendingCommit {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PendingCommit {
    // max-heap: latest committer time pops first, ties by higher object id
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

/// Walk over every ancestor of the start commits
///
/// Each commit is visited once, in committer time order, newest first.
/// Commits outside the query are walked through but not yielded.
#[derive(Debug)]
pub struct RevList<'r> {
    database: &'r Database,
    query: LogQuery,
    queue: BinaryHeap<PendingCommit>,
    seen: HashSet<ObjectId>,
}

impl<'r> RevList<'r> {
    pub fn new(
        database: &'r Database,
        start_points: impl IntoIterator<Item = ObjectId>,
        query: LogQuery,
    ) -> anyhow::Result<Self> {
        let mut rev_list = RevList {
            database,
            query,
            queue: BinaryHeap::new(),
            seen: HashSet::new(),
        };

        for oid in start_points {
            rev_list.enqueue(oid)?;
        }

        Ok(rev_list)
    }

    fn enqueue(&mut self, oid: ObjectId) -> anyhow::Result<()> {
        if self.seen.contains(&oid) {
            return Ok(());
        }

        let commit = self
            .database
            .parse_object_as_commit(&oid)?
            .with_context(|| format!("Object {oid} is not a commit"))?;

        self.seen.insert(oid.clone());
        self.queue.push(PendingCommit { oid, commit });

        Ok(())
    }

    fn step(&mut self) -> anyhow::Result<Option<CommitMeta>> {
        while let Some(PendingCommit { oid, commit }) = self.queue.pop() {
            for parent in commit.parents() {
                self.enqueue(parent.clone())?;
            }

            if self.query.matches(commit.author()) {
                tracing::trace!(commit = %oid.to_short_oid(), "commit selected");
                return Ok(Some(CommitMeta::new(
                    oid,
                    commit.author().clone(),
                    commit.parent().cloned(),
                )));
            }
        }

        Ok(None)
    }
}

impl Iterator for RevList<'_> {
    type Item = anyhow::Result<CommitMeta>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.step() {
            Ok(meta) => meta.map(Ok),
            Err(error) => {
                // a broken history ends the walk
                self.queue.clear();
                Some(Err(error))
            }
        }
    }
}
