use crate::areas::database::Database;
use crate::areas::refs::{HEAD_REF_NAME, Refs};
use crate::artifacts::diff::snapshot::CommitSnapshot;
use crate::artifacts::log::rev_list::RevList;
use crate::artifacts::log::{HistoryProvider, SnapshotProvider};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::query::log_query::{LogQuery, RefSelector};
use crate::artifacts::report::commit_report::CommitMeta;
use crate::errors::ReportError;
use anyhow::Context;
use std::path::Path;

const GIT_DIR_NAME: &str = ".git";

/// Name used when the repository path has no final component
pub const DEFAULT_REPOSITORY_NAME: &str = "repository";

/// A git repository opened for reading
#[derive(Debug)]
pub struct Repository {
    name: String,
    database: Database,
    refs: Refs,
}

impl Repository {
    /// Open a working copy (with a `.git` directory) or a bare repository
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let path = path
            .canonicalize()
            .with_context(|| format!("failed to open repository at {:?}", path))?;

        let git_dir = if path.join(GIT_DIR_NAME).is_dir() {
            path.join(GIT_DIR_NAME)
        } else if path.join("objects").is_dir() && path.join(HEAD_REF_NAME).is_file() {
            path.clone()
        } else {
            anyhow::bail!("{:?} is not a git repository", path);
        };

        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| DEFAULT_REPOSITORY_NAME.to_string());

        Ok(Repository {
            database: Database::open(git_dir.join("objects").into_boxed_path())?,
            refs: Refs::new(git_dir.into_boxed_path()),
            name,
        })
    }

    /// Final component of the canonical repository path
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Commits the history walk starts from
    pub fn start_points(&self, selector: &RefSelector) -> anyhow::Result<Vec<ObjectId>> {
        match selector {
            RefSelector::Head => {
                let oid = self.refs.read_head()?.ok_or_else(|| {
                    ReportError::ReferenceResolution(
                        "HEAD does not point to a commit".to_string(),
                    )
                })?;
                Ok(vec![self.peel_named(HEAD_REF_NAME, &oid)?])
            }
            RefSelector::Named(name) => {
                let oid = self.resolve_named(name)?;
                Ok(vec![self.peel_named(name, &oid)?])
            }
            RefSelector::All => {
                let mut start_points = Vec::new();
                for (name, oid) in self.refs.list_all_refs()? {
                    match self.database.peel_to_commit(&oid)? {
                        Some(commit_oid) => start_points.push(commit_oid),
                        None => tracing::debug!(reference = %name, "skipping non-commit reference"),
                    }
                }
                start_points.sort();
                start_points.dedup();

                Ok(start_points)
            }
        }
    }

    fn resolve_named(&self, name: &str) -> anyhow::Result<ObjectId> {
        if let Some(oid) = self.refs.resolve(name)? {
            return Ok(oid);
        }

        // a full commit id is accepted when no reference carries that name
        if ObjectId::looks_like_oid(name) {
            let oid = ObjectId::try_parse(name.to_string())?;
            if self.database.contains(&oid) {
                return Ok(oid);
            }
        }

        Err(ReportError::ReferenceResolution(name.to_string()).into())
    }

    fn peel_named(&self, name: &str, oid: &ObjectId) -> anyhow::Result<ObjectId> {
        self.database.peel_to_commit(oid)?.ok_or_else(|| {
            ReportError::ReferenceResolution(format!("{name} does not point to a commit")).into()
        })
    }
}

impl HistoryProvider for Repository {
    #[tracing::instrument(skip_all, fields(repository = %self.name))]
    fn history(
        &self,
        query: &LogQuery,
    ) -> anyhow::Result<impl Iterator<Item = anyhow::Result<CommitMeta>>> {
        let start_points = self.start_points(query.selector())?;
        tracing::debug!(count = start_points.len(), "resolved start points");

        RevList::new(&self.database, start_points, query.clone())
    }
}

impl SnapshotProvider for Repository {
    fn snapshot(&self, commit_oid: &ObjectId) -> anyhow::Result<CommitSnapshot> {
        let commit = self
            .database
            .parse_object_as_commit(commit_oid)?
            .with_context(|| format!("Object {commit_oid} is not a commit"))?;

        self.database.load_snapshot(commit.tree_oid())
    }
}
