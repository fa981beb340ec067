use crate::artifacts::diff::tree_diff::FileChange;
use crate::artifacts::objects::commit::Author;
use crate::artifacts::objects::object_id::ObjectId;
use chrono::SecondsFormat;
use derive_new::new;

/// Separator line closing every commit block
pub const COMMIT_SEPARATOR: &str = "----";

/// What a report needs to know about a commit besides its changes
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct CommitMeta {
    pub oid: ObjectId,
    pub author: Author,
    /// First parent, `None` for a root commit
    pub parent: Option<ObjectId>,
}

/// One rendered unit of a report
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct CommitReport {
    pub meta: CommitMeta,
    pub changes: Vec<FileChange>,
}

impl CommitReport {
    pub fn render(&self) -> String {
        format_commit(&self.meta, &self.changes)
    }
}

/// Render one commit block
///
/// ```text
/// Commit <hash>
/// Date   <UTC RFC 3339>
/// Author <name> <<email>>
///
/// <change lines>
///
/// ----
/// ```
pub fn format_commit(meta: &CommitMeta, changes: &[FileChange]) -> String {
    let when = meta
        .author
        .utc_timestamp()
        .to_rfc3339_opts(SecondsFormat::Secs, true);
    let lines = changes
        .iter()
        .map(FileChange::report_line)
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Commit {}\nDate   {when}\nAuthor {}\n\n{lines}\n\n{COMMIT_SEPARATOR}\n",
        meta.oid,
        meta.author.display_name()
    )
}

/// Concatenate commit blocks in the order given
pub fn assemble_report<'r>(reports: impl IntoIterator<Item = &'r CommitReport>) -> String {
    reports.into_iter().map(CommitReport::render).collect()
}
