use crate::areas::repository::Repository;
use crate::artifacts::diff::snapshot::CommitSnapshot;
use crate::artifacts::diff::tree_diff::diff_snapshots;
use crate::artifacts::log::{HistoryProvider, SnapshotProvider};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::query::log_query::LogQuery;
use crate::artifacts::query::token::report_file_name;
use crate::artifacts::report::commit_report::{CommitReport, assemble_report};
use crate::errors::ReportError;
use anyhow::Context;
use std::path::{Path, PathBuf};

/// Diff every commit `history` selects against its first parent
///
/// Commits come back in history order. A root commit is compared with an
/// empty snapshot.
pub fn build_reports(
    history: &impl HistoryProvider,
    snapshots: &impl SnapshotProvider,
    query: &LogQuery,
) -> anyhow::Result<Vec<CommitReport>> {
    let mut reports = Vec::new();
    // the parent snapshot of one commit is usually the next commit's own
    let mut cached: Option<(ObjectId, CommitSnapshot)> = None;

    for meta in history.history(query)? {
        let meta = meta?;

        let new = match cached.take() {
            Some((oid, snapshot)) if oid == meta.oid => snapshot,
            _ => snapshots.snapshot(&meta.oid)?,
        };
        let old = match &meta.parent {
            Some(parent) => snapshots.snapshot(parent)?,
            None => CommitSnapshot::default(),
        };

        let changes = diff_snapshots(&old, &new);
        tracing::debug!(commit = %meta.oid.to_short_oid(), changes = changes.len(), "commit compared");

        if let Some(parent) = &meta.parent {
            cached = Some((parent.clone(), old));
        }
        reports.push(CommitReport::new(meta, changes));
    }

    Ok(reports)
}

impl Repository {
    pub fn generate_report(&self, query: &LogQuery) -> anyhow::Result<String> {
        let reports = build_reports(self, self, query)?;
        tracing::info!(repository = %self.name(), commits = reports.len(), "report generated");

        Ok(assemble_report(&reports))
    }

    /// Write the report to `<output_dir>/<name>-LQ<token>.txt`
    pub fn write_report(&self, query: &LogQuery, output_dir: &Path) -> anyhow::Result<PathBuf> {
        let report = self.generate_report(query)?;
        let report_path = output_dir.join(report_file_name(self.name(), query));

        std::fs::write(&report_path, report)
            .map_err(ReportError::Io)
            .with_context(|| format!("failed to write report to {:?}", report_path))?;
        tracing::info!(path = %report_path.display(), "report written");

        Ok(report_path)
    }
}
