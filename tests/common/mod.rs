#![allow(dead_code)]

pub mod command;
pub mod file;

/// Report file written into `dir`, there must be exactly one
pub fn single_report(dir: &std::path::Path) -> std::path::PathBuf {
    let reports = std::fs::read_dir(dir)
        .expect("Failed to list output directory")
        .map(|entry| entry.expect("Failed to read directory entry").path())
        .collect::<Vec<_>>();

    assert_eq!(reports.len(), 1, "expected one report in {:?}", dir);
    reports.into_iter().next().expect("checked above")
}
