//! Text reports
//!
//! `commit_report` renders one commit and its file changes into a fixed
//! block and concatenates blocks into the final report.

pub mod commit_report;
