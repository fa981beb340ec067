//! Git data structures and report algorithms
//!
//! - `diff`: file-level comparison of two commit snapshots
//! - `log`: history traversal and the provider traits reports are built on
//! - `objects`: git object types (commit, tree, tag) and their identifiers
//! - `query`: log queries and their text and token encodings
//! - `report`: rendering of commit blocks

pub mod diff;
pub mod log;
pub mod objects;
pub mod query;
pub mod report;
