//! Snapshot comparison
//!
//! - `snapshot`: flattened file trees of a single commit
//! - `tree_diff`: the sorted create/delete/modify list between two snapshots
//!
//! Only file identity (mode, blob id, size) is compared; no line-level diff
//! and no rename detection.

pub mod snapshot;
pub mod tree_diff;
