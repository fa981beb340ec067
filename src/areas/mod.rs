//! Read-only access to an on-disk git repository
//!
//! - `database`: loose object store (inflate, verify, parse, flatten trees)
//! - `refs`: HEAD, branches, tags, remote branches and packed refs
//! - `repository`: opens a repository and serves history and snapshots

pub(crate) mod database;
pub(crate) mod pack;
pub(crate) mod refs;
pub mod repository;
