//! Change reports for git repositories
//!
//! A [`LogQuery`](artifacts::query::log_query::LogQuery) selects commits by
//! reference, author email and author time. Every selected commit is compared
//! with its first parent and listed with the files it created, deleted or
//! changed. The query travels inside the report's file name, so a report can
//! be regenerated from its name alone.

pub mod areas;
pub mod artifacts;
pub mod commands;
pub mod config;
pub mod errors;
pub mod logging;
