//! Log queries and their reversible encodings
//!
//! - `log_query`: the validated filter (ref selector, author, time window)
//! - `codec`: versioned text form (`Q1\n...`)
//! - `token`: filename-safe base64 form and report file naming

pub mod codec;
pub mod log_query;
pub mod token;
