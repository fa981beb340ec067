//! Filename-safe form of a [`LogQuery`]
//!
//! The codec text is base64 encoded with the URL-safe alphabet and no
//! padding, and embedded in report names as `<repository>-LQ<token>.txt`.

use crate::artifacts::query::codec;
use crate::artifacts::query::log_query::LogQuery;
use crate::errors::{ReportError, ReportResult};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

/// Matches a report file name and captures its token
pub const REPORT_FILE_NAME_REGEX: &str = r"^.*?-LQ([A-Za-z0-9_-]+)\.txt$";

static REPORT_FILE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(REPORT_FILE_NAME_REGEX).expect("Invalid report file name regex")
});

pub const REPORT_FILE_MARKER: &str = "-LQ";
pub const REPORT_FILE_EXTENSION: &str = "txt";

pub fn encode_token(query: &LogQuery) -> String {
    URL_SAFE_NO_PAD.encode(codec::encode(query))
}

pub fn decode_token(token: &str) -> ReportResult<LogQuery> {
    let raw = URL_SAFE_NO_PAD
        .decode(token)
        .map_err(|err| ReportError::Format(format!("invalid token {token:?}. {err}")))?;
    let text = String::from_utf8(raw)
        .map_err(|err| ReportError::Format(format!("invalid token {token:?}. {err}")))?;

    codec::decode(&text)
}

/// Pull the token out of a report path, or take the argument as a bare token
///
/// Directory components are dropped first, so both
/// `out/repo-LQUTE.txt` and `UTE` give `UTE`.
pub fn token_from_filename(argument: &str) -> String {
    let base_name = Path::new(argument)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| argument.to_string());

    match REPORT_FILE_NAME.captures(&base_name) {
        Some(captures) => captures[1].to_string(),
        None => base_name,
    }
}

/// `<repository>-LQ<token>.txt`
pub fn report_file_name(repository_name: &str, query: &LogQuery) -> String {
    format!(
        "{repository_name}{REPORT_FILE_MARKER}{}.{REPORT_FILE_EXTENSION}",
        encode_token(query)
    )
}
