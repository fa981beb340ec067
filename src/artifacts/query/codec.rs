//! Text form of a [`LogQuery`]
//!
//! ```text
//! Q1\nAL\nAU<pattern>\nFT0x<hex secs>\nTT0x<hex secs>
//! ```
//!
//! The first field is the version marker. Each following field is a two
//! character tag and its value. Absent values are not emitted at all, so
//! decoding treats a missing field as unset. The separator is not escaped:
//! a ref or pattern containing a newline cannot be represented.

use crate::artifacts::query::log_query::{LogQuery, LogQueryParts, RefSelector};
use crate::errors::{ReportError, ReportResult};
use chrono::{DateTime, Utc};

pub const QUERY_SEPARATOR: &str = "\n";
pub const TAG_LENGTH: usize = 2;

pub const ALL_TAG: &str = "AL";
pub const REF_TAG: &str = "ID";
pub const AUTHOR_TAG: &str = "AU";
pub const FROM_TIME_TAG: &str = "FT";
pub const TO_TIME_TAG: &str = "TT";

const TIME_PREFIX: &str = "0x";

/// Known query format versions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryVersion {
    V1,
}

impl QueryVersion {
    pub const CURRENT: QueryVersion = QueryVersion::V1;

    pub fn marker(&self) -> &'static str {
        match self {
            QueryVersion::V1 => "Q1",
        }
    }

    pub fn from_marker(marker: &str) -> Option<Self> {
        match marker {
            "Q1" => Some(QueryVersion::V1),
            _ => None,
        }
    }
}

pub fn encode(query: &LogQuery) -> String {
    let mut fields = vec![QueryVersion::CURRENT.marker().to_string()];

    match query.selector() {
        RefSelector::All => fields.push(ALL_TAG.to_string()),
        RefSelector::Named(name) => fields.push(format!("{REF_TAG}{name}")),
        RefSelector::Head => {}
    }

    if let Some(pattern) = query.author_pattern() {
        fields.push(format!("{AUTHOR_TAG}{}", pattern.as_str()));
    }
    if let Some(from_time) = query.from_time() {
        fields.push(format!("{FROM_TIME_TAG}{}", format_time(from_time)));
    }
    if let Some(to_time) = query.to_time() {
        fields.push(format!("{TO_TIME_TAG}{}", format_time(to_time)));
    }

    fields.join(QUERY_SEPARATOR)
}

pub fn decode(text: &str) -> ReportResult<LogQuery> {
    if text.is_empty() {
        return Err(ReportError::Format("empty query".to_string()));
    }

    let mut fields = text.split(QUERY_SEPARATOR);
    let marker = fields.next().unwrap_or_default();

    match QueryVersion::from_marker(marker) {
        Some(QueryVersion::V1) => decode_v1(fields),
        None => Err(ReportError::Format(format!(
            "unsupported query version {marker:?}"
        ))),
    }
}

fn decode_v1<'q>(fields: impl Iterator<Item = &'q str>) -> ReportResult<LogQuery> {
    let mut parts = LogQueryParts::default();

    for field in fields {
        let (tag, value) = field
            .split_at_checked(TAG_LENGTH)
            .ok_or_else(|| ReportError::Format(format!("invalid query field {field:?}")))?;

        match tag {
            ALL_TAG => parts.all = true,
            REF_TAG => parts.reference = Some(value.to_string()),
            AUTHOR_TAG => parts.author_pattern = Some(value.to_string()),
            FROM_TIME_TAG => parts.from_time = Some(parse_time(value)?),
            TO_TIME_TAG => parts.to_time = Some(parse_time(value)?),
            _ => {
                return Err(ReportError::Format(format!(
                    "unknown query field {field:?}"
                )));
            }
        }
    }

    LogQuery::try_from_parts(parts)
        .map_err(|err| ReportError::Format(format!("invalid author pattern. {err}")))
}

/// `0x` followed by the lowercase hex of the Unix second count
///
/// Pre-epoch instants carry their sign after the prefix (`0x-1f`).
pub fn format_time(time: DateTime<Utc>) -> String {
    let secs = time.timestamp();
    if secs < 0 {
        format!("{TIME_PREFIX}-{:x}", secs.unsigned_abs())
    } else {
        format!("{TIME_PREFIX}{secs:x}")
    }
}

pub fn parse_time(value: &str) -> ReportResult<DateTime<Utc>> {
    let invalid = || ReportError::Format(format!("invalid time value {value:?}"));

    let digits = value.strip_prefix(TIME_PREFIX).ok_or_else(invalid)?;
    let (negative, digits) = match digits.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, digits),
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }

    let secs = i64::from_str_radix(digits, 16).map_err(|_| invalid())?;
    let secs = if negative { -secs } else { secs };

    DateTime::from_timestamp(secs, 0).ok_or_else(invalid)
}
