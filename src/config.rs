//! Run configuration
//!
//! `main` maps command-line flags onto [`ReportOptions`] untouched; every
//! check (flag conflicts, date syntax, author pattern) happens in
//! [`ReportConfig::try_new`], so the rules can be tested without a process.

use crate::artifacts::query::log_query::{LogQuery, LogQueryParts};
use crate::artifacts::query::token::{decode_token, token_from_filename};
use crate::errors::{ReportError, ReportResult};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SubsecRound, TimeDelta, Utc};
use std::path::PathBuf;

/// Output directory used when none is given
pub const DEFAULT_OUTPUT_DIR: &str = ".";

/// Zoned date formats accepted besides RFC 3339 and RFC 2822
const ZONED_DATE_FORMATS: [&str; 1] = ["%Y-%m-%d %H:%M:%S %z"];

/// Date-time formats read as UTC
const NAIVE_DATE_TIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

const NAIVE_DATE_FORMAT: &str = "%Y-%m-%d";

/// Raw inputs as given on the command line
#[derive(Debug, Clone, Default)]
pub struct ReportOptions {
    /// A token, or the name of an earlier report
    pub query: Option<String>,
    pub all: bool,
    /// A duration such as `36h` or `2weeks`
    pub since: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub author: Option<String>,
    pub reference: Option<String>,
    pub output: Option<PathBuf>,
    pub repositories: Vec<PathBuf>,
}

impl ReportOptions {
    fn has_filter_flags(&self) -> bool {
        self.all
            || self.since.is_some()
            || self.from.is_some()
            || self.to.is_some()
            || self.author.is_some()
            || self.reference.is_some()
    }
}

/// Validated configuration of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportConfig {
    query: LogQuery,
    repositories: Vec<PathBuf>,
    output_dir: PathBuf,
}

impl ReportConfig {
    /// Validate `options`, reading relative times against `now`
    pub fn try_new(options: ReportOptions, now: DateTime<Utc>) -> ReportResult<Self> {
        if options.repositories.is_empty() {
            return Err(ReportError::Usage(
                "at least one repository path is required".to_string(),
            ));
        }

        let query = match &options.query {
            Some(argument) => {
                if options.has_filter_flags() {
                    tracing::warn!("filter flags are ignored when a query is given");
                }
                decode_token(&token_from_filename(argument))?
            }
            None => Self::query_from_flags(&options, now.trunc_subsecs(0))?,
        };

        Ok(ReportConfig {
            query,
            output_dir: options
                .output
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            repositories: options.repositories,
        })
    }

    fn query_from_flags(options: &ReportOptions, now: DateTime<Utc>) -> ReportResult<LogQuery> {
        let from_time = match (&options.since, &options.from) {
            (Some(_), Some(_)) => {
                return Err(ReportError::Usage(
                    "--since and --from cannot be used together".to_string(),
                ));
            }
            (Some(since), None) => Some(since_to_time(since, now)?),
            (None, Some(from)) => Some(parse_date(from)?),
            (None, None) => None,
        };

        let to_time = match &options.to {
            Some(to) => parse_date(to)?,
            None => now,
        };

        let query = LogQuery::try_from_parts(LogQueryParts {
            all: options.all,
            reference: options.reference.clone(),
            author_pattern: options.author.clone(),
            from_time,
            to_time: Some(to_time),
        })
        .map_err(|err| ReportError::Usage(format!("invalid author pattern. {err}")))?;

        query.normalized()
    }

    pub fn query(&self) -> &LogQuery {
        &self.query
    }

    pub fn repositories(&self) -> &[PathBuf] {
        &self.repositories
    }

    pub fn output_dir(&self) -> &PathBuf {
        &self.output_dir
    }
}

/// `now` minus a human readable duration
fn since_to_time(since: &str, now: DateTime<Utc>) -> ReportResult<DateTime<Utc>> {
    let duration = humantime::parse_duration(since)
        .map_err(|err| ReportError::Usage(format!("invalid duration {since:?}. {err}")))?;

    TimeDelta::from_std(duration)
        .ok()
        .and_then(|delta| now.checked_sub_signed(delta))
        .ok_or_else(|| ReportError::Usage(format!("duration {since:?} is out of range")))
}

/// Parse a point in time given on the command line
///
/// Accepts RFC 3339, RFC 2822, `YYYY-MM-DD HH:MM:SS ±ZZZZ`, the same
/// without a zone or with a `T` separator, a bare `YYYY-MM-DD`, or Unix
/// seconds. Forms without a zone are UTC.
pub fn parse_date(value: &str) -> ReportResult<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(seconds) = value.parse::<i64>() {
        return DateTime::from_timestamp(seconds, 0)
            .ok_or_else(|| ReportError::Usage(format!("timestamp {value} is out of range")));
    }

    let zoned = DateTime::parse_from_rfc3339(value)
        .or_else(|_| DateTime::parse_from_rfc2822(value))
        .ok()
        .or_else(|| {
            ZONED_DATE_FORMATS
                .iter()
                .find_map(|format| DateTime::parse_from_str(value, format).ok())
        });
    if let Some(time) = zoned {
        return Ok(time.with_timezone(&Utc).trunc_subsecs(0));
    }

    let naive = NAIVE_DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, NAIVE_DATE_FORMAT)
                .ok()
                .map(|date| date.and_time(NaiveTime::MIN))
        });

    naive
        .map(|time| time.and_utc())
        .ok_or_else(|| ReportError::Usage(format!("unrecognized date {value:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::query::log_query::RefSelector;
    use crate::artifacts::query::token::report_file_name;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    #[fixture]
    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    #[fixture]
    fn options() -> ReportOptions {
        ReportOptions {
            repositories: vec![PathBuf::from("repo")],
            ..Default::default()
        }
    }

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[rstest]
    #[case("2024-01-02T03:04:05Z", utc(2024, 1, 2, 3, 4, 5))]
    #[case("2024-01-02T03:04:05.987+02:00", utc(2024, 1, 2, 1, 4, 5))]
    #[case("Tue, 2 Jan 2024 03:04:05 +0000", utc(2024, 1, 2, 3, 4, 5))]
    #[case("2024-01-02 03:04:05 -0100", utc(2024, 1, 2, 4, 4, 5))]
    #[case("2024-01-02 03:04:05", utc(2024, 1, 2, 3, 4, 5))]
    #[case("2024-01-02T03:04:05", utc(2024, 1, 2, 3, 4, 5))]
    #[case("2024-01-02", utc(2024, 1, 2, 0, 0, 0))]
    #[case("1704067200", utc(2024, 1, 1, 0, 0, 0))]
    fn supported_date_forms_are_parsed(#[case] value: &str, #[case] expected: DateTime<Utc>) {
        assert_eq!(parse_date(value).unwrap(), expected);
    }

    #[rstest]
    #[case("yesterday")]
    #[case("2024-13-01")]
    #[case("")]
    fn unsupported_dates_are_usage_errors(#[case] value: &str) {
        assert!(matches!(parse_date(value), Err(ReportError::Usage(_))));
    }

    #[rstest]
    fn to_defaults_to_now(options: ReportOptions, now: DateTime<Utc>) {
        let config = ReportConfig::try_new(options, now).unwrap();

        assert_eq!(config.query().to_time(), Some(now));
        assert_eq!(config.query().from_time(), None);
        assert_eq!(config.query().selector(), &RefSelector::Head);
        assert_eq!(config.output_dir(), &PathBuf::from("."));
    }

    #[rstest]
    fn now_is_truncated_to_seconds(options: ReportOptions, now: DateTime<Utc>) {
        let precise = now + TimeDelta::milliseconds(750);

        let config = ReportConfig::try_new(options, precise).unwrap();

        assert_eq!(config.query().to_time(), Some(now));
    }

    #[rstest]
    fn since_counts_back_from_now(mut options: ReportOptions, now: DateTime<Utc>) {
        options.since = Some("36h".to_string());

        let config = ReportConfig::try_new(options, now).unwrap();

        assert_eq!(config.query().from_time(), Some(utc(2024, 6, 14, 0, 0, 0)));
    }

    #[rstest]
    fn since_and_from_conflict(mut options: ReportOptions, now: DateTime<Utc>) {
        options.since = Some("1d".to_string());
        options.from = Some("2024-01-01".to_string());

        let error = ReportConfig::try_new(options, now).unwrap_err();

        assert!(matches!(error, ReportError::Usage(_)));
        assert_eq!(error.exit_code(), 2);
    }

    #[rstest]
    fn malformed_since_is_a_usage_error(mut options: ReportOptions, now: DateTime<Utc>) {
        options.since = Some("soon".to_string());

        assert!(matches!(
            ReportConfig::try_new(options, now),
            Err(ReportError::Usage(_))
        ));
    }

    #[rstest]
    fn repositories_are_required(now: DateTime<Utc>) {
        assert!(matches!(
            ReportConfig::try_new(ReportOptions::default(), now),
            Err(ReportError::Usage(_))
        ));
    }

    #[rstest]
    fn broken_author_pattern_is_a_usage_error(mut options: ReportOptions, now: DateTime<Utc>) {
        options.author = Some("(".to_string());

        assert!(matches!(
            ReportConfig::try_new(options, now),
            Err(ReportError::Usage(_))
        ));
    }

    #[rstest]
    fn all_wins_over_a_named_ref(mut options: ReportOptions, now: DateTime<Utc>) {
        options.all = true;
        options.reference = Some("main".to_string());

        let config = ReportConfig::try_new(options, now).unwrap();

        assert_eq!(config.query().selector(), &RefSelector::All);
    }

    #[rstest]
    fn query_from_an_earlier_report_ignores_flags(mut options: ReportOptions, now: DateTime<Utc>) {
        let earlier = LogQuery::try_from_parts(LogQueryParts {
            reference: Some("release".to_string()),
            author_pattern: Some("@example\\.com$".to_string()),
            from_time: Some(utc(2024, 1, 1, 0, 0, 0)),
            ..Default::default()
        })
        .unwrap();
        options.query = Some(format!("out/{}", report_file_name("repo", &earlier)));
        options.all = true;

        let config = ReportConfig::try_new(options, now).unwrap();

        assert_eq!(config.query(), &earlier);
        assert_eq!(config.query().to_time(), None);
    }

    #[rstest]
    fn unreadable_query_is_a_format_error(mut options: ReportOptions, now: DateTime<Utc>) {
        options.query = Some("!!not a token!!".to_string());

        let error = ReportConfig::try_new(options, now).unwrap_err();

        assert!(matches!(error, ReportError::Format(_)));
        assert_eq!(error.exit_code(), 1);
    }
}
