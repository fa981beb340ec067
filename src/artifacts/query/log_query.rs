use crate::artifacts::objects::commit::Author;
use crate::artifacts::query::codec;
use crate::errors::ReportResult;
use chrono::{DateTime, SubsecRound, Utc};
use regex::Regex;

/// Which references the history walk starts from
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RefSelector {
    /// Whatever `HEAD` points to
    #[default]
    Head,
    /// Every reference in the repository
    All,
    /// A single branch, tag, remote branch or commit id
    Named(String),
}

/// Author regular expression, compiled once
///
/// Two patterns are equal when their source text is.
#[derive(Debug, Clone)]
pub struct AuthorPattern(Regex);

impl AuthorPattern {
    pub fn try_new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self(Regex::new(pattern)?))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_match(&self, haystack: &str) -> bool {
        self.0.is_match(haystack)
    }
}

impl PartialEq for AuthorPattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for AuthorPattern {}

/// Raw filter inputs, before validation
#[derive(Debug, Clone, Default)]
pub struct LogQueryParts {
    pub all: bool,
    pub reference: Option<String>,
    pub author_pattern: Option<String>,
    pub from_time: Option<DateTime<Utc>>,
    pub to_time: Option<DateTime<Utc>>,
}

/// Filter selecting which commits a report covers
///
/// Built only through [`LogQuery::try_from_parts`] or by decoding, and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LogQuery {
    selector: RefSelector,
    author_pattern: Option<AuthorPattern>,
    from_time: Option<DateTime<Utc>>,
    to_time: Option<DateTime<Utc>>,
}

impl LogQuery {
    /// Validate raw inputs into a query
    ///
    /// `all` takes precedence over `reference`; empty strings count as absent;
    /// times are truncated to whole seconds. Fails only when the author
    /// pattern does not compile, callers decide which error kind that is.
    pub fn try_from_parts(parts: LogQueryParts) -> Result<Self, regex::Error> {
        let selector = match parts.reference.filter(|name| !name.is_empty()) {
            _ if parts.all => RefSelector::All,
            Some(name) => RefSelector::Named(name),
            None => RefSelector::Head,
        };

        let author_pattern = parts
            .author_pattern
            .filter(|pattern| !pattern.is_empty())
            .map(|pattern| AuthorPattern::try_new(&pattern))
            .transpose()?;

        Ok(LogQuery {
            selector,
            author_pattern,
            from_time: parts.from_time.map(|time| time.trunc_subsecs(0)),
            to_time: parts.to_time.map(|time| time.trunc_subsecs(0)),
        })
    }

    pub fn selector(&self) -> &RefSelector {
        &self.selector
    }

    pub fn author_pattern(&self) -> Option<&AuthorPattern> {
        self.author_pattern.as_ref()
    }

    pub fn from_time(&self) -> Option<DateTime<Utc>> {
        self.from_time
    }

    pub fn to_time(&self) -> Option<DateTime<Utc>> {
        self.to_time
    }

    /// The query exactly as it reads back from its own encoding
    pub fn normalized(&self) -> ReportResult<Self> {
        codec::decode(&codec::encode(self))
    }

    /// Whether a commit by `author` falls inside this query
    ///
    /// Both time bounds are inclusive; the pattern is matched against the
    /// author's email.
    pub fn matches(&self, author: &Author) -> bool {
        let when = author.utc_timestamp();

        if self.from_time.is_some_and(|from| when < from) {
            return false;
        }
        if self.to_time.is_some_and(|to| when > to) {
            return false;
        }

        self.author_pattern
            .as_ref()
            .is_none_or(|pattern| pattern.is_match(author.email()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn author(email: &str, secs: i64) -> Author {
        Author::new("Someone".to_string(), email.to_string(), at(secs).fixed_offset())
    }

    #[test]
    fn all_refs_wins_over_named_ref() {
        let query = LogQuery::try_from_parts(LogQueryParts {
            all: true,
            reference: Some("main".to_string()),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(query.selector(), &RefSelector::All);
    }

    #[rstest]
    #[case(None, RefSelector::Head)]
    #[case(Some(""), RefSelector::Head)]
    #[case(Some("release/1.0"), RefSelector::Named("release/1.0".to_string()))]
    fn reference_selects_named_or_head(
        #[case] reference: Option<&str>,
        #[case] expected: RefSelector,
    ) {
        let query = LogQuery::try_from_parts(LogQueryParts {
            reference: reference.map(str::to_string),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(query.selector(), &expected);
    }

    #[test]
    fn empty_author_pattern_is_absent() {
        let query = LogQuery::try_from_parts(LogQueryParts {
            author_pattern: Some(String::new()),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(query.author_pattern(), None);
    }

    #[test]
    fn invalid_author_pattern_is_rejected() {
        let result = LogQuery::try_from_parts(LogQueryParts {
            author_pattern: Some("(unclosed".to_string()),
            ..Default::default()
        });

        assert!(result.is_err());
    }

    #[test]
    fn times_are_truncated_to_seconds() {
        let precise = Utc.timestamp_opt(100, 999_000_000).unwrap();
        let query = LogQuery::try_from_parts(LogQueryParts {
            from_time: Some(precise),
            to_time: Some(precise),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(query.from_time(), Some(at(100)));
        assert_eq!(query.to_time(), Some(at(100)));
    }

    #[rstest]
    #[case(99, false)]
    #[case(100, true)]
    #[case(150, true)]
    #[case(200, true)]
    #[case(201, false)]
    fn time_window_is_inclusive(#[case] secs: i64, #[case] expected: bool) {
        let query = LogQuery::try_from_parts(LogQueryParts {
            from_time: Some(at(100)),
            to_time: Some(at(200)),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(query.matches(&author("a@b.c", secs)), expected);
    }

    #[test]
    fn inverted_window_matches_nothing() {
        let query = LogQuery::try_from_parts(LogQueryParts {
            from_time: Some(at(200)),
            to_time: Some(at(100)),
            ..Default::default()
        })
        .unwrap();

        assert!(!query.matches(&author("a@b.c", 150)));
    }

    #[test]
    fn author_pattern_matches_email() {
        let query = LogQuery::try_from_parts(LogQueryParts {
            author_pattern: Some("@example\\.com$".to_string()),
            ..Default::default()
        })
        .unwrap();

        assert!(query.matches(&author("jane@example.com", 0)));
        assert!(!query.matches(&author("jane@example.org", 0)));
    }
}
