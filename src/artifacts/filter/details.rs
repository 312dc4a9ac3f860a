//! Details filters answered from commit metadata: user, date and text

use crate::artifacts::filter::{DetailsFilter, FilterKind};
use crate::artifacts::graph::commit_id::RepositoryRoot;
use crate::artifacts::vislog::metadata::CommitMetadata;
use anyhow::Context;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use regex::{Regex, RegexBuilder};
use std::collections::HashMap;

/// Keyword standing for the current user of a repository
pub const CURRENT_USER_KEYWORD: &str = "me";

#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    names: Vec<String>,
    current_users: HashMap<RepositoryRoot, String>,
}

impl UserFilter {
    pub fn new(names: Vec<String>) -> Self {
        UserFilter {
            names,
            current_users: HashMap::new(),
        }
    }

    /// Resolve the `me` keyword to `name` inside `root`
    pub fn with_current_user(mut self, root: RepositoryRoot, name: String) -> Self {
        self.current_users.insert(root, name);
        self
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Names that apply inside `root`, with `me` resolved or dropped
    pub fn user_names(&self, root: &RepositoryRoot) -> Vec<String> {
        self.names
            .iter()
            .filter_map(|name| {
                if name.eq_ignore_ascii_case(CURRENT_USER_KEYWORD) {
                    self.current_users.get(root).cloned()
                } else {
                    Some(name.clone())
                }
            })
            .collect()
    }
}

impl DetailsFilter for UserFilter {
    fn kind(&self) -> FilterKind {
        FilterKind::USER
    }

    fn matches(&self, metadata: &CommitMetadata) -> bool {
        let author = &metadata.author;
        let candidates = [
            author.name().to_lowercase(),
            author.email().to_lowercase(),
            author.display_name().to_lowercase(),
        ];

        self.user_names(&metadata.root)
            .iter()
            .map(|name| name.trim().to_lowercase())
            .any(|name| candidates.contains(&name))
    }
}

/// Inclusive bounds over the author timestamp
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateFilter {
    after: Option<DateTime<Utc>>,
    before: Option<DateTime<Utc>>,
}

impl DateFilter {
    pub fn new(after: Option<DateTime<Utc>>, before: Option<DateTime<Utc>>) -> Self {
        DateFilter { after, before }
    }

    pub fn after(&self) -> Option<DateTime<Utc>> {
        self.after
    }

    pub fn before(&self) -> Option<DateTime<Utc>> {
        self.before
    }

    /// Lower bound; a bare date means the start of that day
    pub fn parse_since(value: &str) -> anyhow::Result<DateTime<Utc>> {
        let start_of_day = NaiveTime::from_hms_opt(0, 0, 0).context("Invalid start of day")?;
        Self::parse_bound(value, start_of_day)
    }

    /// Upper bound; a bare date means the end of that day
    pub fn parse_until(value: &str) -> anyhow::Result<DateTime<Utc>> {
        let end_of_day = NaiveTime::from_hms_opt(23, 59, 59).context("Invalid end of day")?;
        Self::parse_bound(value, end_of_day)
    }

    // Accepts RFC 3339, YYYY-MM-DD or seconds since the epoch
    fn parse_bound(value: &str, time_of_day: NaiveTime) -> anyhow::Result<DateTime<Utc>> {
        let value = value.trim();

        if let Ok(datetime) = DateTime::parse_from_rfc3339(value) {
            return Ok(datetime.with_timezone(&Utc));
        }
        if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
            return Ok(date.and_time(time_of_day).and_utc());
        }
        if let Ok(seconds) = value.parse::<i64>() {
            return DateTime::from_timestamp(seconds, 0)
                .with_context(|| format!("Timestamp out of range: {value}"));
        }

        anyhow::bail!("Invalid date: {value} (expected YYYY-MM-DD, RFC 3339 or a unix timestamp)")
    }
}

impl DetailsFilter for DateFilter {
    fn kind(&self) -> FilterKind {
        FilterKind::DATE
    }

    fn matches(&self, metadata: &CommitMetadata) -> bool {
        let timestamp = metadata.author.timestamp().with_timezone(&Utc);

        self.after.is_none_or(|after| timestamp >= after)
            && self.before.is_none_or(|before| timestamp <= before)
    }
}

/// Text searched in the full commit message
#[derive(Debug, Clone)]
pub struct TextFilter {
    text: String,
    is_regex: bool,
    match_case: bool,
    pattern: Regex,
}

impl TextFilter {
    pub fn new(text: &str, is_regex: bool, match_case: bool) -> anyhow::Result<Self> {
        let source = if is_regex {
            text.to_string()
        } else {
            regex::escape(text)
        };
        let pattern = RegexBuilder::new(&source)
            .case_insensitive(!match_case)
            .build()
            .with_context(|| format!("Invalid text pattern: {text}"))?;

        Ok(TextFilter {
            text: text.to_string(),
            is_regex,
            match_case,
            pattern,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_regex(&self) -> bool {
        self.is_regex
    }

    pub fn match_case(&self) -> bool {
        self.match_case
    }

    pub fn matches_message(&self, message: &str) -> bool {
        self.pattern.is_match(message)
    }
}

impl DetailsFilter for TextFilter {
    fn kind(&self) -> FilterKind {
        FilterKind::TEXT
    }

    fn matches(&self, metadata: &CommitMetadata) -> bool {
        self.matches_message(&metadata.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::vislog::metadata::tests::metadata;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("ada", true)]
    #[case("ADA", true)]
    #[case("ada@example.com", true)]
    #[case("Ada <ada@example.com>", true)]
    #[case("Linus", false)]
    #[case("ad", false)]
    fn user_filter_matches_name_email_or_both(#[case] name: &str, #[case] expected: bool) {
        let filter = UserFilter::new(vec![name.to_string()]);

        assert_eq!(filter.matches(&metadata(0, "Ada", "message")), expected);
    }

    #[test]
    fn me_resolves_per_root() {
        let root = RepositoryRoot::new("/repo");
        let other = RepositoryRoot::new("/other");
        let filter = UserFilter::new(vec!["me".to_string()])
            .with_current_user(root.clone(), "Ada".to_string());

        assert_eq!(filter.user_names(&root), vec!["Ada".to_string()]);
        assert!(filter.user_names(&other).is_empty());
        assert!(filter.matches(&metadata(0, "Ada", "message")));
    }

    #[test]
    fn unresolved_me_matches_nothing() {
        let filter = UserFilter::new(vec!["me".to_string()]);

        assert!(!filter.matches(&metadata(0, "Ada", "message")));
    }

    #[rstest]
    #[case(Some(1_700_000_001), None, vec![false, true, true])]
    #[case(None, Some(1_700_000_001), vec![true, true, false])]
    #[case(Some(1_700_000_001), Some(1_700_000_001), vec![false, true, false])]
    fn date_filter_bounds_are_inclusive(
        #[case] after: Option<i64>,
        #[case] before: Option<i64>,
        #[case] expected: Vec<bool>,
    ) {
        let filter = DateFilter::new(
            after.and_then(|seconds| DateTime::from_timestamp(seconds, 0)),
            before.and_then(|seconds| DateTime::from_timestamp(seconds, 0)),
        );

        let matched = (0..3)
            .map(|index| filter.matches(&metadata(index, "Ada", "message")))
            .collect::<Vec<_>>();
        assert_eq!(matched, expected);
    }

    #[test]
    fn date_bounds_parse_common_forms() {
        assert_eq!(
            DateFilter::parse_since("2023-11-14").unwrap().to_rfc3339(),
            "2023-11-14T00:00:00+00:00"
        );
        assert_eq!(
            DateFilter::parse_until("2023-11-14").unwrap().to_rfc3339(),
            "2023-11-14T23:59:59+00:00"
        );
        assert_eq!(
            DateFilter::parse_since("2023-11-14T12:00:00+02:00").unwrap().timestamp(),
            1_699_956_000
        );
        assert_eq!(DateFilter::parse_since("1700000000").unwrap().timestamp(), 1_700_000_000);
        assert!(DateFilter::parse_since("yesterday-ish").is_err());
    }

    #[rstest]
    #[case("FIX", false, false, true)]
    #[case("FIX", false, true, false)]
    #[case("f.x", false, false, false)]
    #[case("f.x", true, false, true)]
    #[case("^body", true, false, false)]
    #[case("body", false, false, true)]
    fn text_filter_modes(
        #[case] text: &str,
        #[case] is_regex: bool,
        #[case] match_case: bool,
        #[case] expected: bool,
    ) {
        let filter = TextFilter::new(text, is_regex, match_case).unwrap();

        assert_eq!(filter.matches(&metadata(0, "Ada", "fix parser\n\nbody")), expected);
    }

    #[test]
    fn invalid_regex_is_rejected() {
        assert!(TextFilter::new("fix(", true, false).is_err());
        assert!(TextFilter::new("fix(", false, false).is_ok());
    }
}
