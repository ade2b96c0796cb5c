//! Field group validators.
//!
//! Every function here is pure: it looks at raw input for one group of
//! settings and returns either the typed value or the first
//! [`ValidationError`] found. Nothing is written back to a config, so a
//! caller either applies a whole group or none of it.

use super::{
    DateField, DateRange, MatchMethod, PropertyFilters, SearchConfig, SizeRange, ThreadPool,
};
use chrono::{Local, NaiveDate};
use regex::Regex;
use std::collections::BTreeSet;
use std::fmt;

/// Upper bound for a size filter: 100 GB
pub const MAX_SIZE_BYTES: u64 = 100_000_000_000;

/// Date format accepted by the date range validator
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldGroup {
    Size,
    Date(DateField),
    FileTypes,
    Owner,
    ThreadPool,
    Matching,
    ContentSearch,
}

impl fmt::Display for FieldGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldGroup::Size => "size",
            FieldGroup::Date(DateField::Created) => "creation date",
            FieldGroup::Date(DateField::Modified) => "modification date",
            FieldGroup::FileTypes => "file types",
            FieldGroup::Owner => "owner",
            FieldGroup::ThreadPool => "thread pool",
            FieldGroup::Matching => "matching",
            FieldGroup::ContentSearch => "content search",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationReason {
    #[error("value is empty")]
    EmptyValue,
    #[error("a bound is missing")]
    MissingValue,
    #[error("not an integer")]
    NotInteger,
    #[error("value is negative or zero")]
    NegativeValue,
    #[error("start is after end")]
    RangeInverted,
    #[error("value exceeds the 100 GB limit")]
    TooLarge,
    #[error("expected a YYYY-MM-DD date")]
    InvalidFormat,
    #[error("date is in the future")]
    FutureDate,
    #[error("invalid pattern: {0}")]
    InvalidPattern(String),
    #[error("value out of range")]
    OutOfRange,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{group}: {reason}")]
pub struct ValidationError {
    pub group: FieldGroup,
    pub reason: ValidationReason,
}

impl ValidationError {
    pub fn new(group: FieldGroup, reason: ValidationReason) -> Self {
        Self { group, reason }
    }
}

pub type Result<T> = std::result::Result<T, ValidationError>;

fn fail<T>(group: FieldGroup, reason: ValidationReason) -> Result<T> {
    Err(ValidationError::new(group, reason))
}

/// Treat blank input as absent
fn present(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

/// Parse a whitespace or comma separated extension list (`"rs .toml, md"`).
pub fn validate_file_types(raw: &str) -> Result<BTreeSet<String>> {
    let extensions: BTreeSet<String> = raw
        .split(|c: char| c.is_whitespace() || c == ',')
        .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
        .filter(|ext| !ext.is_empty())
        .collect();

    if extensions.is_empty() {
        return fail(FieldGroup::FileTypes, ValidationReason::EmptyValue);
    }
    Ok(extensions)
}

pub fn validate_owner(raw: &str) -> Result<String> {
    let owner = raw.trim();
    if owner.is_empty() {
        return fail(FieldGroup::Owner, ValidationReason::EmptyValue);
    }
    Ok(owner.to_string())
}

/// Parse one size bound: an integer with an optional `B`/`KB`/`MB`/`GB`
/// suffix (binary multiples). Returns the signed byte count so negative
/// input can be reported as such.
fn parse_size_bound(raw: &str) -> Option<i128> {
    let lower = raw.trim().to_ascii_lowercase();
    let split = lower
        .find(|c: char| c.is_ascii_alphabetic())
        .unwrap_or(lower.len());
    let (number, unit) = lower.split_at(split);

    let multiplier: i128 = match unit.trim() {
        "" | "b" => 1,
        "kb" | "k" => 1024,
        "mb" | "m" => 1024 * 1024,
        "gb" | "g" => 1024 * 1024 * 1024,
        _ => return None,
    };
    let value: i128 = number.trim().parse().ok()?;
    value.checked_mul(multiplier)
}

/// Validate a size range given as raw text for each bound.
///
/// Checks, in order: both bounds present or both absent, integral values,
/// `min >= 0` and `max >= 1`, `min <= max`, `max <= 100 GB`.
/// Returns `None` when both bounds are absent.
pub fn validate_size_range(min: Option<&str>, max: Option<&str>) -> Result<Option<SizeRange>> {
    let group = FieldGroup::Size;
    let (min, max) = match (present(min), present(max)) {
        (None, None) => return Ok(None),
        (Some(min), Some(max)) => (min, max),
        _ => return fail(group, ValidationReason::MissingValue),
    };

    let (Some(min), Some(max)) = (parse_size_bound(min), parse_size_bound(max)) else {
        return fail(group, ValidationReason::NotInteger);
    };

    if min < 0 || max < 1 {
        return fail(group, ValidationReason::NegativeValue);
    }
    if min > max {
        return fail(group, ValidationReason::RangeInverted);
    }
    if max > MAX_SIZE_BYTES as i128 {
        return fail(group, ValidationReason::TooLarge);
    }

    Ok(Some(SizeRange {
        min: min as u64,
        max: max as u64,
    }))
}

/// Validate a date range against the local calendar date.
pub fn validate_date_range(
    start: Option<&str>,
    end: Option<&str>,
    field: DateField,
) -> Result<DateRange> {
    validate_date_range_on(start, end, field, Local::now().date_naive())
}

/// Validate a date range against an explicit `today`.
///
/// Checks, in order: both bounds present, `YYYY-MM-DD` format, start not
/// after end, neither bound after `today`.
pub fn validate_date_range_on(
    start: Option<&str>,
    end: Option<&str>,
    field: DateField,
    today: NaiveDate,
) -> Result<DateRange> {
    let group = FieldGroup::Date(field);
    let (Some(start), Some(end)) = (present(start), present(end)) else {
        return fail(group, ValidationReason::MissingValue);
    };

    let (Ok(start), Ok(end)) = (
        NaiveDate::parse_from_str(start, DATE_FORMAT),
        NaiveDate::parse_from_str(end, DATE_FORMAT),
    ) else {
        return fail(group, ValidationReason::InvalidFormat);
    };

    let range = DateRange { start, end };
    check_date_range(range, field, today)?;
    Ok(range)
}

fn check_date_range(range: DateRange, field: DateField, today: NaiveDate) -> Result<()> {
    let group = FieldGroup::Date(field);
    if range.start > range.end {
        return fail(group, ValidationReason::RangeInverted);
    }
    if range.start > today || range.end > today {
        return fail(group, ValidationReason::FutureDate);
    }
    Ok(())
}

/// Parse a custom worker count.
pub fn validate_thread_count(raw: &str) -> Result<ThreadPool> {
    let group = FieldGroup::ThreadPool;
    let Ok(threads) = raw.trim().parse::<i64>() else {
        return fail(group, ValidationReason::NotInteger);
    };
    if threads < 1 {
        return fail(group, ValidationReason::NegativeValue);
    }
    Ok(ThreadPool::Custom {
        threads: threads as usize,
    })
}

/// Check the matching method's pattern and thresholds.
pub fn validate_matching(method: &MatchMethod) -> Result<()> {
    let group = FieldGroup::Matching;
    if method.pattern().trim().is_empty() {
        return fail(group, ValidationReason::EmptyValue);
    }

    match method {
        MatchMethod::Regex { pattern } => {
            Regex::new(pattern)
                .map_err(|e| ValidationError::new(group, ValidationReason::InvalidPattern(e.to_string())))?;
        }
        MatchMethod::FuzzyJaccard {
            min_similarity,
            ngram,
            ..
        } => {
            if !(0.0..=1.0).contains(min_similarity) || *ngram == 0 {
                return fail(group, ValidationReason::OutOfRange);
            }
        }
        MatchMethod::Default { .. }
        | MatchMethod::FuzzyDamerauLevenshtein { .. }
        | MatchMethod::Index { .. } => {}
    }
    Ok(())
}

fn validate_filters(filters: &PropertyFilters, today: NaiveDate) -> Result<()> {
    if let Some(size) = filters.size {
        if size.max < 1 {
            return fail(FieldGroup::Size, ValidationReason::NegativeValue);
        }
        if size.min > size.max {
            return fail(FieldGroup::Size, ValidationReason::RangeInverted);
        }
        if size.max > MAX_SIZE_BYTES {
            return fail(FieldGroup::Size, ValidationReason::TooLarge);
        }
    }

    for field in [DateField::Created, DateField::Modified] {
        if let Some(range) = filters.date_range(field) {
            check_date_range(range, field, today)?;
        }
    }

    if let Some(extensions) = &filters.extensions {
        if extensions.is_empty() || extensions.iter().any(|e| e.trim().is_empty()) {
            return fail(FieldGroup::FileTypes, ValidationReason::EmptyValue);
        }
    }

    if let Some(owner) = &filters.owner {
        validate_owner(owner)?;
    }
    Ok(())
}

/// Re-check every group of an assembled config.
pub fn validate_config(config: &SearchConfig) -> Result<()> {
    validate_config_on(config, Local::now().date_naive())
}

pub fn validate_config_on(config: &SearchConfig, today: NaiveDate) -> Result<()> {
    validate_matching(&config.matching)?;

    if let Some(pattern) = &config.content_search.pattern {
        if pattern.trim().is_empty() {
            return fail(FieldGroup::ContentSearch, ValidationReason::EmptyValue);
        }
        if matches!(config.matching, MatchMethod::Regex { .. }) {
            Regex::new(pattern).map_err(|e| {
                ValidationError::new(
                    FieldGroup::ContentSearch,
                    ValidationReason::InvalidPattern(e.to_string()),
                )
            })?;
        }
    }

    validate_filters(&config.filters, today)?;

    if let ThreadPool::Custom { threads: 0 } = config.thread_pool {
        return fail(FieldGroup::ThreadPool, ValidationReason::NegativeValue);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    fn size_err(min: Option<&str>, max: Option<&str>) -> ValidationReason {
        validate_size_range(min, max).unwrap_err().reason
    }

    #[test]
    fn test_file_types() {
        let exts = validate_file_types(" .RS toml,md ").unwrap();
        assert_eq!(
            exts.into_iter().collect::<Vec<_>>(),
            vec!["md".to_string(), "rs".to_string(), "toml".to_string()]
        );

        let err = validate_file_types("  , . ").unwrap_err();
        assert_eq!(err.group, FieldGroup::FileTypes);
        assert_eq!(err.reason, ValidationReason::EmptyValue);
    }

    #[test]
    fn test_owner() {
        assert_eq!(validate_owner(" alice ").unwrap(), "alice");
        assert_eq!(
            validate_owner("   ").unwrap_err(),
            ValidationError::new(FieldGroup::Owner, ValidationReason::EmptyValue)
        );
    }

    #[test]
    fn test_size_range_ok() {
        assert_eq!(validate_size_range(None, Some("  ")).unwrap(), None);
        assert_eq!(
            validate_size_range(Some("0"), Some("2KB")).unwrap(),
            Some(SizeRange { min: 0, max: 2048 })
        );
        assert_eq!(
            validate_size_range(Some("1 mb"), Some("1GB")).unwrap(),
            Some(SizeRange {
                min: 1024 * 1024,
                max: 1024 * 1024 * 1024
            })
        );
        // Exactly at the ceiling
        assert!(validate_size_range(Some("0"), Some("100000000000")).is_ok());
    }

    #[test]
    fn test_size_range_errors() {
        assert_eq!(size_err(Some("5"), None), ValidationReason::MissingValue);
        assert_eq!(size_err(None, Some("5")), ValidationReason::MissingValue);
        assert_eq!(size_err(Some("1.5"), Some("5")), ValidationReason::NotInteger);
        assert_eq!(size_err(Some("1"), Some("five")), ValidationReason::NotInteger);
        assert_eq!(size_err(Some("1"), Some("5TB")), ValidationReason::NotInteger);
        assert_eq!(size_err(Some("-1"), Some("5")), ValidationReason::NegativeValue);
        assert_eq!(size_err(Some("0"), Some("0")), ValidationReason::NegativeValue);
        assert_eq!(size_err(Some("10"), Some("5")), ValidationReason::RangeInverted);
        assert_eq!(
            size_err(Some("0"), Some("100000000001")),
            ValidationReason::TooLarge
        );
        assert_eq!(size_err(Some("1"), Some("200GB")), ValidationReason::TooLarge);
    }

    #[test]
    fn test_size_inverted_for_many_pairs() {
        for (min, max) in [(2u64, 1u64), (100, 99), (5_000_000, 4_999_999), (90_000_000_000, 1)] {
            assert_eq!(
                size_err(Some(&min.to_string()), Some(&max.to_string())),
                ValidationReason::RangeInverted
            );
        }
    }

    #[test]
    fn test_date_range() {
        let today = day("2024-06-15");
        let range =
            validate_date_range_on(Some("2024-01-01"), Some("2024-06-15"), DateField::Created, today)
                .unwrap();
        assert_eq!(range.start, day("2024-01-01"));
        assert_eq!(range.end, today);

        let reason = |s: Option<&str>, e: Option<&str>| {
            validate_date_range_on(s, e, DateField::Modified, today)
                .unwrap_err()
                .reason
        };
        assert_eq!(reason(Some("2024-01-01"), None), ValidationReason::MissingValue);
        assert_eq!(reason(None, Some("")), ValidationReason::MissingValue);
        assert_eq!(
            reason(Some("2024/01/01"), Some("2024-02-01")),
            ValidationReason::InvalidFormat
        );
        assert_eq!(
            reason(Some("2024-02-30"), Some("2024-03-01")),
            ValidationReason::InvalidFormat
        );
        assert_eq!(
            reason(Some("2024-05-01"), Some("2024-04-01")),
            ValidationReason::RangeInverted
        );
        assert_eq!(
            reason(Some("2024-06-01"), Some("2024-06-16")),
            ValidationReason::FutureDate
        );
        // Inverted wins over future when both hold
        assert_eq!(
            reason(Some("2025-01-01"), Some("2024-01-01")),
            ValidationReason::RangeInverted
        );
    }

    #[test]
    fn test_date_range_future_against_real_clock() {
        let tomorrow = Local::now().date_naive().succ_opt().unwrap();
        let err = validate_date_range(
            Some("2000-01-01"),
            Some(&tomorrow.format(DATE_FORMAT).to_string()),
            DateField::Modified,
        )
        .unwrap_err();
        assert_eq!(err.reason, ValidationReason::FutureDate);
    }

    #[test]
    fn test_thread_count() {
        assert_eq!(
            validate_thread_count("8").unwrap(),
            ThreadPool::Custom { threads: 8 }
        );
        assert_eq!(
            validate_thread_count("x").unwrap_err().reason,
            ValidationReason::NotInteger
        );
        assert_eq!(
            validate_thread_count("0").unwrap_err().reason,
            ValidationReason::NegativeValue
        );
    }

    #[test]
    fn test_matching() {
        assert!(validate_matching(&MatchMethod::Default {
            pattern: "report".into()
        })
        .is_ok());
        assert_eq!(
            validate_matching(&MatchMethod::Index { pattern: " ".into() })
                .unwrap_err()
                .reason,
            ValidationReason::EmptyValue
        );
        assert!(matches!(
            validate_matching(&MatchMethod::Regex {
                pattern: "([a-z".into()
            })
            .unwrap_err()
            .reason,
            ValidationReason::InvalidPattern(_)
        ));
        assert_eq!(
            validate_matching(&MatchMethod::FuzzyJaccard {
                pattern: "abc".into(),
                min_similarity: 1.5,
                ngram: 1
            })
            .unwrap_err()
            .reason,
            ValidationReason::OutOfRange
        );
    }

    #[test]
    fn test_validate_config() {
        let today = day("2024-06-15");
        let mut config = SearchConfig::new(MatchMethod::Default {
            pattern: "notes".into(),
        });
        assert!(validate_config_on(&config, today).is_ok());

        config.filters.size = Some(SizeRange { min: 10, max: 5 });
        assert_eq!(
            validate_config_on(&config, today).unwrap_err(),
            ValidationError::new(FieldGroup::Size, ValidationReason::RangeInverted)
        );

        config.filters.size = None;
        config.thread_pool = ThreadPool::Custom { threads: 0 };
        assert_eq!(
            validate_config_on(&config, today).unwrap_err().group,
            FieldGroup::ThreadPool
        );

        config.thread_pool = ThreadPool::Auto;
        config.filters.owner = Some(String::new());
        assert_eq!(
            validate_config_on(&config, today).unwrap_err().group,
            FieldGroup::Owner
        );

        config.filters.owner = None;
        config.filters.created = Some(DateRange {
            start: day("2024-01-01"),
            end: day("2024-02-01"),
        });
        config.filters.modified = Some(DateRange {
            start: day("2024-06-01"),
            end: day("2024-07-01"),
        });
        assert_eq!(
            validate_config_on(&config, today).unwrap_err(),
            ValidationError::new(
                FieldGroup::Date(DateField::Modified),
                ValidationReason::FutureDate
            )
        );
    }

    #[test]
    fn test_error_display() {
        let err = ValidationError::new(FieldGroup::Size, ValidationReason::TooLarge);
        assert_eq!(err.to_string(), "size: value exceeds the 100 GB limit");
    }
}
