//! Search configuration.
//!
//! A [`SearchConfig`] is the typed, validated form of everything a search run
//! needs besides the root path: what kind of entries to report, how names are
//! matched, which property filters apply and how many workers to use.
//!
//! Raw user input goes through [`ConfigDraft`], whose `build` runs the field
//! group validators in [`validate`] and only produces a config when every
//! enabled group is valid.

pub mod draft;
pub mod validate;

pub use draft::{ConfigDraft, MethodChoice};
pub use validate::{FieldGroup, ValidationError, ValidationReason};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Which kinds of entries a search reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    #[default]
    FilesAndFolders,
    FilesOnly,
    FoldersOnly,
}

impl TargetType {
    pub fn includes_files(self) -> bool {
        !matches!(self, TargetType::FoldersOnly)
    }

    pub fn includes_folders(self) -> bool {
        !matches!(self, TargetType::FilesOnly)
    }

    pub fn accepts(self, is_dir: bool) -> bool {
        if is_dir {
            self.includes_folders()
        } else {
            self.includes_files()
        }
    }
}

/// Name matching method and its parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum MatchMethod {
    /// The pattern occurs verbatim in the name
    Default { pattern: String },
    Regex { pattern: String },
    FuzzyDamerauLevenshtein { pattern: String, max_distance: usize },
    FuzzyJaccard {
        pattern: String,
        min_similarity: f64,
        #[serde(default = "default_ngram")]
        ngram: usize,
    },
    Index { pattern: String },
}

fn default_ngram() -> usize {
    1
}

/// Discriminant of [`MatchMethod`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    ExactName,
    Regex,
    FuzzyDamerauLevenshtein,
    FuzzyJaccard,
    Index,
}

impl MatchMethod {
    pub fn pattern(&self) -> &str {
        match self {
            MatchMethod::Default { pattern }
            | MatchMethod::Regex { pattern }
            | MatchMethod::FuzzyDamerauLevenshtein { pattern, .. }
            | MatchMethod::FuzzyJaccard { pattern, .. }
            | MatchMethod::Index { pattern } => pattern,
        }
    }

    /// Replace the pattern, keeping the method and its thresholds.
    pub fn set_pattern(&mut self, new: impl Into<String>) {
        match self {
            MatchMethod::Default { pattern }
            | MatchMethod::Regex { pattern }
            | MatchMethod::FuzzyDamerauLevenshtein { pattern, .. }
            | MatchMethod::FuzzyJaccard { pattern, .. }
            | MatchMethod::Index { pattern } => *pattern = new.into(),
        }
    }

    pub fn kind(&self) -> MatchKind {
        match self {
            MatchMethod::Default { .. } => MatchKind::ExactName,
            MatchMethod::Regex { .. } => MatchKind::Regex,
            MatchMethod::FuzzyDamerauLevenshtein { .. } => MatchKind::FuzzyDamerauLevenshtein,
            MatchMethod::FuzzyJaccard { .. } => MatchKind::FuzzyJaccard,
            MatchMethod::Index { .. } => MatchKind::Index,
        }
    }
}

/// Search inside file content in addition to names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ContentSearch {
    pub enabled: bool,
    /// Falls back to the matching pattern when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

/// Inclusive size bounds in bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeRange {
    pub min: u64,
    pub max: u64,
}

impl SizeRange {
    pub fn contains(&self, size: u64) -> bool {
        size >= self.min && size <= self.max
    }
}

/// Which timestamp a date range applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateField {
    Modified,
    Created,
}

/// Inclusive calendar-day bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, day: NaiveDate) -> bool {
        day >= self.start && day <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PropertyFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<SizeRange>,
    /// Creation and modification ranges apply independently; both must pass
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateRange>,
    /// Lowercase extensions without the leading dot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<BTreeSet<String>>,
    /// Case-insensitive substring of the owner name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

impl PropertyFilters {
    /// Whether any filter needs file metadata
    pub fn needs_metadata(&self) -> bool {
        self.size.is_some()
            || self.created.is_some()
            || self.modified.is_some()
            || self.owner.is_some()
    }

    pub fn date_range(&self, field: DateField) -> Option<DateRange> {
        match field {
            DateField::Created => self.created,
            DateField::Modified => self.modified,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum ThreadPool {
    /// One worker per available core
    #[default]
    Auto,
    Custom { threads: usize },
}

impl ThreadPool {
    /// Concrete worker count, never below one.
    pub fn resolve(self) -> usize {
        match self {
            ThreadPool::Auto => num_cpus(),
            ThreadPool::Custom { threads } => threads.max(1),
        }
    }
}

/// Get the number of CPUs available
fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Default thresholds for the fuzzy methods
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchDefaults {
    pub max_distance: usize,
    pub min_similarity: f64,
    pub ngram: usize,
}

impl Default for MatchDefaults {
    fn default() -> Self {
        Self {
            max_distance: 2,
            min_similarity: 0.5,
            ngram: 1,
        }
    }
}

/// The complete configuration of a search run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub target: TargetType,
    pub matching: MatchMethod,
    #[serde(default)]
    pub content_search: ContentSearch,
    #[serde(default)]
    pub filters: PropertyFilters,
    #[serde(default)]
    pub thread_pool: ThreadPool,
    #[serde(default = "default_true")]
    pub caching: bool,
    #[serde(default = "default_true")]
    pub realtime: bool,
    #[serde(default)]
    pub logging: bool,
}

fn default_true() -> bool {
    true
}

impl SearchConfig {
    /// A config with the given matching method and defaults elsewhere.
    pub fn new(matching: MatchMethod) -> Self {
        Self {
            target: TargetType::default(),
            matching,
            content_search: ContentSearch::default(),
            filters: PropertyFilters::default(),
            thread_pool: ThreadPool::default(),
            caching: true,
            realtime: true,
            logging: false,
        }
    }

    /// Pattern used against file content, if content search applies.
    pub fn content_pattern(&self) -> Option<&str> {
        if !self.content_search.enabled || !self.target.includes_files() {
            return None;
        }
        Some(
            self.content_search
                .pattern
                .as_deref()
                .unwrap_or_else(|| self.matching.pattern()),
        )
    }
}
