//! Name and content matching strategies.
//!
//! A [`MatchStrategy`] is built once per run from the config's
//! [`MatchMethod`](crate::config::MatchMethod): regexes are compiled, fuzzy
//! patterns pre-split and index lookups resolved up front, so the per-entry
//! test in [`MatchStrategy::matches`] does no setup work.
//!
//! | Strategy | Tested against | Score |
//! |----------|----------------|-------|
//! | ExactName | name stem, content | `Exact` |
//! | Regex | name stem, content | `Exact` |
//! | FuzzyDamerauLevenshtein | name stem | `Distance` |
//! | FuzzyJaccard | name stem | `Similarity` |
//! | Index | path membership | `Exact` |
//!
//! The fuzzy and index strategies fall back to a literal substring test for
//! content, since edit distance against a whole file is meaningless.

pub mod fuzzy;
pub mod index;

pub use fuzzy::{damerau_levenshtein, jaccard_similarity};
pub use index::{IndexProvider, InvertedNameIndex, NameIndex};

use crate::config::{MatchKind, MatchMethod};
use regex::Regex;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, thiserror::Error)]
pub enum StrategyError {
    #[error("no index covers {0}")]
    IndexUnavailable(PathBuf),

    #[error("invalid pattern: {0}")]
    InvalidPattern(String),
}

/// Which part of an entry matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchedField {
    Name,
    Content,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Score {
    Exact,
    Distance(usize),
    Similarity(f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrategyHit {
    pub field: MatchedField,
    pub score: Score,
}

/// An entry offered to a strategy
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub name: &'a str,
    pub path: &'a Path,
    /// Decoded text of a file, when content search applies
    pub content: Option<&'a str>,
}

impl<'a> Candidate<'a> {
    pub fn new(name: &'a str, path: &'a Path) -> Self {
        Self {
            name,
            path,
            content: None,
        }
    }

    pub fn with_content(mut self, content: &'a str) -> Self {
        self.content = Some(content);
        self
    }
}

/// Name without its last extension (`"a.tar.gz"` → `"a.tar"`).
///
/// Dotfiles keep their name: the stem of `".bashrc"` is `".bashrc"`.
pub fn name_stem(name: &str) -> &str {
    match name.rfind('.') {
        Some(0) | None => name,
        Some(pos) => &name[..pos],
    }
}

/// A ready-to-run matching strategy
#[derive(Debug)]
pub enum MatchStrategy {
    ExactName {
        pattern: String,
        content_pattern: String,
    },
    Regex {
        name: Regex,
        content: Regex,
    },
    FuzzyDamerauLevenshtein {
        pattern: Vec<char>,
        max_distance: usize,
        content_pattern: String,
    },
    FuzzyJaccard {
        grams: FxHashSet<String>,
        ngram: usize,
        min_similarity: f64,
        content_pattern: String,
    },
    Index {
        hits: FxHashSet<PathBuf>,
        content_pattern: String,
    },
}

impl MatchStrategy {
    /// Build a strategy for any method except `Index`, which needs a provider.
    ///
    /// `content_pattern` is what file content is tested against; pass the
    /// name pattern when no separate one is configured.
    pub fn new(method: &MatchMethod, content_pattern: Option<&str>) -> Result<Self, StrategyError> {
        let content_pattern = content_pattern.unwrap_or(method.pattern()).to_string();
        match method {
            MatchMethod::Default { pattern } => Ok(MatchStrategy::ExactName {
                pattern: pattern.clone(),
                content_pattern,
            }),
            MatchMethod::Regex { pattern } => Ok(MatchStrategy::Regex {
                name: compile(pattern)?,
                content: compile(&content_pattern)?,
            }),
            MatchMethod::FuzzyDamerauLevenshtein {
                pattern,
                max_distance,
            } => Ok(MatchStrategy::FuzzyDamerauLevenshtein {
                pattern: pattern.chars().collect(),
                max_distance: *max_distance,
                content_pattern,
            }),
            MatchMethod::FuzzyJaccard {
                pattern,
                min_similarity,
                ngram,
            } => Ok(MatchStrategy::FuzzyJaccard {
                grams: fuzzy::char_ngrams(pattern, *ngram),
                ngram: *ngram,
                min_similarity: *min_similarity,
                content_pattern,
            }),
            MatchMethod::Index { .. } => Err(StrategyError::IndexUnavailable(PathBuf::new())),
        }
    }

    /// Build a strategy, resolving `Index` against `provider` for `scope`.
    pub fn with_index(
        method: &MatchMethod,
        content_pattern: Option<&str>,
        provider: &dyn IndexProvider,
        scope: &Path,
    ) -> Result<Self, StrategyError> {
        let MatchMethod::Index { pattern } = method else {
            return Self::new(method, content_pattern);
        };
        let index = provider
            .index_for(scope)
            .ok_or_else(|| StrategyError::IndexUnavailable(scope.to_path_buf()))?;
        Ok(MatchStrategy::Index {
            hits: index.lookup(pattern).into_iter().collect(),
            content_pattern: content_pattern.unwrap_or(pattern).to_string(),
        })
    }

    pub fn kind(&self) -> MatchKind {
        match self {
            MatchStrategy::ExactName { .. } => MatchKind::ExactName,
            MatchStrategy::Regex { .. } => MatchKind::Regex,
            MatchStrategy::FuzzyDamerauLevenshtein { .. } => MatchKind::FuzzyDamerauLevenshtein,
            MatchStrategy::FuzzyJaccard { .. } => MatchKind::FuzzyJaccard,
            MatchStrategy::Index { .. } => MatchKind::Index,
        }
    }

    /// Test one candidate: the name first, then content if supplied.
    pub fn matches(&self, candidate: &Candidate<'_>) -> Option<StrategyHit> {
        if let Some(score) = self.match_name(candidate) {
            return Some(StrategyHit {
                field: MatchedField::Name,
                score,
            });
        }
        let content = candidate.content?;
        self.match_content(content).then_some(StrategyHit {
            field: MatchedField::Content,
            score: Score::Exact,
        })
    }

    fn match_name(&self, candidate: &Candidate<'_>) -> Option<Score> {
        match self {
            MatchStrategy::ExactName { pattern, .. } => name_stem(candidate.name)
                .contains(pattern.as_str())
                .then_some(Score::Exact),
            MatchStrategy::Regex { name, .. } => {
                name.is_match(name_stem(candidate.name)).then_some(Score::Exact)
            }
            MatchStrategy::FuzzyDamerauLevenshtein {
                pattern,
                max_distance,
                ..
            } => {
                let stem: Vec<char> = name_stem(candidate.name).chars().collect();
                // Lengths alone bound the distance from below
                if stem.len().abs_diff(pattern.len()) > *max_distance {
                    return None;
                }
                let distance = fuzzy::damerau_levenshtein_chars(pattern, &stem);
                (distance <= *max_distance).then_some(Score::Distance(distance))
            }
            MatchStrategy::FuzzyJaccard {
                grams,
                ngram,
                min_similarity,
                ..
            } => {
                let stem = fuzzy::char_ngrams(name_stem(candidate.name), *ngram);
                let similarity = fuzzy::jaccard_sets(grams, &stem);
                (similarity >= *min_similarity).then_some(Score::Similarity(similarity))
            }
            MatchStrategy::Index { hits, .. } => hits.contains(candidate.path).then_some(Score::Exact),
        }
    }

    fn match_content(&self, content: &str) -> bool {
        match self {
            MatchStrategy::Regex { content: regex, .. } => regex.is_match(content),
            MatchStrategy::ExactName { content_pattern, .. }
            | MatchStrategy::FuzzyDamerauLevenshtein { content_pattern, .. }
            | MatchStrategy::FuzzyJaccard { content_pattern, .. }
            | MatchStrategy::Index { content_pattern, .. } => content.contains(content_pattern.as_str()),
        }
    }
}

fn compile(pattern: &str) -> Result<Regex, StrategyError> {
    Regex::new(pattern).map_err(|e| StrategyError::InvalidPattern(e.to_string()))
}

/// Fixed path → index assignments, mostly for tests and the CLI
#[derive(Default)]
pub struct StaticIndexProvider {
    indexes: FxHashMap<PathBuf, Arc<dyn NameIndex>>,
}

impl StaticIndexProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, root: impl Into<PathBuf>, index: Arc<dyn NameIndex>) {
        self.indexes.insert(root.into(), index);
    }
}

impl IndexProvider for StaticIndexProvider {
    fn index_for(&self, scope: &Path) -> Option<Arc<dyn NameIndex>> {
        // Deepest registered root that covers the scope
        self.indexes
            .iter()
            .filter(|(root, index)| scope.starts_with(root) && index.covers(scope))
            .max_by_key(|(root, _)| root.components().count())
            .map(|(_, index)| Arc::clone(index))
    }
}
