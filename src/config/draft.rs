use super::validate::{
    self, FieldGroup, ValidationError, ValidationReason, validate_date_range, validate_file_types,
    validate_owner, validate_size_range, validate_thread_count,
};
use super::{
    ContentSearch, DateField, MatchDefaults, MatchMethod, PropertyFilters, SearchConfig,
    TargetType, ThreadPool,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Which matching method a draft selects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MethodChoice {
    #[default]
    Default,
    Regex,
    DamerauLevenshtein,
    Jaccard,
    Index,
}

impl FromStr for MethodChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "default" | "exact" => Ok(MethodChoice::Default),
            "regex" | "re" => Ok(MethodChoice::Regex),
            "dl" | "damerau-levenshtein" | "damerau_levenshtein" => {
                Ok(MethodChoice::DamerauLevenshtein)
            }
            "jaccard" => Ok(MethodChoice::Jaccard),
            "index" => Ok(MethodChoice::Index),
            other => Err(format!("unknown matching method '{}'", other)),
        }
    }
}

/// Unvalidated, text-typed search settings.
///
/// Each optional group has a `use_*` switch and raw string fields, the way
/// a settings form collects them. [`ConfigDraft::build`] turns a draft into a
/// [`SearchConfig`]; a disabled group is left out entirely, an enabled one
/// must validate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigDraft {
    pub pattern: String,
    pub method: MethodChoice,
    /// Overrides the default Damerau-Levenshtein threshold
    pub max_distance: Option<usize>,
    /// Overrides the default Jaccard threshold
    pub min_similarity: Option<f64>,
    pub target: TargetType,

    pub use_content: bool,
    pub content_pattern: String,

    pub use_size: bool,
    pub size_min: String,
    pub size_max: String,

    pub use_created_date: bool,
    pub created_start: String,
    pub created_end: String,

    pub use_modified_date: bool,
    pub modified_start: String,
    pub modified_end: String,

    pub use_owner: bool,
    pub owner: String,

    pub use_file_types: bool,
    pub file_types: String,

    pub follow_symlinks: bool,

    pub use_thread_pool: bool,
    pub threads: String,

    pub no_caching: bool,
    pub batch_results: bool,
    pub logging: bool,
}

impl ConfigDraft {
    pub fn new(pattern: impl Into<String>, method: MethodChoice) -> Self {
        Self {
            pattern: pattern.into(),
            method,
            ..Self::default()
        }
    }

    /// Validate every enabled group and assemble the config.
    pub fn build(&self, defaults: &MatchDefaults) -> validate::Result<SearchConfig> {
        let matching = self.matching(defaults);
        validate::validate_matching(&matching)?;

        let content_search = if self.use_content {
            let pattern = self.content_pattern.trim();
            ContentSearch {
                enabled: true,
                pattern: (!pattern.is_empty()).then(|| pattern.to_string()),
            }
        } else {
            ContentSearch::default()
        };
        if let (Some(pattern), MatchMethod::Regex { .. }) = (&content_search.pattern, &matching) {
            regex::Regex::new(pattern).map_err(|e| {
                ValidationError::new(
                    FieldGroup::ContentSearch,
                    ValidationReason::InvalidPattern(e.to_string()),
                )
            })?;
        }

        let mut filters = PropertyFilters {
            follow_symlinks: self.follow_symlinks,
            ..PropertyFilters::default()
        };
        if self.use_size {
            filters.size = validate_size_range(Some(&self.size_min), Some(&self.size_max))?;
            if filters.size.is_none() {
                return Err(ValidationError::new(
                    FieldGroup::Size,
                    ValidationReason::MissingValue,
                ));
            }
        }
        if self.use_created_date {
            filters.created = Some(validate_date_range(
                Some(&self.created_start),
                Some(&self.created_end),
                DateField::Created,
            )?);
        }
        if self.use_modified_date {
            filters.modified = Some(validate_date_range(
                Some(&self.modified_start),
                Some(&self.modified_end),
                DateField::Modified,
            )?);
        }
        if self.use_owner {
            filters.owner = Some(validate_owner(&self.owner)?);
        }
        if self.use_file_types {
            filters.extensions = Some(validate_file_types(&self.file_types)?);
        }

        let thread_pool = if self.use_thread_pool {
            validate_thread_count(&self.threads)?
        } else {
            ThreadPool::Auto
        };

        Ok(SearchConfig {
            target: self.target,
            matching,
            content_search,
            filters,
            thread_pool,
            caching: !self.no_caching,
            realtime: !self.batch_results,
            logging: self.logging,
        })
    }

    fn matching(&self, defaults: &MatchDefaults) -> MatchMethod {
        let pattern = self.pattern.clone();
        match self.method {
            MethodChoice::Default => MatchMethod::Default { pattern },
            MethodChoice::Regex => MatchMethod::Regex { pattern },
            MethodChoice::DamerauLevenshtein => MatchMethod::FuzzyDamerauLevenshtein {
                pattern,
                max_distance: self.max_distance.unwrap_or(defaults.max_distance),
            },
            MethodChoice::Jaccard => MatchMethod::FuzzyJaccard {
                pattern,
                min_similarity: self.min_similarity.unwrap_or(defaults.min_similarity),
                ngram: defaults.ngram,
            },
            MethodChoice::Index => MatchMethod::Index { pattern },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SizeRange;

    #[test]
    fn test_minimal_draft() {
        let config = ConfigDraft::new("report", MethodChoice::Default)
            .build(&MatchDefaults::default())
            .unwrap();
        assert_eq!(
            config.matching,
            MatchMethod::Default {
                pattern: "report".into()
            }
        );
        assert_eq!(config.filters, PropertyFilters::default());
        assert_eq!(config.thread_pool, ThreadPool::Auto);
        assert!(config.caching && config.realtime && !config.logging);
    }

    #[test]
    fn test_fuzzy_defaults_and_overrides() {
        let defaults = MatchDefaults::default();
        let config = ConfigDraft::new("notes", MethodChoice::DamerauLevenshtein)
            .build(&defaults)
            .unwrap();
        assert_eq!(
            config.matching,
            MatchMethod::FuzzyDamerauLevenshtein {
                pattern: "notes".into(),
                max_distance: 2
            }
        );

        let mut draft = ConfigDraft::new("notes", MethodChoice::Jaccard);
        draft.min_similarity = Some(0.8);
        let config = draft.build(&defaults).unwrap();
        assert_eq!(
            config.matching,
            MatchMethod::FuzzyJaccard {
                pattern: "notes".into(),
                min_similarity: 0.8,
                ngram: 1
            }
        );
    }

    #[test]
    fn test_disabled_groups_ignore_garbage() {
        let mut draft = ConfigDraft::new("a", MethodChoice::Default);
        draft.size_min = "abc".into();
        draft.created_start = "yesterday".into();
        draft.modified_end = "tomorrow".into();
        draft.threads = "-3".into();
        assert!(draft.build(&MatchDefaults::default()).is_ok());
    }

    #[test]
    fn test_enabled_groups_validate() {
        let mut draft = ConfigDraft::new("a", MethodChoice::Default);
        draft.use_size = true;
        draft.size_min = "1KB".into();
        draft.size_max = "2KB".into();
        draft.use_file_types = true;
        draft.file_types = ".rs md".into();
        draft.use_thread_pool = true;
        draft.threads = "4".into();

        let config = draft.build(&MatchDefaults::default()).unwrap();
        assert_eq!(config.filters.size, Some(SizeRange { min: 1024, max: 2048 }));
        assert_eq!(config.filters.extensions.as_ref().map(|e| e.len()), Some(2));
        assert_eq!(config.thread_pool, ThreadPool::Custom { threads: 4 });

        draft.size_min = "3KB".into();
        let err = draft.build(&MatchDefaults::default()).unwrap_err();
        assert_eq!(err.group, FieldGroup::Size);
        assert_eq!(err.reason, ValidationReason::RangeInverted);

        draft.size_min = String::new();
        draft.size_max = String::new();
        let err = draft.build(&MatchDefaults::default()).unwrap_err();
        assert_eq!(err.reason, ValidationReason::MissingValue);
    }

    #[test]
    fn test_both_date_ranges() {
        let mut draft = ConfigDraft::new("a", MethodChoice::Default);
        draft.use_created_date = true;
        draft.created_start = "2020-01-01".into();
        draft.created_end = "2020-12-31".into();
        draft.use_modified_date = true;
        draft.modified_start = "2023-01-01".into();
        draft.modified_end = "2023-06-30".into();

        let config = draft.build(&MatchDefaults::default()).unwrap();
        let created = config.filters.created.unwrap();
        let modified = config.filters.modified.unwrap();
        assert_eq!(created.end.to_string(), "2020-12-31");
        assert_eq!(modified.start.to_string(), "2023-01-01");

        draft.modified_start = "2023-07-01".into();
        let err = draft.build(&MatchDefaults::default()).unwrap_err();
        assert_eq!(err.group, FieldGroup::Date(DateField::Modified));
        assert_eq!(err.reason, ValidationReason::RangeInverted);
    }

    #[test]
    fn test_invalid_regex_rejected() {
        let draft = ConfigDraft::new("(unclosed", MethodChoice::Regex);
        let err = draft.build(&MatchDefaults::default()).unwrap_err();
        assert_eq!(err.group, FieldGroup::Matching);
    }

    #[test]
    fn test_method_from_str() {
        assert_eq!("DL".parse::<MethodChoice>().unwrap(), MethodChoice::DamerauLevenshtein);
        assert_eq!("jaccard".parse::<MethodChoice>().unwrap(), MethodChoice::Jaccard);
        assert!("soundex".parse::<MethodChoice>().is_err());
    }
}
