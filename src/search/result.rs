use crate::matching::{MatchedField, Score};
use serde::Serialize;
use std::path::PathBuf;

/// One entry reported by a search run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub path: PathBuf,
    pub name: String,
    pub is_dir: bool,
    pub field: MatchedField,
    pub score: Score,
    /// Index of the traversal unit (top-level child of the root) it came from
    pub unit: usize,
    /// Replayed from the result cache before traversal
    pub cached: bool,
}
