//! Shared trees and helpers for the integration tests.
#![allow(dead_code)]

use fsweep::config::{MatchMethod, SearchConfig};
use fsweep::matching::MatchStrategy;
use fsweep::platform::MemoryPlatform;
use fsweep::search::{MatchResult, RunSummary, SearchExecutor};
use fsweep::tree::FolderTree;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const VOL: &str = "/vol";

/// `/vol/d0 .. /vol/d{n-1}`, each holding `report_{i}.txt` and `notes.md`.
pub fn units(n: usize) -> Arc<MemoryPlatform> {
    let platform = Arc::new(MemoryPlatform::new());
    platform.add_volume(VOL);
    for i in 0..n {
        platform.add_file(format!("{VOL}/d{i}/report_{i}.txt"), format!("unit {i}"));
        platform.add_file(format!("{VOL}/d{i}/notes.md"), "plain notes");
    }
    platform
}

/// A small mixed tree used by ordering and filter tests.
///
/// ```text
/// /vol
/// ├── a/ {x.txt, sub/ {y.txt, deep/ {z.rs}}}
/// ├── b/ {w.txt}
/// └── c/ {}
/// ```
pub fn mixed() -> Arc<MemoryPlatform> {
    let platform = Arc::new(MemoryPlatform::new());
    platform.add_volume(VOL);
    platform.add_file("/vol/a/x.txt", "alpha");
    platform.add_file("/vol/a/sub/y.txt", "beta");
    platform.add_file("/vol/a/sub/deep/z.rs", "fn main() {}");
    platform.add_file("/vol/b/w.txt", "gamma");
    platform.add_dir("/vol/c");
    platform
}

pub fn tree(platform: &Arc<MemoryPlatform>) -> Arc<FolderTree> {
    Arc::new(FolderTree::new(platform.clone()).unwrap())
}

pub fn config(method: MatchMethod) -> SearchConfig {
    SearchConfig::new(method)
}

pub fn exact(pattern: &str) -> SearchConfig {
    config(MatchMethod::Default {
        pattern: pattern.to_string(),
    })
}

pub fn everything() -> SearchConfig {
    config(MatchMethod::Regex {
        pattern: ".*".to_string(),
    })
}

/// Run a search to completion, collecting every result.
pub fn run(config: SearchConfig, tree: Arc<FolderTree>, root: &str) -> (Vec<MatchResult>, RunSummary) {
    let strategy = MatchStrategy::new(&config.matching, config.content_pattern()).unwrap();
    let handle = SearchExecutor::new()
        .start(config, tree, strategy, Path::new(root))
        .unwrap();
    let results: Vec<MatchResult> = handle.results().iter().collect();
    (results, handle.wait())
}

pub fn paths(results: &[MatchResult]) -> Vec<PathBuf> {
    results.iter().map(|r| r.path.clone()).collect()
}

pub fn sorted_paths(results: &[MatchResult]) -> Vec<PathBuf> {
    let mut paths = paths(results);
    paths.sort();
    paths
}

pub fn p(path: &str) -> PathBuf {
    PathBuf::from(path)
}
