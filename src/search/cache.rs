//! Results of earlier runs, replayed at the start of a matching run.
//!
//! Entries are keyed by the whole [`SearchConfig`], pattern included. Each
//! completed run with caching on records its matches; a later run with an
//! equal config replays the recorded paths that still exist under its root
//! before the traversal starts, and the traversal then skips them.
//!
//! Every record counts as a hit. When the cache grows past its capacity the
//! entry with the fewest hits goes first, oldest first among equals.

use crate::config::SearchConfig;
use crate::matching::{MatchedField, Score};
use crate::search::MatchResult;
use crate::utils::write_atomic;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const CACHE_FILE: &str = "search_cache.json";
pub const DEFAULT_CAPACITY: usize = 50;
const CACHE_VERSION: u32 = 1;

/// One recorded match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedHit {
    pub path: PathBuf,
    pub is_dir: bool,
    pub field: MatchedField,
    pub score: Score,
}

impl From<&MatchResult> for CachedHit {
    fn from(result: &MatchResult) -> Self {
        Self {
            path: result.path.clone(),
            is_dir: result.is_dir,
            field: result.field,
            score: result.score,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub config: SearchConfig,
    pub hits: u32,
    pub results: Vec<CachedHit>,
}

#[derive(Serialize, Deserialize)]
struct CacheFile {
    version: u32,
    entries: Vec<CacheEntry>,
}

#[derive(Debug)]
pub struct ResultCache {
    /// Backing file; `None` keeps the cache in memory only
    path: Option<PathBuf>,
    capacity: usize,
    entries: Mutex<Vec<CacheEntry>>,
}

impl ResultCache {
    pub fn in_memory(capacity: usize) -> Self {
        Self {
            path: None,
            capacity: capacity.max(1),
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Open the cache file at `path`.
    ///
    /// A missing file is an empty cache. So is an unreadable one: the cache
    /// is rebuilt by later runs, so its loss only costs the replay.
    pub fn open(path: impl Into<PathBuf>, capacity: usize) -> io::Result<Self> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<CacheFile>(&content) {
                Ok(file) if file.version == CACHE_VERSION => file.entries,
                Ok(file) => {
                    warn!(path = %path.display(), version = file.version, "unknown cache version, starting empty");
                    Vec::new()
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "corrupt result cache, starting empty");
                    Vec::new()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e),
        };
        debug!(path = %path.display(), entries = entries.len(), "result cache opened");
        Ok(Self {
            path: Some(path),
            capacity: capacity.max(1),
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Recorded matches for `config`.
    pub fn lookup(&self, config: &SearchConfig) -> Option<Vec<CachedHit>> {
        self.entries
            .lock()
            .iter()
            .find(|entry| entry.config == *config)
            .map(|entry| entry.results.clone())
    }

    pub fn hits(&self, config: &SearchConfig) -> Option<u32> {
        self.entries
            .lock()
            .iter()
            .find(|entry| entry.config == *config)
            .map(|entry| entry.hits)
    }

    /// Store the matches of a completed run, replacing any earlier ones for
    /// the same config, and write the cache back if it has a file.
    pub fn record(&self, config: &SearchConfig, results: Vec<CachedHit>) -> io::Result<()> {
        let mut entries = self.entries.lock();
        match entries.iter_mut().find(|entry| entry.config == *config) {
            Some(entry) => {
                entry.hits = entry.hits.saturating_add(1);
                entry.results = results;
            }
            None => entries.push(CacheEntry {
                config: config.clone(),
                hits: 1,
                results,
            }),
        }

        while entries.len() > self.capacity {
            // min_by_key keeps the first of equal minimums, the oldest entry
            let Some(victim) = entries
                .iter()
                .enumerate()
                .min_by_key(|(_, entry)| entry.hits)
                .map(|(i, _)| i)
            else {
                break;
            };
            let evicted = entries.remove(victim);
            debug!(pattern = evicted.config.matching.pattern(), hits = evicted.hits, "cache entry evicted");
        }

        let Some(path) = &self.path else {
            return Ok(());
        };
        let file = CacheFile {
            version: CACHE_VERSION,
            entries: entries.clone(),
        };
        let content = serde_json::to_vec_pretty(&file).map_err(io::Error::other)?;
        write_atomic(path, &content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatchMethod;
    use tempfile::tempdir;

    fn config(pattern: &str) -> SearchConfig {
        SearchConfig::new(MatchMethod::Default {
            pattern: pattern.to_string(),
        })
    }

    fn hit(path: &str) -> CachedHit {
        CachedHit {
            path: PathBuf::from(path),
            is_dir: false,
            field: MatchedField::Name,
            score: Score::Exact,
        }
    }

    #[test]
    fn test_record_counts_hits_and_replaces_results() {
        let cache = ResultCache::in_memory(DEFAULT_CAPACITY);
        assert_eq!(cache.lookup(&config("a")), None);

        cache.record(&config("a"), vec![hit("/vol/a1")]).unwrap();
        assert_eq!(cache.hits(&config("a")), Some(1));

        cache.record(&config("a"), vec![hit("/vol/a2")]).unwrap();
        assert_eq!(cache.hits(&config("a")), Some(2));
        assert_eq!(cache.lookup(&config("a")), Some(vec![hit("/vol/a2")]));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_key_is_the_whole_config() {
        let cache = ResultCache::in_memory(DEFAULT_CAPACITY);
        cache.record(&config("a"), vec![hit("/vol/a")]).unwrap();

        let mut other = config("a");
        other.logging = true;
        assert_eq!(cache.lookup(&other), None);
        assert!(cache.lookup(&config("a")).is_some());
    }

    #[test]
    fn test_evicts_fewest_hits_oldest_first() {
        let cache = ResultCache::in_memory(3);
        for pattern in ["a", "b", "c"] {
            cache.record(&config(pattern), Vec::new()).unwrap();
        }
        cache.record(&config("a"), Vec::new()).unwrap();
        cache.record(&config("c"), Vec::new()).unwrap();

        // a=2, b=1, c=2; inserting d overflows and b has the fewest hits
        cache.record(&config("d"), Vec::new()).unwrap();
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.hits(&config("b")), None);

        // a=2, c=2, d=1; the newcomer e ties with d and d is older
        cache.record(&config("e"), Vec::new()).unwrap();
        assert_eq!(cache.hits(&config("d")), None);
        assert_eq!(cache.hits(&config("e")), Some(1));
        assert_eq!(cache.hits(&config("a")), Some(2));
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CACHE_FILE);
        {
            let cache = ResultCache::open(&path, DEFAULT_CAPACITY).unwrap();
            cache.record(&config("a"), vec![hit("/vol/a")]).unwrap();
            cache.record(&config("a"), vec![hit("/vol/a")]).unwrap();
        }

        let cache = ResultCache::open(&path, DEFAULT_CAPACITY).unwrap();
        assert_eq!(cache.hits(&config("a")), Some(2));
        assert_eq!(cache.lookup(&config("a")), Some(vec![hit("/vol/a")]));
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CACHE_FILE);
        fs::write(&path, "[[[").unwrap();

        let cache = ResultCache::open(&path, DEFAULT_CAPACITY).unwrap();
        assert!(cache.is_empty());
        cache.record(&config("a"), Vec::new()).unwrap();
        assert_eq!(ResultCache::open(&path, DEFAULT_CAPACITY).unwrap().len(), 1);
    }
}
