//! # fsweep - filter-driven parallel file search
//!
//! fsweep searches volumes and folders for entries whose names (and
//! optionally content) match a pattern, narrowed by size, date, owner and
//! extension filters, on a worker pool of configurable size.
//!
//! ## Architecture
//!
//! - [`platform`] - the filesystem collaborator trait, a `std::fs` backend and
//!   an in-memory backend
//! - [`tree`] - volumes and a lazily expanded, cached folder tree
//! - [`config`] - search configuration, field group validators, raw drafts
//! - [`slots`] - named configuration presets persisted as JSON
//! - [`matching`] - exact, regex, fuzzy and index-based matching strategies
//! - [`search`] - the executor: units, worker pool, filters, result stream
//! - [`output`] - terminal formatting of results
//! - [`utils`] - app data directory, tokenizer, content sniffing
//!
//! ## Quick Start
//!
//! ```no_run
//! use fsweep::config::{MatchMethod, SearchConfig};
//! use fsweep::matching::MatchStrategy;
//! use fsweep::platform::LocalPlatform;
//! use fsweep::search::SearchExecutor;
//! use fsweep::tree::FolderTree;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let tree = Arc::new(FolderTree::new(Arc::new(LocalPlatform::new())).unwrap());
//! let config = SearchConfig::new(MatchMethod::Default { pattern: "invoice".into() });
//! let strategy = MatchStrategy::new(&config.matching, config.content_pattern()).unwrap();
//!
//! let handle = SearchExecutor::new()
//!     .start(config, tree, strategy, Path::new("/home"))
//!     .unwrap();
//! for result in handle.results() {
//!     println!("{}", result.path.display());
//! }
//! let summary = handle.wait();
//! println!("{:?}: {} results", summary.state, summary.results);
//! ```

pub mod config;
pub mod matching;
pub mod output;
pub mod platform;
pub mod search;
pub mod slots;
pub mod tree;
pub mod utils;
