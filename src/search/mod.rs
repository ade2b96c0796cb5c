//! Search execution.
//!
//! [`SearchExecutor::start`] takes a validated [`SearchConfig`](crate::config::SearchConfig),
//! a shared [`FolderTree`](crate::tree::FolderTree), a [`MatchStrategy`](crate::matching::MatchStrategy)
//! and a root path. The root's children become *units*; each unit is walked
//! depth-first by one worker of a dedicated rayon pool:
//!
//! ```text
//! root ─┬─ unit 0 ── walked by a worker, pre-order
//!       ├─ unit 1 ── walked by a worker, pre-order
//!       └─ ...
//! ```
//!
//! For every entry the worker applies, in order, the symlink policy, the
//! target type, the property filters and the strategy (name first, then
//! content). In realtime mode matches go to the channel as they are found;
//! otherwise each unit buffers its matches and the buffers are flushed in
//! unit order once every unit is done.
//!
//! With caching on and a [`ResultCache`] configured, matches recorded by an
//! earlier run of the same config are emitted before the traversal starts.

pub mod cache;
pub mod executor;
pub mod filters;
pub mod log;
pub mod result;

pub use executor::{
    ExecutorError, ExecutorOptions, RunState, RunSummary, SearchExecutor, SearchHandle,
    UnitFailure,
};
pub use cache::{CachedHit, ResultCache};
pub use result::MatchResult;
