use super::cache::{CachedHit, ResultCache};
use super::filters;
use super::log::RunLog;
use super::result::MatchResult;
use crate::config::{SearchConfig, ValidationError, validate};
use crate::matching::{Candidate, MatchStrategy, StrategyHit};
use crate::platform::PlatformError;
use crate::tree::{self, FolderNode, FolderTree, TreeError};
use crate::utils::read_text;
use chrono::Local;
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashSet;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// Directory depth below a unit at which descent stops. Guards against
/// symlink loops when links are followed.
const MAX_DEPTH: usize = 512;

#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("executor already started")]
    AlreadyStarted,

    #[error("failed to start workers: {0}")]
    Pool(String),
}

impl From<rayon::ThreadPoolBuildError> for ExecutorError {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        ExecutorError::Pool(err.to_string())
    }
}

impl From<ValidationError> for ExecutorError {
    fn from(err: ValidationError) -> Self {
        ExecutorError::InvalidConfig(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunState::Completed | RunState::Cancelled | RunState::Failed
        )
    }
}

/// A collaborator failure inside one traversal unit
#[derive(Debug, Clone, PartialEq)]
pub struct UnitFailure {
    pub unit: usize,
    pub error: PlatformError,
}

/// Outcome of a finished run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub state: RunState,
    pub workers: usize,
    /// Results handed to the channel
    pub results: usize,
    pub units: usize,
    pub failures: Vec<UnitFailure>,
    pub partial_failure: bool,
    /// Why the run failed, when `state` is `Failed`
    pub error: Option<TreeError>,
    pub elapsed: Duration,
    /// Where the run log was written, if logging was on
    pub log_file: Option<PathBuf>,
}

/// Settings that come from the application rather than the search config
#[derive(Debug, Clone)]
pub struct ExecutorOptions {
    /// Bytes of each file read for content search
    pub max_content_bytes: u64,
    /// Run log directory, used when the config enables logging
    pub log_dir: Option<PathBuf>,
    /// Replayed from and recorded to when the config enables caching
    pub cache: Option<Arc<ResultCache>>,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            max_content_bytes: 16 * 1024 * 1024,
            log_dir: None,
            cache: None,
        }
    }
}

/// Runs one search.
///
/// An executor moves through `Idle → Running → {Completed | Cancelled |
/// Failed}` exactly once; start a new executor for the next run.
pub struct SearchExecutor {
    state: Arc<Mutex<RunState>>,
    options: ExecutorOptions,
}

impl Default for SearchExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchExecutor {
    pub fn new() -> Self {
        Self::with_options(ExecutorOptions::default())
    }

    pub fn with_options(options: ExecutorOptions) -> Self {
        Self {
            state: Arc::new(Mutex::new(RunState::Idle)),
            options,
        }
    }

    pub fn state(&self) -> RunState {
        *self.state.lock()
    }

    /// Validate the request and start the run in the background.
    ///
    /// The root listing, partitioning into units and the worker pool all
    /// live on a coordinator thread; results arrive on
    /// [`SearchHandle::results`].
    pub fn start(
        &self,
        config: SearchConfig,
        tree: Arc<FolderTree>,
        strategy: MatchStrategy,
        root: &Path,
    ) -> Result<SearchHandle, ExecutorError> {
        validate::validate_config(&config)?;
        if strategy.kind() != config.matching.kind() {
            return Err(ExecutorError::InvalidConfig(format!(
                "strategy {:?} does not match configured method {:?}",
                strategy.kind(),
                config.matching.kind()
            )));
        }

        let mut state = self.state.lock();
        if *state != RunState::Idle {
            return Err(ExecutorError::AlreadyStarted);
        }

        let workers = config.thread_pool.resolve();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("fsweep-worker-{}", i))
            .build()?;

        let (tx, rx) = mpsc::channel();
        let cancel = Arc::new(AtomicBool::new(false));
        let gate = Arc::new(RwLock::new(()));
        let cache = if config.caching {
            self.options.cache.clone()
        } else {
            None
        };
        let run = Arc::new(Run {
            content_enabled: config.content_pattern().is_some(),
            found: cache.as_ref().map(|_| Mutex::new(Vec::new())),
            cache,
            replayed: OnceLock::new(),
            config,
            tree,
            strategy,
            root: root.to_path_buf(),
            options: self.options.clone(),
            cancel: Arc::clone(&cancel),
            gate: Arc::clone(&gate),
            emitted: AtomicUsize::new(0),
            failures: Mutex::new(Vec::new()),
            logged_paths: Mutex::new(Vec::new()),
        });

        *state = RunState::Running;
        drop(state);

        let shared_state = Arc::clone(&self.state);
        let coordinator = {
            let shared_state = Arc::clone(&shared_state);
            thread::Builder::new()
                .name("fsweep-search".to_string())
                .spawn(move || coordinate(run, pool, tx, shared_state))
        };
        let coordinator = match coordinator {
            Ok(handle) => handle,
            Err(e) => {
                *self.state.lock() = RunState::Failed;
                return Err(ExecutorError::Pool(e.to_string()));
            }
        };

        Ok(SearchHandle {
            results: rx,
            cancel,
            gate,
            state: shared_state,
            coordinator: Some(coordinator),
            workers,
        })
    }
}

/// Caller's side of a running search
pub struct SearchHandle {
    results: Receiver<MatchResult>,
    cancel: Arc<AtomicBool>,
    /// Held for reading around every emission, for writing by `cancel`
    gate: Arc<RwLock<()>>,
    state: Arc<Mutex<RunState>>,
    coordinator: Option<JoinHandle<RunSummary>>,
    workers: usize,
}

impl SearchHandle {
    /// Results as they are found. The channel closes when the run ends.
    pub fn results(&self) -> &Receiver<MatchResult> {
        &self.results
    }

    pub fn state(&self) -> RunState {
        *self.state.lock()
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Stop the run. Workers stop at their next expansion, match attempt or
    /// emission; nothing is emitted after this returns.
    pub fn cancel(&self) {
        {
            let _closed = self.gate.write();
            self.cancel.store(true, Ordering::SeqCst);
        }
        let mut state = self.state.lock();
        if *state == RunState::Running {
            *state = RunState::Cancelled;
            info!("search cancelled");
        }
    }

    /// Block until the run ends.
    pub fn wait(mut self) -> RunSummary {
        let workers = self.workers;
        match self.coordinator.take().map(JoinHandle::join) {
            Some(Ok(summary)) => summary,
            _ => {
                *self.state.lock() = RunState::Failed;
                RunSummary {
                    state: RunState::Failed,
                    workers,
                    results: 0,
                    units: 0,
                    failures: Vec::new(),
                    partial_failure: false,
                    error: None,
                    elapsed: Duration::ZERO,
                    log_file: None,
                }
            }
        }
    }
}

/// Everything the workers of one run share
struct Run {
    config: SearchConfig,
    tree: Arc<FolderTree>,
    strategy: MatchStrategy,
    root: PathBuf,
    options: ExecutorOptions,
    content_enabled: bool,
    cancel: Arc<AtomicBool>,
    gate: Arc<RwLock<()>>,
    emitted: AtomicUsize,
    failures: Mutex<Vec<UnitFailure>>,
    logged_paths: Mutex<Vec<PathBuf>>,
    /// Set when the config enables caching and a cache is configured
    cache: Option<Arc<ResultCache>>,
    /// Paths emitted from the cache; the traversal does not emit them again
    replayed: OnceLock<FxHashSet<PathBuf>>,
    /// Every match of the traversal, emitted or not, for the cache
    found: Option<Mutex<Vec<CachedHit>>>,
}

/// Where a unit's results go
enum Sink<'a> {
    Channel(Sender<MatchResult>),
    Buffer(&'a Mutex<Vec<MatchResult>>),
}

fn coordinate(
    run: Arc<Run>,
    pool: rayon::ThreadPool,
    tx: Sender<MatchResult>,
    state: Arc<Mutex<RunState>>,
) -> RunSummary {
    let started = Instant::now();
    let started_local = Local::now();
    let workers = pool.current_num_threads();
    info!(
        root = %run.root.display(),
        pattern = run.config.matching.pattern(),
        method = ?run.config.matching.kind(),
        workers,
        "search started"
    );

    let units = match run.list(&run.root) {
        Ok(units) => units,
        Err(err) => {
            warn!(root = %run.root.display(), error = %err, "search root unavailable");
            let mut state = state.lock();
            if *state == RunState::Running {
                *state = RunState::Failed;
            }
            return RunSummary {
                state: *state,
                workers,
                results: 0,
                units: 0,
                failures: Vec::new(),
                partial_failure: false,
                error: Some(err),
                elapsed: started.elapsed(),
                log_file: None,
            };
        }
    };

    let replayed = run.replay_cached(&units, &tx);
    let _ = run.replayed.set(replayed);

    let buffers: Vec<Mutex<Vec<MatchResult>>> = if run.config.realtime {
        Vec::new()
    } else {
        units.iter().map(|_| Mutex::new(Vec::new())).collect()
    };

    pool.scope(|scope| {
        for (index, unit) in units.iter().enumerate() {
            let run = &run;
            let sink = match buffers.get(index) {
                Some(buffer) => Sink::Buffer(buffer),
                None => Sink::Channel(tx.clone()),
            };
            scope.spawn(move |_| run.walk_unit(index, unit, &sink));
        }
    });

    if !run.config.realtime && !run.cancelled() {
        'flush: for buffer in buffers {
            for result in buffer.into_inner() {
                if !run.emit_now(&tx, result) {
                    break 'flush;
                }
            }
        }
    }
    drop(tx);

    let elapsed = started.elapsed();
    let failures = std::mem::take(&mut *run.failures.lock());
    let final_state = {
        let mut state = state.lock();
        if *state == RunState::Running {
            *state = RunState::Completed;
        }
        *state
    };
    let results = run.emitted.load(Ordering::SeqCst);
    info!(
        state = ?final_state,
        results,
        failures = failures.len(),
        elapsed_ms = elapsed.as_millis() as u64,
        "search finished"
    );

    if final_state == RunState::Completed {
        run.record_cache();
    }

    let log_file = if run.config.logging {
        run.write_log(final_state, started_local, elapsed, &failures)
    } else {
        None
    };

    RunSummary {
        state: final_state,
        workers,
        results,
        units: units.len(),
        partial_failure: !failures.is_empty(),
        failures,
        error: None,
        elapsed,
        log_file,
    }
}

impl Run {
    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Children of `path`; a fresh listing when caching is off.
    fn list(&self, path: &Path) -> tree::Result<Arc<[FolderNode]>> {
        if self.config.caching {
            self.tree.expand(path)
        } else {
            self.tree.reload(path)
        }
    }

    fn record_failure(&self, unit: usize, error: PlatformError) {
        warn!(unit, path = %error.path().display(), error = %error, "unit failure");
        self.failures.lock().push(UnitFailure { unit, error });
    }

    /// Depth-first, pre-order walk of one unit.
    fn walk_unit(&self, unit: usize, top: &FolderNode, sink: &Sink<'_>) {
        debug!(unit, path = %top.path.display(), "unit started");
        let mut stack: Vec<(FolderNode, usize)> = vec![(top.clone(), 0)];

        while let Some((node, depth)) = stack.pop() {
            if self.cancelled() {
                return;
            }
            if !self.visit(unit, &node, sink) || !node.is_dir() {
                continue;
            }
            if depth >= MAX_DEPTH {
                warn!(path = %node.path.display(), "maximum depth reached, not descending");
                continue;
            }

            if self.cancelled() {
                return;
            }
            match self.list(&node.path) {
                Ok(children) => {
                    stack.extend(children.iter().rev().map(|c| (c.clone(), depth + 1)));
                }
                Err(err) => self.record_failure(unit, platform_error(err)),
            }
        }
    }

    /// Match and emit one entry. Returns whether a directory may be descended.
    fn visit(&self, unit: usize, node: &FolderNode, sink: &Sink<'_>) -> bool {
        let filters = &self.config.filters;
        let meta = if filters.needs_metadata() || !filters.follow_symlinks {
            match self.tree.platform().file_metadata(&node.path) {
                Ok(meta) => Some(meta),
                Err(err) => {
                    self.record_failure(unit, err);
                    return false;
                }
            }
        } else {
            None
        };

        if !filters.follow_symlinks && meta.as_ref().is_some_and(|m| m.is_symlink) {
            trace!(path = %node.path.display(), "symlink skipped");
            return false;
        }

        if !self.config.target.accepts(node.is_dir()) {
            return true;
        }
        if let Err(rejection) = filters::check(filters, node, meta.as_ref()) {
            trace!(path = %node.path.display(), ?rejection, "filtered out");
            return true;
        }

        if self.cancelled() {
            return false;
        }
        let Some(hit) = self.match_node(node) else {
            trace!(path = %node.path.display(), "no match");
            return true;
        };

        let result = MatchResult {
            path: node.path.clone(),
            name: node.name.clone(),
            is_dir: node.is_dir(),
            field: hit.field,
            score: hit.score,
            unit,
            cached: false,
        };
        if let Some(found) = &self.found {
            found.lock().push(CachedHit::from(&result));
        }
        if self.replayed.get().is_some_and(|paths| paths.contains(&result.path)) {
            trace!(path = %result.path.display(), "already replayed from cache");
            return true;
        }
        match sink {
            Sink::Channel(tx) => {
                self.emit_now(tx, result);
            }
            Sink::Buffer(buffer) => {
                let _open = self.gate.read();
                if !self.cancelled() {
                    buffer.lock().push(result);
                }
            }
        }
        true
    }

    fn match_node(&self, node: &FolderNode) -> Option<StrategyHit> {
        let candidate = Candidate::new(&node.name, &node.path);
        if let Some(hit) = self.strategy.matches(&candidate) {
            return Some(hit);
        }
        if !self.content_enabled || node.is_dir() {
            return None;
        }

        let text = self.read_content(&node.path)?;
        self.strategy.matches(&candidate.with_content(&text))
    }

    fn read_content(&self, path: &Path) -> Option<String> {
        let reader = match self.tree.platform().read_file_content(path) {
            Ok(reader) => reader,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "content unreadable");
                return None;
            }
        };
        match read_text(reader, self.options.max_content_bytes) {
            Ok(Some(text)) => Some(text),
            Ok(None) => {
                trace!(path = %path.display(), "binary content skipped");
                None
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "content read failed");
                None
            }
        }
    }

    /// Send a result unless the run was cancelled. Returns false once the
    /// run should stop emitting.
    fn emit_now(&self, tx: &Sender<MatchResult>, result: MatchResult) -> bool {
        let _open = self.gate.read();
        if self.cancelled() {
            return false;
        }
        if self.config.logging {
            self.logged_paths.lock().push(result.path.clone());
        }
        // A dropped receiver only means nobody is listening any more
        if tx.send(result).is_ok() {
            self.emitted.fetch_add(1, Ordering::SeqCst);
        }
        true
    }

    /// Emit the cached matches of an equal config that still exist under
    /// the root and still fit the target type.
    fn replay_cached(&self, units: &[FolderNode], tx: &Sender<MatchResult>) -> FxHashSet<PathBuf> {
        let mut replayed = FxHashSet::default();
        let Some(hits) = self.cache.as_ref().and_then(|cache| cache.lookup(&self.config)) else {
            return replayed;
        };

        let platform = self.tree.platform();
        for hit in hits {
            if !hit.path.starts_with(&self.root) {
                continue;
            }
            // Gone since it was recorded
            let Ok(is_dir) = platform.is_directory(&hit.path) else {
                continue;
            };
            if !self.config.target.accepts(is_dir) {
                continue;
            }
            let Some(unit) = units.iter().position(|u| hit.path.starts_with(&u.path)) else {
                continue;
            };

            let result = MatchResult {
                name: hit
                    .path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                path: hit.path.clone(),
                is_dir,
                field: hit.field,
                score: hit.score,
                unit,
                cached: true,
            };
            if !self.emit_now(tx, result) {
                break;
            }
            replayed.insert(hit.path);
        }
        debug!(replayed = replayed.len(), "cached results replayed");
        replayed
    }

    fn record_cache(&self) {
        let (Some(cache), Some(found)) = (&self.cache, &self.found) else {
            return;
        };
        let found = std::mem::take(&mut *found.lock());
        if let Err(err) = cache.record(&self.config, found) {
            warn!(error = %err, "failed to write result cache");
        }
    }

    fn write_log(
        &self,
        state: RunState,
        started: chrono::DateTime<Local>,
        elapsed: Duration,
        failures: &[UnitFailure],
    ) -> Option<PathBuf> {
        let Some(dir) = &self.options.log_dir else {
            warn!("logging enabled but no log directory configured");
            return None;
        };
        let paths = self.logged_paths.lock();
        let log = RunLog::new(&self.config, &self.root, state, started, elapsed, &paths, failures);
        match log.write_to(dir) {
            Ok(path) => {
                debug!(path = %path.display(), "run log written");
                Some(path)
            }
            Err(err) => {
                warn!(dir = %dir.display(), error = %err, "failed to write run log");
                None
            }
        }
    }
}

fn platform_error(err: TreeError) -> PlatformError {
    match err {
        TreeError::NotFound(path) => PlatformError::PathNotFound(path),
        TreeError::NotADirectory(path) => PlatformError::Unreadable {
            path,
            message: "not a directory".to_string(),
        },
        TreeError::Platform(err) => err,
    }
}
