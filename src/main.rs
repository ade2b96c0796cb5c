use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use fsweep::config::{ConfigDraft, MatchKind, MethodChoice, SearchConfig, TargetType};
use fsweep::matching::{InvertedNameIndex, MatchStrategy, StaticIndexProvider};
use fsweep::output;
use fsweep::platform::LocalPlatform;
use fsweep::search::{ExecutorOptions, ResultCache, RunState, SearchExecutor};
use fsweep::slots::SlotStore;
use fsweep::tree::FolderTree;
use fsweep::utils::AppConfig;
use fsweep::utils::progress::search_spinner;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "fsweep")]
#[command(about = "Filter-driven parallel file search")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Show debug logs (otherwise FSWEEP_LOG, default "warn")
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Search names (and optionally content) under a root
    Search(SearchArgs),
    /// List mounted volumes
    Volumes,
    /// List the children of a directory
    Ls {
        #[arg(default_value = ".")]
        path: PathBuf,
    },
    /// Manage saved search presets
    Slot {
        #[command(subcommand)]
        action: SlotAction,
    },
}

#[derive(Subcommand)]
enum SlotAction {
    /// List saved slots
    List,
    /// Print a slot's configuration as JSON
    Show { name: String },
    /// Delete a slot
    Delete { name: String },
}

#[derive(Args)]
struct SearchArgs {
    /// Pattern to match (optional when --slot supplies one)
    pattern: Option<String>,

    /// Directory to search
    #[arg(short, long, default_value = ".")]
    root: PathBuf,

    /// default, regex, dl, jaccard or index
    #[arg(short, long, default_value = "default")]
    method: MethodChoice,

    /// Maximum Damerau-Levenshtein distance
    #[arg(long)]
    max_distance: Option<usize>,

    /// Minimum Jaccard similarity
    #[arg(long)]
    min_similarity: Option<f64>,

    /// Only report files
    #[arg(long, conflicts_with = "folders_only")]
    files_only: bool,

    /// Only report folders
    #[arg(long)]
    folders_only: bool,

    /// Also search file content, optionally with a separate pattern
    #[arg(short, long, num_args = 0..=1, default_missing_value = "")]
    content: Option<String>,

    /// Minimum size, e.g. 0, 10KB, 2MB
    #[arg(long)]
    size_min: Option<String>,

    /// Maximum size, e.g. 512KB, 1GB
    #[arg(long)]
    size_max: Option<String>,

    /// First day (YYYY-MM-DD) of the modification date filter
    #[arg(long)]
    since: Option<String>,

    /// Last day (YYYY-MM-DD) of the modification date filter
    #[arg(long)]
    until: Option<String>,

    /// First day (YYYY-MM-DD) of the creation date filter
    #[arg(long)]
    created_since: Option<String>,

    /// Last day (YYYY-MM-DD) of the creation date filter
    #[arg(long)]
    created_until: Option<String>,

    /// Owner name (case-insensitive substring)
    #[arg(long)]
    owner: Option<String>,

    /// Extensions, e.g. "rs toml md"
    #[arg(short, long)]
    ext: Option<String>,

    /// Descend into symbolic links
    #[arg(short = 'L', long)]
    follow_symlinks: bool,

    /// Number of worker threads
    #[arg(short = 'j', long)]
    threads: Option<String>,

    /// Re-list every directory and skip the result cache
    #[arg(long)]
    no_cache: bool,

    /// Print results once the search ends, grouped by top-level folder
    #[arg(long)]
    batch: bool,

    /// Write a JSON run log
    #[arg(long)]
    log: bool,

    /// Start from a saved slot
    #[arg(long)]
    slot: Option<String>,

    /// Save the resulting configuration as a slot before searching
    #[arg(long)]
    save_slot: Option<String>,
}

impl SearchArgs {
    fn draft(&self) -> Result<ConfigDraft> {
        let Some(pattern) = &self.pattern else {
            bail!("a pattern is required unless --slot is given");
        };
        let target = if self.files_only {
            TargetType::FilesOnly
        } else if self.folders_only {
            TargetType::FoldersOnly
        } else {
            TargetType::FilesAndFolders
        };

        Ok(ConfigDraft {
            pattern: pattern.clone(),
            method: self.method,
            max_distance: self.max_distance,
            min_similarity: self.min_similarity,
            target,
            use_content: self.content.is_some(),
            content_pattern: self.content.clone().unwrap_or_default(),
            use_size: self.size_min.is_some() || self.size_max.is_some(),
            size_min: self.size_min.clone().unwrap_or_default(),
            size_max: self.size_max.clone().unwrap_or_default(),
            use_created_date: self.created_since.is_some() || self.created_until.is_some(),
            created_start: self.created_since.clone().unwrap_or_default(),
            created_end: self.created_until.clone().unwrap_or_default(),
            use_modified_date: self.since.is_some() || self.until.is_some(),
            modified_start: self.since.clone().unwrap_or_default(),
            modified_end: self.until.clone().unwrap_or_default(),
            use_owner: self.owner.is_some(),
            owner: self.owner.clone().unwrap_or_default(),
            use_file_types: self.ext.is_some(),
            file_types: self.ext.clone().unwrap_or_default(),
            follow_symlinks: self.follow_symlinks,
            use_thread_pool: self.threads.is_some(),
            threads: self.threads.clone().unwrap_or_default(),
            no_caching: self.no_cache,
            batch_results: self.batch,
            logging: self.log,
        })
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_env("FSWEEP_LOG")
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let app = AppConfig::load()?;
    let color = !cli.no_color;

    match cli.command {
        Commands::Search(args) => run_search(&app, args, color)?,
        Commands::Volumes => {
            let tree = local_tree()?;
            let mut out = output::stdout(color);
            let roots: Vec<_> = tree.volumes().into_iter().map(|v| v.root).collect();
            output::print_listing(&mut out, &roots)?;
        }
        Commands::Ls { path } => {
            let tree = local_tree()?;
            let path = canonical(&path)?;
            let children = tree
                .expand(&path)
                .with_context(|| format!("Failed to list {}", path.display()))?;
            let mut out = output::stdout(color);
            output::print_listing(&mut out, &children)?;
        }
        Commands::Slot { action } => {
            let store = SlotStore::open(app.slots_path()?)?;
            match action {
                SlotAction::List => {
                    for name in store.list() {
                        println!("{}", name);
                    }
                }
                SlotAction::Show { name } => {
                    let config = store.load(&name)?;
                    println!("{}", serde_json::to_string_pretty(&config)?);
                }
                SlotAction::Delete { name } => {
                    store.delete(&name)?;
                    println!("Deleted slot: {}", name);
                }
            }
        }
    }

    Ok(())
}

fn run_search(app: &AppConfig, args: SearchArgs, color: bool) -> Result<()> {
    let config = search_config(app, &args)?;

    if let Some(name) = &args.save_slot {
        let store = SlotStore::open(app.slots_path()?)?;
        store.save(name, &config)?;
        eprintln!("Saved slot: {}", name);
    }

    let root = canonical(&args.root)?;
    let tree = Arc::new(local_tree()?);
    let strategy = if config.matching.kind() == MatchKind::Index {
        let index = InvertedNameIndex::build(&tree, &root)
            .with_context(|| format!("Failed to index {}", root.display()))?;
        let mut provider = StaticIndexProvider::new();
        provider.register(root.clone(), Arc::new(index));
        MatchStrategy::with_index(&config.matching, config.content_pattern(), &provider, &root)?
    } else {
        MatchStrategy::new(&config.matching, config.content_pattern())?
    };

    let options = ExecutorOptions {
        max_content_bytes: app.max_content_bytes,
        log_dir: if config.logging {
            Some(app.log_dir()?)
        } else {
            None
        },
        cache: if config.caching {
            let path = app.cache_path()?;
            let cache = ResultCache::open(&path, app.cache_capacity)
                .with_context(|| format!("Failed to open result cache {}", path.display()))?;
            Some(Arc::new(cache))
        } else {
            None
        },
    };
    let handle = SearchExecutor::with_options(options).start(config, tree, strategy, &root)?;

    let spinner = search_spinner();
    let mut out = output::stdout(color);
    let mut found = 0usize;
    for result in handle.results() {
        found += 1;
        spinner.suspend(|| output::print_match(&mut out, &result))?;
        spinner.set_message(format!("searching... {} found", found));
    }
    spinner.finish_and_clear();

    let summary = handle.wait();
    output::print_summary(&summary, color)?;
    if summary.state == RunState::Failed {
        bail!("search failed");
    }
    Ok(())
}

fn search_config(app: &AppConfig, args: &SearchArgs) -> Result<SearchConfig> {
    let Some(slot) = &args.slot else {
        return Ok(args.draft()?.build(&app.match_defaults())?);
    };

    let store = SlotStore::open(app.slots_path()?)?;
    let mut config = store.load(slot)?;
    if let Some(pattern) = &args.pattern {
        config.matching.set_pattern(pattern.clone());
    }
    Ok(config)
}

fn local_tree() -> Result<FolderTree> {
    FolderTree::new(Arc::new(LocalPlatform::new())).context("Failed to enumerate volumes")
}

fn canonical(path: &Path) -> Result<PathBuf> {
    path.canonicalize()
        .with_context(|| format!("No such directory: {}", path.display()))
}
