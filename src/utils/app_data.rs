use crate::config::MatchDefaults;
use crate::search::cache::{CACHE_FILE, DEFAULT_CAPACITY};
use crate::slots::SLOTS_FILE;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const APP_NAME: &str = "fsweep";
const CONFIG_FILE: &str = "config.json";
const LOG_DIR: &str = "logs";

/// Application configuration stored in the app data directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Default maximum edit distance for Damerau-Levenshtein matching
    #[serde(default = "default_dl_threshold")]
    pub damerau_levenshtein_threshold: usize,

    /// Default minimum similarity for Jaccard matching
    #[serde(default = "default_jaccard_threshold")]
    pub jaccard_threshold: f64,

    /// Character n-gram size for Jaccard matching
    #[serde(default = "default_jaccard_ngram")]
    pub jaccard_ngram: usize,

    /// Bytes of a file read for content search
    #[serde(default = "default_max_content_bytes")]
    pub max_content_bytes: u64,

    /// Slot store location; defaults to `slots.json` in the app data directory
    #[serde(default)]
    pub slots_file: Option<PathBuf>,

    /// Run log directory; defaults to `logs/` in the app data directory
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Result cache location; defaults to `search_cache.json` in the app data directory
    #[serde(default)]
    pub cache_file: Option<PathBuf>,

    /// Searches kept in the result cache
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

fn default_dl_threshold() -> usize {
    2
}

fn default_jaccard_threshold() -> f64 {
    0.5
}

fn default_jaccard_ngram() -> usize {
    1
}

fn default_max_content_bytes() -> u64 {
    16 * 1024 * 1024
}

fn default_cache_capacity() -> usize {
    DEFAULT_CAPACITY
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            damerau_levenshtein_threshold: default_dl_threshold(),
            jaccard_threshold: default_jaccard_threshold(),
            jaccard_ngram: default_jaccard_ngram(),
            max_content_bytes: default_max_content_bytes(),
            slots_file: None,
            log_dir: None,
            cache_file: None,
            cache_capacity: default_cache_capacity(),
        }
    }
}

impl AppConfig {
    /// Load config from the app data directory, or return default if not found
    pub fn load() -> Result<Self> {
        Self::load_from(&get_config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = fs::read_to_string(config_path).context("Failed to read config file")?;
            let config: AppConfig =
                serde_json::from_str(&content).context("Failed to parse config file")?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to the app data directory
    pub fn save(&self) -> Result<()> {
        self.save_to(&get_config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(config_path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// Fuzzy thresholds used when a search does not set its own
    pub fn match_defaults(&self) -> MatchDefaults {
        MatchDefaults {
            max_distance: self.damerau_levenshtein_threshold,
            min_similarity: self.jaccard_threshold,
            ngram: self.jaccard_ngram.max(1),
        }
    }

    pub fn slots_path(&self) -> Result<PathBuf> {
        match &self.slots_file {
            Some(path) => Ok(path.clone()),
            None => Ok(get_app_data_dir()?.join(SLOTS_FILE)),
        }
    }

    pub fn cache_path(&self) -> Result<PathBuf> {
        match &self.cache_file {
            Some(path) => Ok(path.clone()),
            None => Ok(get_app_data_dir()?.join(CACHE_FILE)),
        }
    }

    pub fn log_dir(&self) -> Result<PathBuf> {
        match &self.log_dir {
            Some(path) => Ok(path.clone()),
            None => Ok(get_app_data_dir()?.join(LOG_DIR)),
        }
    }
}

/// Get the path to the config file
pub fn get_config_path() -> Result<PathBuf> {
    let app_dir = get_app_data_dir()?;
    Ok(app_dir.join(CONFIG_FILE))
}

/// Get the application data directory
pub fn get_app_data_dir() -> Result<PathBuf> {
    let base = if cfg!(target_os = "macos") {
        dirs::home_dir().map(|h| h.join("Library").join("Application Support"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
    } else {
        // Linux/Unix: use XDG_DATA_HOME or ~/.local/share
        dirs::data_dir()
    };

    let base = base.context("Could not determine app data directory")?;
    let app_dir = base.join(APP_NAME);

    fs::create_dir_all(&app_dir)?;
    Ok(app_dir)
}
