//! Named search presets.
//!
//! A [`SlotStore`] keeps an ordered list of `(name, SearchConfig)` pairs in a
//! single JSON file:
//!
//! ```json
//! { "version": 1, "slots": [ { "name": "photos", "config": { ... } } ] }
//! ```
//!
//! Every mutation rewrites the whole file with
//! [`write_atomic`](crate::utils::write_atomic), so a crash leaves either
//! the old or the new contents on disk.

use crate::config::SearchConfig;
use crate::utils::write_atomic;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const SLOTS_FILE: &str = "slots.json";
const STORE_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum SlotError {
    #[error("slot name is empty")]
    EmptyName,

    #[error("no slot named '{0}'")]
    NotFound(String),

    #[error("slot store I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("slot store {path} is corrupt: {message}")]
    Corrupt { path: PathBuf, message: String },
}

pub type Result<T> = std::result::Result<T, SlotError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub name: String,
    pub config: SearchConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoreFile {
    version: u32,
    slots: Vec<Slot>,
}

/// Durable, ordered collection of named [`SearchConfig`]s
#[derive(Debug)]
pub struct SlotStore {
    path: PathBuf,
    slots: Mutex<Vec<Slot>>,
}

impl SlotStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let slots = match fs::read_to_string(&path) {
            Ok(content) => parse_store(&path, &content)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), slots = slots.len(), "slot store opened");
        Ok(Self {
            path,
            slots: Mutex::new(slots),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Store a copy of `config` under `name`.
    ///
    /// Saving over an existing name replaces its config and keeps its position.
    pub fn save(&self, name: &str, config: &SearchConfig) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SlotError::EmptyName);
        }

        let mut slots = self.slots.lock();
        let mut next = slots.clone();
        match next.iter_mut().find(|slot| slot.name == name) {
            Some(slot) => slot.config = config.clone(),
            None => next.push(Slot {
                name: name.to_string(),
                config: config.clone(),
            }),
        }

        self.persist(&next)?;
        *slots = next;
        debug!(slot = name, "slot saved");
        Ok(())
    }

    /// A copy of the config saved under `name`.
    pub fn load(&self, name: &str) -> Result<SearchConfig> {
        self.slots
            .lock()
            .iter()
            .find(|slot| slot.name == name.trim())
            .map(|slot| slot.config.clone())
            .ok_or_else(|| SlotError::NotFound(name.to_string()))
    }

    pub fn delete(&self, name: &str) -> Result<()> {
        let mut slots = self.slots.lock();
        let Some(index) = slots.iter().position(|slot| slot.name == name.trim()) else {
            return Err(SlotError::NotFound(name.to_string()));
        };

        let mut next = slots.clone();
        next.remove(index);
        self.persist(&next)?;
        *slots = next;
        debug!(slot = name, "slot deleted");
        Ok(())
    }

    /// Slot names in the order they were first saved.
    pub fn list(&self) -> Vec<String> {
        self.slots.lock().iter().map(|slot| slot.name.clone()).collect()
    }

    fn persist(&self, slots: &[Slot]) -> Result<()> {
        let file = StoreFile {
            version: STORE_VERSION,
            slots: slots.to_vec(),
        };
        let content = serde_json::to_vec_pretty(&file).map_err(io::Error::other)?;
        write_atomic(&self.path, &content)?;
        Ok(())
    }
}

fn parse_store(path: &Path, content: &str) -> Result<Vec<Slot>> {
    let corrupt = |message: String| SlotError::Corrupt {
        path: path.to_path_buf(),
        message,
    };

    let file: StoreFile = serde_json::from_str(content).map_err(|e| corrupt(e.to_string()))?;
    if file.version != STORE_VERSION {
        return Err(corrupt(format!("unsupported version {}", file.version)));
    }
    for (i, slot) in file.slots.iter().enumerate() {
        if slot.name.trim().is_empty() {
            return Err(corrupt(format!("slot {} has an empty name", i)));
        }
        if file.slots[..i].iter().any(|other| other.name == slot.name) {
            return Err(corrupt(format!("duplicate slot '{}'", slot.name)));
        }
    }
    Ok(file.slots)
}
