//! JSON run log written when `logging` is enabled.

use super::executor::{RunState, UnitFailure};
use crate::config::SearchConfig;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

const FILENAME_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

#[derive(Debug, Serialize)]
struct LoggedFailure {
    unit: usize,
    path: PathBuf,
    error: String,
}

#[derive(Debug, Serialize)]
pub struct RunLog<'a> {
    pattern: &'a str,
    config: &'a SearchConfig,
    root: &'a Path,
    state: RunState,
    started_at: DateTime<Local>,
    finished_at: DateTime<Local>,
    duration_secs: f64,
    results_count: usize,
    results: &'a [PathBuf],
    failures: Vec<LoggedFailure>,
}

impl<'a> RunLog<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: &'a SearchConfig,
        root: &'a Path,
        state: RunState,
        started_at: DateTime<Local>,
        elapsed: Duration,
        results: &'a [PathBuf],
        failures: &[UnitFailure],
    ) -> Self {
        let finished_at = started_at
            + chrono::Duration::from_std(elapsed).unwrap_or_else(|_| chrono::Duration::zero());
        Self {
            pattern: config.matching.pattern(),
            config,
            root,
            state,
            started_at,
            finished_at,
            duration_secs: elapsed.as_secs_f64(),
            results_count: results.len(),
            results,
            failures: failures
                .iter()
                .map(|f| LoggedFailure {
                    unit: f.unit,
                    path: f.error.path().to_path_buf(),
                    error: f.error.to_string(),
                })
                .collect(),
        }
    }

    /// Write the log as `<dir>/<start timestamp>_log.json`.
    ///
    /// Runs started within the same second get a numeric suffix instead of
    /// overwriting each other.
    pub fn write_to(&self, dir: &Path) -> io::Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let stamp = self.started_at.format(FILENAME_FORMAT).to_string();
        let data = serde_json::to_vec_pretty(self).map_err(io::Error::other)?;

        let mut attempt = 0u32;
        loop {
            let name = if attempt == 0 {
                format!("{}_log.json", stamp)
            } else {
                format!("{}_{}_log.json", stamp, attempt)
            };
            let path = dir.join(name);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    file.write_all(&data)?;
                    return Ok(path);
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => return Err(e),
            }
        }
    }
}
