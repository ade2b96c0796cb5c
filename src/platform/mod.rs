//! Filesystem collaborator.
//!
//! Everything the search core knows about the operating system goes through
//! the [`Platform`] trait: directory listings, metadata, file content and the
//! set of mounted volumes. Two implementations ship with the crate:
//!
//! - [`LocalPlatform`] - backed by `std::fs`
//! - [`MemoryPlatform`] - an in-memory tree with failure injection, used by
//!   tests and benchmarks

pub mod local;
pub mod memory;

pub use local::LocalPlatform;
pub use memory::MemoryPlatform;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::{Path, PathBuf};

/// Failure kinds reported by a [`Platform`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlatformError {
    #[error("path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    #[error("unreadable: {path}: {message}")]
    Unreadable { path: PathBuf, message: String },
}

impl PlatformError {
    /// Map an io error for `path` onto the collaborator taxonomy.
    pub fn from_io(path: &Path, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => PlatformError::PathNotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => {
                PlatformError::PermissionDenied(path.to_path_buf())
            }
            _ => PlatformError::Unreadable {
                path: path.to_path_buf(),
                message: err.to_string(),
            },
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            PlatformError::PathNotFound(p) | PlatformError::PermissionDenied(p) => p,
            PlatformError::Unreadable { path, .. } => path,
        }
    }
}

pub type PlatformResult<T> = std::result::Result<T, PlatformError>;

/// One entry of a directory listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    pub name: String,
    pub path: PathBuf,
    pub is_dir: bool,
}

/// A mounted storage volume
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeInfo {
    pub mount_point: String,
}

/// Metadata used by the property filters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    pub size_bytes: u64,
    pub modified_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub owner: Option<String>,
    pub is_symlink: bool,
}

/// The operating-system surface consumed by the tree and the executor.
///
/// Implementations must be callable from several worker threads at once.
pub trait Platform: Send + Sync {
    /// List the direct children of a directory, in the platform's order.
    fn list_children(&self, path: &Path) -> PlatformResult<Vec<DirEntry>>;

    fn is_directory(&self, path: &Path) -> PlatformResult<bool>;

    fn list_volumes(&self) -> PlatformResult<Vec<VolumeInfo>>;

    /// Open a file for content search.
    fn read_file_content(&self, path: &Path) -> PlatformResult<Box<dyn Read + Send>>;

    fn file_metadata(&self, path: &Path) -> PlatformResult<FileMetadata>;
}
