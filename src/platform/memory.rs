use super::{DirEntry, FileMetadata, Platform, PlatformError, PlatformResult, VolumeInfo};
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Debug, Clone)]
enum Node {
    Dir { children: Vec<PathBuf> },
    File { content: Vec<u8> },
}

#[derive(Debug, Clone)]
struct Entry {
    node: Node,
    meta: FileMetadata,
}

/// In-memory [`Platform`].
///
/// Children are listed in insertion order. Listing, metadata and content
/// failures can be injected per path, and listings can be slowed down to
/// exercise cancellation and pool sizing.
#[derive(Debug, Default)]
pub struct MemoryPlatform {
    entries: RwLock<FxHashMap<PathBuf, Entry>>,
    volumes: RwLock<Vec<String>>,
    listing_failures: RwLock<FxHashMap<PathBuf, PlatformError>>,
    metadata_failures: RwLock<FxHashMap<PathBuf, PlatformError>>,
    content_failures: RwLock<FxHashMap<PathBuf, PlatformError>>,
    list_calls: Mutex<FxHashMap<PathBuf, usize>>,
    list_delay: RwLock<Option<Duration>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MemoryPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a volume and create its root directory.
    ///
    /// Registering the same mount point twice makes `list_volumes` report it
    /// twice, like a platform that sees the same device through two paths.
    pub fn add_volume(&self, mount_point: &str) -> &Self {
        self.add_dir(mount_point);
        self.volumes.write().push(mount_point.to_string());
        self
    }

    pub fn remove_volume(&self, mount_point: &str) {
        self.volumes.write().retain(|v| v != mount_point);
    }

    /// Create a directory, creating missing parents.
    pub fn add_dir(&self, path: impl AsRef<Path>) -> &Self {
        let path = path.as_ref();
        let mut entries = self.entries.write();
        Self::ensure_dir(&mut entries, path);
        self
    }

    /// Create (or replace) a file, creating missing parents.
    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) -> &Self {
        let path = path.as_ref();
        let content = content.into();
        let mut entries = self.entries.write();

        if let Some(parent) = path.parent() {
            Self::ensure_dir(&mut entries, parent);
            Self::link_child(&mut entries, parent, path);
        }

        let meta = FileMetadata {
            size_bytes: content.len() as u64,
            ..default_metadata()
        };
        entries.insert(
            path.to_path_buf(),
            Entry {
                node: Node::File { content },
                meta,
            },
        );
        self
    }

    /// Remove an entry and its subtree.
    pub fn remove(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut entries = self.entries.write();
        entries.retain(|p, _| !p.starts_with(path));
        if let Some(parent) = path.parent() {
            if let Some(Entry {
                node: Node::Dir { children },
                ..
            }) = entries.get_mut(parent)
            {
                children.retain(|c| c != path);
            }
        }
    }

    /// Adjust the metadata reported for an existing entry.
    pub fn set_metadata(&self, path: impl AsRef<Path>, update: impl FnOnce(&mut FileMetadata)) {
        if let Some(entry) = self.entries.write().get_mut(path.as_ref()) {
            update(&mut entry.meta);
        }
    }

    pub fn fail_listing(&self, path: impl AsRef<Path>, error: PlatformError) {
        self.listing_failures
            .write()
            .insert(path.as_ref().to_path_buf(), error);
    }

    pub fn fail_metadata(&self, path: impl AsRef<Path>, error: PlatformError) {
        self.metadata_failures
            .write()
            .insert(path.as_ref().to_path_buf(), error);
    }

    pub fn fail_content(&self, path: impl AsRef<Path>, error: PlatformError) {
        self.content_failures
            .write()
            .insert(path.as_ref().to_path_buf(), error);
    }

    /// Sleep this long inside every `list_children` call.
    pub fn set_list_delay(&self, delay: Option<Duration>) {
        *self.list_delay.write() = delay;
    }

    /// Number of `list_children` calls made for `path`.
    pub fn list_calls(&self, path: impl AsRef<Path>) -> usize {
        self.list_calls
            .lock()
            .get(path.as_ref())
            .copied()
            .unwrap_or(0)
    }

    pub fn total_list_calls(&self) -> usize {
        self.list_calls.lock().values().sum()
    }

    /// Highest number of `list_children` calls observed running at once.
    pub fn max_concurrent_listings(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn ensure_dir(entries: &mut FxHashMap<PathBuf, Entry>, path: &Path) {
        if entries.contains_key(path) {
            return;
        }
        if let Some(parent) = path.parent() {
            Self::ensure_dir(entries, parent);
            Self::link_child(entries, parent, path);
        }
        entries.insert(
            path.to_path_buf(),
            Entry {
                node: Node::Dir {
                    children: Vec::new(),
                },
                meta: default_metadata(),
            },
        );
    }

    fn link_child(entries: &mut FxHashMap<PathBuf, Entry>, parent: &Path, child: &Path) {
        if let Some(Entry {
            node: Node::Dir { children },
            ..
        }) = entries.get_mut(parent)
        {
            if !children.iter().any(|c| c == child) {
                children.push(child.to_path_buf());
            }
        }
    }
}

fn default_metadata() -> FileMetadata {
    FileMetadata {
        size_bytes: 0,
        modified_at: Some(Utc::now()),
        created_at: Some(Utc::now()),
        owner: Some("user".to_string()),
        is_symlink: false,
    }
}

/// Decrements the in-flight counter when a listing returns
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Platform for MemoryPlatform {
    fn list_children(&self, path: &Path) -> PlatformResult<Vec<DirEntry>> {
        *self.list_calls.lock().entry(path.to_path_buf()).or_insert(0) += 1;

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        let delay = *self.list_delay.read();
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }

        if let Some(err) = self.listing_failures.read().get(path) {
            return Err(err.clone());
        }

        let entries = self.entries.read();
        match entries.get(path) {
            Some(Entry {
                node: Node::Dir { children },
                ..
            }) => Ok(children
                .iter()
                .filter_map(|child| {
                    let entry = entries.get(child)?;
                    Some(DirEntry {
                        name: child
                            .file_name()
                            .map(|n| n.to_string_lossy().into_owned())
                            .unwrap_or_default(),
                        path: child.clone(),
                        is_dir: matches!(entry.node, Node::Dir { .. }),
                    })
                })
                .collect()),
            Some(_) => Err(PlatformError::Unreadable {
                path: path.to_path_buf(),
                message: "not a directory".to_string(),
            }),
            None => Err(PlatformError::PathNotFound(path.to_path_buf())),
        }
    }

    fn is_directory(&self, path: &Path) -> PlatformResult<bool> {
        match self.entries.read().get(path) {
            Some(entry) => Ok(matches!(entry.node, Node::Dir { .. })),
            None => Err(PlatformError::PathNotFound(path.to_path_buf())),
        }
    }

    fn list_volumes(&self) -> PlatformResult<Vec<VolumeInfo>> {
        Ok(self
            .volumes
            .read()
            .iter()
            .map(|mount_point| VolumeInfo {
                mount_point: mount_point.clone(),
            })
            .collect())
    }

    fn read_file_content(&self, path: &Path) -> PlatformResult<Box<dyn Read + Send>> {
        if let Some(err) = self.content_failures.read().get(path) {
            return Err(err.clone());
        }
        match self.entries.read().get(path) {
            Some(Entry {
                node: Node::File { content },
                ..
            }) => Ok(Box::new(Cursor::new(content.clone()))),
            Some(_) => Err(PlatformError::Unreadable {
                path: path.to_path_buf(),
                message: "is a directory".to_string(),
            }),
            None => Err(PlatformError::PathNotFound(path.to_path_buf())),
        }
    }

    fn file_metadata(&self, path: &Path) -> PlatformResult<FileMetadata> {
        if let Some(err) = self.metadata_failures.read().get(path) {
            return Err(err.clone());
        }
        self.entries
            .read()
            .get(path)
            .map(|entry| entry.meta.clone())
            .ok_or_else(|| PlatformError::PathNotFound(path.to_path_buf()))
    }
}
