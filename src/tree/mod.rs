//! Lazily expanded model of volumes and folders.
//!
//! The tree owns one cache slot per expanded path. A slot starts out
//! *unloaded*; the first [`FolderTree::expand`] fetches the listing from the
//! platform and every later call returns the same shared sequence until
//! [`FolderTree::invalidate`] reverts that one slot to unloaded.
//!
//! Slots that were loaded at least once stay in the map, keeping their
//! invalidation count, until their volume is unmounted; the map is bounded
//! by the directories that were successfully expanded. A failed first
//! expansion leaves no slot behind.
//!
//! ## Locking
//!
//! The path → slot map is behind a read-mostly lock that is only held long
//! enough to find or insert a slot. Each slot carries its own mutex, held for
//! the duration of an expansion or invalidation of that node, so two workers
//! expanding different folders never wait on each other.

pub mod volumes;

pub use volumes::{Volume, VolumeRegistry};

use crate::platform::{Platform, PlatformError};
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, thiserror::Error)]
pub enum TreeError {
    #[error("path not found: {0}")]
    NotFound(PathBuf),

    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error(transparent)]
    Platform(PlatformError),
}

impl From<PlatformError> for TreeError {
    fn from(err: PlatformError) -> Self {
        match err {
            PlatformError::PathNotFound(path) => TreeError::NotFound(path),
            other => TreeError::Platform(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, TreeError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    Directory,
    File,
}

/// Read-only view of one entry in the tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderNode {
    pub name: String,
    pub path: PathBuf,
    pub kind: NodeKind,
}

impl FolderNode {
    pub fn is_dir(&self) -> bool {
        self.kind == NodeKind::Directory
    }
}

#[derive(Debug, Default)]
enum Children {
    #[default]
    Unloaded,
    Loaded(Arc<[FolderNode]>),
}

#[derive(Debug, Default)]
struct SlotState {
    children: Children,
    /// Completed invalidations of this node
    generation: u64,
}

#[derive(Debug, Default)]
struct NodeSlot {
    state: Mutex<SlotState>,
}

/// Per-path cache of directory listings on top of a [`VolumeRegistry`]
pub struct FolderTree {
    platform: Arc<dyn Platform>,
    registry: RwLock<VolumeRegistry>,
    slots: RwLock<FxHashMap<PathBuf, Arc<NodeSlot>>>,
}

impl FolderTree {
    /// Build a tree over the volumes the platform currently reports.
    pub fn new(platform: Arc<dyn Platform>) -> Result<Self> {
        let registry = VolumeRegistry::discover(platform.as_ref())?;
        debug!(volumes = registry.len(), "folder tree created");
        Ok(Self {
            platform,
            registry: RwLock::new(registry),
            slots: RwLock::new(FxHashMap::default()),
        })
    }

    pub fn platform(&self) -> &Arc<dyn Platform> {
        &self.platform
    }

    pub fn volumes(&self) -> Vec<Volume> {
        self.registry.read().iter().cloned().collect()
    }

    /// Re-enumerate volumes. Caches of volumes that are still mounted are
    /// kept; caches under vanished mount points are dropped.
    pub fn refresh_volumes(&self) -> Result<()> {
        let fresh = VolumeRegistry::discover(self.platform.as_ref())?;
        let mut registry = self.registry.write();

        let removed: Vec<PathBuf> = registry.removed_in(&fresh).map(|v| v.root.path.clone()).collect();
        if !removed.is_empty() {
            let mut slots = self.slots.write();
            slots.retain(|path, _| {
                // A path stays if a remaining volume still owns it
                !removed.iter().any(|root| path.starts_with(root)) || fresh.owner_of(path).is_some()
            });
            debug!(removed = removed.len(), "dropped caches of unmounted volumes");
        }

        *registry = fresh;
        Ok(())
    }

    /// Children of the directory at `path`, fetched on first use.
    pub fn expand(&self, path: &Path) -> Result<Arc<[FolderNode]>> {
        self.ensure_owned(path)?;
        let slot = self.slot(path);
        let mut state = slot.state.lock();

        if let Children::Loaded(children) = &state.children {
            debug!(path = %path.display(), "expand: cached");
            return Ok(Arc::clone(children));
        }

        let children = match self.fetch(path) {
            Ok(children) => children,
            Err(err) => {
                let never_loaded = state.generation == 0;
                drop(state);
                if never_loaded {
                    self.release(path, &slot);
                }
                return Err(err);
            }
        };
        state.children = Children::Loaded(Arc::clone(&children));
        Ok(children)
    }

    /// Drop the cached children of `path` (not of its descendants).
    ///
    /// Returns whether anything was cached.
    pub fn invalidate(&self, path: &Path) -> Result<bool> {
        self.ensure_owned(path)?;
        let Some(slot) = self.slots.read().get(path).cloned() else {
            return Ok(false);
        };

        let mut state = slot.state.lock();
        let was_loaded = matches!(state.children, Children::Loaded(_));
        if was_loaded {
            state.children = Children::Unloaded;
            state.generation += 1;
            debug!(path = %path.display(), generation = state.generation, "invalidated");
        }
        Ok(was_loaded)
    }

    /// Invalidate and expand `path` under one hold of its slot, so no other
    /// caller can observe the unloaded state in between.
    pub fn reload(&self, path: &Path) -> Result<Arc<[FolderNode]>> {
        self.ensure_owned(path)?;
        let slot = self.slot(path);
        let mut state = slot.state.lock();

        if matches!(state.children, Children::Loaded(_)) {
            state.children = Children::Unloaded;
            state.generation += 1;
        }

        let children = self.fetch(path)?;
        state.children = Children::Loaded(Arc::clone(&children));
        Ok(children)
    }

    pub fn is_loaded(&self, path: &Path) -> bool {
        self.slots
            .read()
            .get(path)
            .map(|slot| matches!(slot.state.lock().children, Children::Loaded(_)))
            .unwrap_or(false)
    }

    /// How many times the cached children of `path` were invalidated.
    pub fn generation(&self, path: &Path) -> u64 {
        self.slots
            .read()
            .get(path)
            .map(|slot| slot.state.lock().generation)
            .unwrap_or(0)
    }

    /// Look up a single node.
    pub fn node(&self, path: &Path) -> Result<FolderNode> {
        if let Some(volume) = self.registry.read().iter().find(|v| v.root.path == path) {
            return Ok(volume.root.clone());
        }
        self.ensure_owned(path)?;

        let is_dir = self.platform.is_directory(path)?;
        Ok(FolderNode {
            name: display_name(path),
            path: path.to_path_buf(),
            kind: if is_dir {
                NodeKind::Directory
            } else {
                NodeKind::File
            },
        })
    }

    fn ensure_owned(&self, path: &Path) -> Result<()> {
        if self.registry.read().owner_of(path).is_none() {
            return Err(TreeError::NotFound(path.to_path_buf()));
        }
        Ok(())
    }

    fn slot(&self, path: &Path) -> Arc<NodeSlot> {
        if let Some(slot) = self.slots.read().get(path) {
            return Arc::clone(slot);
        }
        let mut slots = self.slots.write();
        Arc::clone(slots.entry(path.to_path_buf()).or_default())
    }

    /// Number of paths holding a cache slot.
    pub fn tracked(&self) -> usize {
        self.slots.read().len()
    }

    /// Forget the slot of `path` if it never held a listing and no other
    /// caller is using it.
    fn release(&self, path: &Path, slot: &Arc<NodeSlot>) {
        let mut slots = self.slots.write();
        let Some(held) = slots.get(path) else {
            return;
        };
        // One reference from the map, one from the caller
        if !Arc::ptr_eq(held, slot) || Arc::strong_count(slot) > 2 {
            return;
        }
        let state = slot.state.lock();
        if matches!(state.children, Children::Unloaded) && state.generation == 0 {
            drop(state);
            slots.remove(path);
            debug!(path = %path.display(), "released unused slot");
        }
    }

    fn fetch(&self, path: &Path) -> Result<Arc<[FolderNode]>> {
        if !self.platform.is_directory(path)? {
            return Err(TreeError::NotADirectory(path.to_path_buf()));
        }

        let entries = self.platform.list_children(path)?;
        debug!(path = %path.display(), children = entries.len(), "expand: fetched");

        let nodes: Vec<FolderNode> = entries
            .into_iter()
            .map(|entry| FolderNode {
                name: entry.name,
                path: entry.path,
                kind: if entry.is_dir {
                    NodeKind::Directory
                } else {
                    NodeKind::File
                },
            })
            .collect();
        Ok(Arc::from(nodes))
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::MemoryPlatform;

    fn sample() -> (Arc<MemoryPlatform>, FolderTree) {
        let platform = Arc::new(MemoryPlatform::new());
        platform.add_volume("/vol");
        platform.add_file("/vol/docs/a.txt", "alpha");
        platform.add_file("/vol/docs/b.txt", "beta");
        platform.add_dir("/vol/music");
        let tree = FolderTree::new(platform.clone()).unwrap();
        (platform, tree)
    }

    #[test]
    fn test_expand_is_lazy_and_cached() {
        let (platform, tree) = sample();
        assert!(!tree.is_loaded(Path::new("/vol/docs")));
        assert_eq!(platform.list_calls("/vol/docs"), 0);

        let first = tree.expand(Path::new("/vol/docs")).unwrap();
        let second = tree.expand(Path::new("/vol/docs")).unwrap();

        assert_eq!(first, second);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(platform.list_calls("/vol/docs"), 1);
    }

    #[test]
    fn test_invalidate_refetches_and_replaces() {
        let (platform, tree) = sample();
        tree.expand(Path::new("/vol/docs")).unwrap();

        platform.remove("/vol/docs/a.txt");
        platform.add_file("/vol/docs/c.txt", "gamma");

        // Still the cached listing
        let cached = tree.expand(Path::new("/vol/docs")).unwrap();
        assert_eq!(cached.len(), 2);
        assert_eq!(cached[0].name, "a.txt");

        assert!(tree.invalidate(Path::new("/vol/docs")).unwrap());
        assert!(!tree.is_loaded(Path::new("/vol/docs")));
        assert_eq!(tree.generation(Path::new("/vol/docs")), 1);

        let fresh = tree.expand(Path::new("/vol/docs")).unwrap();
        let names: Vec<_> = fresh.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["b.txt", "c.txt"]);
        assert_eq!(platform.list_calls("/vol/docs"), 2);
    }

    #[test]
    fn test_invalidate_only_touches_one_node() {
        let (_platform, tree) = sample();
        tree.expand(Path::new("/vol")).unwrap();
        tree.expand(Path::new("/vol/docs")).unwrap();

        tree.invalidate(Path::new("/vol")).unwrap();

        assert!(!tree.is_loaded(Path::new("/vol")));
        assert!(tree.is_loaded(Path::new("/vol/docs")));
    }

    #[test]
    fn test_expand_errors() {
        let (_platform, tree) = sample();

        assert!(matches!(
            tree.expand(Path::new("/elsewhere")),
            Err(TreeError::NotFound(_))
        ));
        assert!(matches!(
            tree.expand(Path::new("/vol/missing")),
            Err(TreeError::NotFound(_))
        ));
        assert!(matches!(
            tree.expand(Path::new("/vol/docs/a.txt")),
            Err(TreeError::NotADirectory(_))
        ));
    }

    #[test]
    fn test_permission_error_is_not_cached() {
        let (platform, tree) = sample();
        platform.fail_listing(
            "/vol/music",
            PlatformError::PermissionDenied(PathBuf::from("/vol/music")),
        );

        assert!(matches!(
            tree.expand(Path::new("/vol/music")),
            Err(TreeError::Platform(PlatformError::PermissionDenied(_)))
        ));
        assert!(!tree.is_loaded(Path::new("/vol/music")));
    }

    #[test]
    fn test_failed_expansions_leave_no_slots() {
        let (platform, tree) = sample();
        platform.fail_listing(
            "/vol/music",
            PlatformError::PermissionDenied(PathBuf::from("/vol/music")),
        );

        for path in ["/vol/music", "/vol/missing", "/vol/docs/a.txt"] {
            assert!(tree.expand(Path::new(path)).is_err());
        }
        assert_eq!(tree.tracked(), 0);

        tree.expand(Path::new("/vol/docs")).unwrap();
        assert_eq!(tree.tracked(), 1);

        // An invalidated slot keeps its count even if the refetch fails
        tree.invalidate(Path::new("/vol/docs")).unwrap();
        platform.fail_listing(
            "/vol/docs",
            PlatformError::PermissionDenied(PathBuf::from("/vol/docs")),
        );
        assert!(tree.expand(Path::new("/vol/docs")).is_err());
        assert_eq!(tree.tracked(), 1);
        assert_eq!(tree.generation(Path::new("/vol/docs")), 1);
    }

    #[test]
    fn test_node_lookup() {
        let (_platform, tree) = sample();
        let root = tree.node(Path::new("/vol")).unwrap();
        assert_eq!(root.name, "/vol");
        assert!(root.is_dir());

        let file = tree.node(Path::new("/vol/docs/b.txt")).unwrap();
        assert_eq!(file.name, "b.txt");
        assert_eq!(file.kind, NodeKind::File);
    }

    #[test]
    fn test_refresh_volumes_drops_unmounted_caches() {
        let platform = Arc::new(MemoryPlatform::new());
        platform.add_volume("/a");
        platform.add_volume("/b");
        platform.add_dir("/b/x");
        let tree = FolderTree::new(platform.clone()).unwrap();
        tree.expand(Path::new("/a")).unwrap();
        tree.expand(Path::new("/b")).unwrap();

        platform.remove_volume("/b");
        tree.refresh_volumes().unwrap();

        assert_eq!(tree.volumes().len(), 1);
        assert!(tree.is_loaded(Path::new("/a")));
        assert!(!tree.is_loaded(Path::new("/b")));
        assert!(matches!(
            tree.expand(Path::new("/b")),
            Err(TreeError::NotFound(_))
        ));
    }

    #[test]
    fn test_concurrent_expand_fetches_once() {
        let (platform, tree) = sample();
        platform.set_list_delay(Some(std::time::Duration::from_millis(20)));
        let tree = Arc::new(tree);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let tree = Arc::clone(&tree);
                std::thread::spawn(move || tree.expand(Path::new("/vol/docs")).unwrap().len())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), 2);
        }
        assert_eq!(platform.list_calls("/vol/docs"), 1);
    }
}
