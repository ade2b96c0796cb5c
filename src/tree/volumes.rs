use super::{FolderNode, NodeKind};
use crate::platform::{Platform, PlatformResult};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::warn;

/// A mounted storage volume and the root node of its tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Volume {
    pub mount_point: String,
    pub root: FolderNode,
}

impl Volume {
    fn new(mount_point: String) -> Self {
        let path = PathBuf::from(&mount_point);
        Self {
            root: FolderNode {
                name: mount_point.clone(),
                path,
                kind: NodeKind::Directory,
            },
            mount_point,
        }
    }

    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.root.path)
    }
}

/// Volumes keyed by mount point.
///
/// A mount point appears at most once; when the platform reports the same
/// mount point twice the first report wins.
#[derive(Debug, Default, Clone)]
pub struct VolumeRegistry {
    volumes: BTreeMap<String, Volume>,
}

impl VolumeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enumerate volumes from the platform.
    pub fn discover(platform: &dyn Platform) -> PlatformResult<Self> {
        let mut volumes = BTreeMap::new();
        for info in platform.list_volumes()? {
            if volumes.contains_key(&info.mount_point) {
                warn!(mount_point = %info.mount_point, "duplicate mount point ignored");
                continue;
            }
            volumes.insert(info.mount_point.clone(), Volume::new(info.mount_point));
        }
        Ok(Self { volumes })
    }

    pub fn get(&self, mount_point: &str) -> Option<&Volume> {
        self.volumes.get(mount_point)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Volume> {
        self.volumes.values()
    }

    pub fn len(&self) -> usize {
        self.volumes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }

    /// The volume owning `path`: the one with the longest matching mount point.
    pub fn owner_of(&self, path: &Path) -> Option<&Volume> {
        self.volumes
            .values()
            .filter(|v| v.contains(path))
            .max_by_key(|v| v.root.path.components().count())
    }

    /// Mount points present in `self` but not in `newer`.
    pub fn removed_in<'a>(&'a self, newer: &'a VolumeRegistry) -> impl Iterator<Item = &'a Volume> {
        self.volumes
            .values()
            .filter(move |v| !newer.volumes.contains_key(&v.mount_point))
    }
}
