//! Index-backed name lookup.
//!
//! Maintaining an index is someone else's job; the search side only needs
//! [`NameIndex`] to answer "which paths could match this pattern" and
//! [`IndexProvider`] to find the index covering a search root.
//! [`InvertedNameIndex`] is a small in-memory implementation built by walking
//! a [`FolderTree`].

use crate::tree::{self, FolderTree};
use crate::utils::{name_tokens, tokenize_query};
use roaring::RoaringBitmap;
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Query side of a precomputed name index
pub trait NameIndex: Send + Sync {
    /// Whether the index holds every entry under `scope`
    fn covers(&self, scope: &Path) -> bool;

    /// Paths whose names match `pattern`
    fn lookup(&self, pattern: &str) -> Vec<PathBuf>;
}

/// Source of indexes by search scope
pub trait IndexProvider: Send + Sync {
    fn index_for(&self, scope: &Path) -> Option<Arc<dyn NameIndex>>;
}

/// Providers over a fixed list of indexes
impl IndexProvider for Vec<Arc<dyn NameIndex>> {
    fn index_for(&self, scope: &Path) -> Option<Arc<dyn NameIndex>> {
        self.iter().find(|index| index.covers(scope)).cloned()
    }
}

/// Token → path postings over roaring bitmaps.
///
/// A lookup tokenizes the pattern the same way names were tokenized and
/// intersects the postings, so `"user report"` finds `UserReport.pdf` and
/// `report_for_user.txt` but not `user.txt`.
#[derive(Debug, Default)]
pub struct InvertedNameIndex {
    root: PathBuf,
    paths: Vec<PathBuf>,
    postings: FxHashMap<String, RoaringBitmap>,
}

impl InvertedNameIndex {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Index every entry under `root`, expanding the tree as needed.
    ///
    /// Directories that cannot be listed are skipped, so the index may be
    /// incomplete on a partially readable tree.
    pub fn build(tree: &FolderTree, root: &Path) -> tree::Result<Self> {
        let mut index = Self::new(root);
        let mut stack = vec![root.to_path_buf()];

        while let Some(dir) = stack.pop() {
            let children = match tree.expand(&dir) {
                Ok(children) => children,
                Err(err) if dir != root => {
                    debug!(path = %dir.display(), error = %err, "index: skipped");
                    continue;
                }
                Err(err) => return Err(err),
            };
            for child in children.iter().rev() {
                index.insert(&child.path, &child.name);
                if child.is_dir() {
                    stack.push(child.path.clone());
                }
            }
        }

        debug!(root = %root.display(), entries = index.len(), tokens = index.postings.len(), "name index built");
        Ok(index)
    }

    pub fn insert(&mut self, path: &Path, name: &str) {
        let id = self.paths.len() as u32;
        self.paths.push(path.to_path_buf());
        for token in name_tokens(name) {
            self.postings.entry(token).or_default().insert(id);
        }
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl NameIndex for InvertedNameIndex {
    fn covers(&self, scope: &Path) -> bool {
        scope.starts_with(&self.root)
    }

    fn lookup(&self, pattern: &str) -> Vec<PathBuf> {
        let tokens = tokenize_query(pattern);
        let mut postings = Vec::with_capacity(tokens.len());
        for token in &tokens {
            match self.postings.get(token) {
                Some(bitmap) => postings.push(bitmap),
                None => return Vec::new(),
            }
        }
        // Smallest first keeps the intersection cheap
        postings.sort_by_key(|bitmap| bitmap.len());

        let Some((first, rest)) = postings.split_first() else {
            return Vec::new();
        };
        let mut hits = (*first).clone();
        for bitmap in rest {
            hits &= *bitmap;
        }

        hits.iter().map(|id| self.paths[id as usize].clone()).collect()
    }
}
