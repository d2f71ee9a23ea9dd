//! Directory-tree index of an existing snapshot
//!
//! [`BackupTree`] answers "does relative path `p` exist in the base
//! snapshot?" in constant time while the incremental writer walks the
//! source. Entries are grouped by their containing directory: the key is
//! the parent directory relative to the snapshot root (the empty path for
//! top-level entries) and the value is the set of relative paths living
//! directly inside it.
//!
//! ```text
//! snapshot/                 key ""      -> {"a", "notes.txt"}
//! ├── a/                    key "a"     -> {"a/b", "a/x.txt"}
//! │   ├── b/                key "a/b"   -> {"a/b/y.txt"}
//! │   │   └── y.txt
//! │   └── x.txt
//! └── notes.txt
//! ```
//!
//! Every key and value is relative to the root the index was built from.
//! The index is rebuilt for every operation and never persisted.

use crate::collections::{PathMap, PathSet};
use crate::error::Result;
use crate::utils::make_relative;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};
use walkdir::WalkDir;

/// Lookup structure over one snapshot's directory tree
#[derive(Debug, Clone)]
pub struct BackupTree {
    root: PathBuf,
    dirs: PathMap<PathSet>,
    len: usize,
}

impl BackupTree {
    /// Index every entry under `snapshot_root`.
    ///
    /// The walk does not follow symbolic links; a link is indexed as an
    /// entry of its own. The root itself is not part of the index.
    ///
    /// # Errors
    ///
    /// Returns the first enumeration error. No partial index is returned.
    pub fn build(snapshot_root: &Path) -> Result<Self> {
        let mut tree = Self {
            root: snapshot_root.to_path_buf(),
            dirs: PathMap::default(),
            len: 0,
        };

        for entry in WalkDir::new(snapshot_root).min_depth(1).follow_links(false) {
            let entry = entry?;
            let relative = make_relative(entry.path(), snapshot_root)?;
            trace!("Indexed {}", relative.display());
            tree.insert(relative);
        }

        debug!(
            "Indexed {} entries in {} directories under {:?}",
            tree.len,
            tree.dirs.len(),
            snapshot_root
        );
        Ok(tree)
    }

    fn insert(&mut self, relative: PathBuf) {
        let key = parent_key(&relative).to_path_buf();
        if self.dirs.entry(key).or_default().insert(relative) {
            self.len += 1;
        }
    }

    /// Whether `relative` names an entry of the indexed snapshot
    pub fn contains(&self, relative: &Path) -> bool {
        self.dirs
            .get(parent_key(relative))
            .is_some_and(|children| children.contains(relative))
    }

    /// Relative paths of the entries directly inside directory `key`
    pub fn children(&self, key: &Path) -> Option<&PathSet> {
        self.dirs.get(key)
    }

    /// Directory keys that have at least one child
    pub fn keys(&self) -> impl Iterator<Item = &Path> + '_ {
        self.dirs.keys().map(PathBuf::as_path)
    }

    /// Root the index was built from
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of an indexed relative path
    pub fn resolve(&self, relative: &Path) -> PathBuf {
        self.root.join(relative)
    }

    /// Number of indexed entries
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the snapshot has no entries
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Key of the directory containing `relative`; empty for top-level entries
pub fn parent_key(relative: &Path) -> &Path {
    relative.parent().unwrap_or_else(|| Path::new(""))
}

/// Build the index of `snapshot_root`
pub fn build_index(snapshot_root: &Path) -> Result<BackupTree> {
    BackupTree::build(snapshot_root)
}
