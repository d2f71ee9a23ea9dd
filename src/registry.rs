//! Bookkeeping for full snapshots
//!
//! Two small facts need to survive between runs:
//!
//! 1. **Which snapshot is the latest full one** for a backup root. The
//!    filesystem registry keeps this as a single-value file inside the
//!    backup root, overwritten every time a new full snapshot is taken.
//! 2. **Whether a directory is a full snapshot.** A full snapshot carries an
//!    empty marker file; its presence is the whole answer.
//!
//! Both live behind the [`SnapshotRegistry`] trait so the engine receives an
//! explicit store handle instead of touching ambient state. [`FsRegistry`]
//! is the on-disk implementation used by the command-line tools;
//! [`MemoryRegistry`] keeps everything in memory for tests.

use crate::error::{IoResultExt, Result, SnapError};
use crate::snapshot::{Snapshot, SnapshotId, SnapshotKind};
use crate::utils::atomic_write;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Default name of the marker file inside full snapshots
pub const DEFAULT_MARKER_NAME: &str = ".full_backup";

/// Default name of the latest-full-snapshot file inside a backup root
pub const DEFAULT_REGISTRY_NAME: &str = ".latest_full_backup";

/// Store answering "which snapshot is the latest full one" and "is this a
/// full snapshot".
///
/// Implementations must treat absence as a normal answer: a missing marker
/// is `Ok(false)` and a missing registry entry is `Ok(None)`. Only genuine
/// I/O failures become errors.
pub trait SnapshotRegistry: Send + Sync {
    /// Whether `dir` carries the full-snapshot marker
    fn is_full_snapshot(&self, dir: &Path) -> Result<bool>;

    /// The latest full snapshot recorded for `backup_root`, if any
    fn latest_full_snapshot(&self, backup_root: &Path) -> Result<Option<Snapshot>>;

    /// Overwrite the latest-full entry of `backup_root` with `snapshot`
    fn record_latest_full_snapshot(&self, backup_root: &Path, snapshot: &Snapshot) -> Result<()>;

    /// Mark `dir` as a full snapshot (idempotent)
    fn mark_full(&self, dir: &Path) -> Result<()>;

    /// Remove the full-snapshot marker from `dir`; a no-op when absent
    fn unmark_full(&self, dir: &Path) -> Result<()>;
}

/// File names used by [`FsRegistry`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryLayout {
    /// Marker file placed inside full snapshots
    pub marker_name: String,
    /// Single-value file inside the backup root
    pub registry_name: String,
}

impl Default for RegistryLayout {
    fn default() -> Self {
        Self {
            marker_name: DEFAULT_MARKER_NAME.to_string(),
            registry_name: DEFAULT_REGISTRY_NAME.to_string(),
        }
    }
}

/// Registry persisted as plain files next to the snapshots
#[derive(Debug, Clone, Default)]
pub struct FsRegistry {
    layout: RegistryLayout,
}

impl FsRegistry {
    /// Registry using the default file names
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry using custom file names
    pub fn with_layout(layout: RegistryLayout) -> Result<Self> {
        for name in [&layout.marker_name, &layout.registry_name] {
            if name.is_empty() || name.contains(std::path::is_separator) {
                return Err(SnapError::InvalidConfiguration(format!(
                    "registry file name {:?} must be a single non-empty path component",
                    name
                )));
            }
        }
        Ok(Self { layout })
    }

    /// File names in use
    pub fn layout(&self) -> &RegistryLayout {
        &self.layout
    }

    fn marker_path(&self, dir: &Path) -> PathBuf {
        dir.join(&self.layout.marker_name)
    }

    fn registry_path(&self, backup_root: &Path) -> PathBuf {
        backup_root.join(&self.layout.registry_name)
    }
}

impl SnapshotRegistry for FsRegistry {
    fn is_full_snapshot(&self, dir: &Path) -> Result<bool> {
        let marker = self.marker_path(dir);
        match fs::symlink_metadata(&marker) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(SnapError::io(marker, e)),
        }
    }

    fn latest_full_snapshot(&self, backup_root: &Path) -> Result<Option<Snapshot>> {
        let path = self.registry_path(backup_root);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                trace!("No registry entry at {:?}", path);
                return Ok(None);
            }
            Err(e) => return Err(SnapError::io(path, e)),
        };

        // Older registries stored the whole snapshot path; keep the last component.
        let value = content.trim();
        let name = Path::new(value).file_name().map(|n| n.to_string_lossy().into_owned());
        Ok(name.map(|name| Snapshot::in_root(backup_root, SnapshotId::new(name), SnapshotKind::Full)))
    }

    fn record_latest_full_snapshot(&self, backup_root: &Path, snapshot: &Snapshot) -> Result<()> {
        let path = self.registry_path(backup_root);
        atomic_write(&path, snapshot.id.as_str().as_bytes())?;
        debug!("Recorded {} as latest full snapshot of {:?}", snapshot.id, backup_root);
        Ok(())
    }

    fn mark_full(&self, dir: &Path) -> Result<()> {
        let marker = self.marker_path(dir);
        fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&marker)
            .at(&marker)?;
        Ok(())
    }

    fn unmark_full(&self, dir: &Path) -> Result<()> {
        let marker = self.marker_path(dir);
        match fs::remove_file(&marker) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SnapError::io(marker, e)),
        }
    }
}

/// Registry kept entirely in memory.
///
/// Marks are tracked by path, so copying a marked directory does not carry
/// the mark along. Use it where tests need to control or inspect registry
/// state without marker files appearing in snapshot trees.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    full: Mutex<HashSet<PathBuf>>,
    latest: Mutex<HashMap<PathBuf, SnapshotId>>,
}

impl MemoryRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Every directory currently marked full
    pub fn marked(&self) -> Vec<PathBuf> {
        let mut marked: Vec<_> = self.full.lock().iter().cloned().collect();
        marked.sort();
        marked
    }
}

impl SnapshotRegistry for MemoryRegistry {
    fn is_full_snapshot(&self, dir: &Path) -> Result<bool> {
        Ok(self.full.lock().contains(dir))
    }

    fn latest_full_snapshot(&self, backup_root: &Path) -> Result<Option<Snapshot>> {
        Ok(self
            .latest
            .lock()
            .get(backup_root)
            .map(|id| Snapshot::in_root(backup_root, id.clone(), SnapshotKind::Full)))
    }

    fn record_latest_full_snapshot(&self, backup_root: &Path, snapshot: &Snapshot) -> Result<()> {
        self.latest
            .lock()
            .insert(backup_root.to_path_buf(), snapshot.id.clone());
        Ok(())
    }

    fn mark_full(&self, dir: &Path) -> Result<()> {
        self.full.lock().insert(dir.to_path_buf());
        Ok(())
    }

    fn unmark_full(&self, dir: &Path) -> Result<()> {
        self.full.lock().remove(dir);
        Ok(())
    }
}
