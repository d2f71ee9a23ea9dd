//! Snapshot identifiers, kinds and backup-root layout
//!
//! A snapshot is a plain directory that lives directly inside a backup root.
//! Its name is its identifier: a zero-padded UTC timestamp of the form
//! `YYYY-MM-DD_HH-MM-SS`. Because every field is fixed width, comparing two
//! identifiers as strings gives the same answer as comparing the instants
//! they encode, and restore relies on that to find the nearest preceding
//! full snapshot. Local wall time would break this when clocks fall back
//! and an hour repeats, so [`system_clock`] reads UTC.
//!
//! ```text
//! backup_root/
//! ├── .latest_full_backup        # registry entry: id of the latest full snapshot
//! ├── 2024-03-01_09-00-00/       # full snapshot
//! │   ├── .full_backup           # marker: presence means "full"
//! │   └── ...
//! └── 2024-03-02_09-00-00/       # incremental snapshot (changed entries only)
//!     └── ...
//! ```
//!
//! ## Examples
//!
//! ```rust
//! use snapchain::snapshot::SnapshotId;
//! use chrono::NaiveDate;
//!
//! let t = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(9, 5, 0).unwrap();
//! let id = SnapshotId::from_datetime(t);
//! assert_eq!(id.as_str(), "2024-03-01_09-05-00");
//! assert_eq!(id.timestamp(), Some(t));
//! ```

use crate::error::{IoResultExt, Result, SnapError};
use crate::registry::SnapshotRegistry;
use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// strftime pattern for snapshot identifiers
pub const ID_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Source of "now" used to name new snapshots
pub type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

/// Clock reading the current UTC time
pub fn system_clock() -> Clock {
    Arc::new(|| Utc::now().naive_utc())
}

/// Identifier of a snapshot, equal to its directory name
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotId(String);

impl SnapshotId {
    /// Wrap an existing directory name
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Identifier for a snapshot taken at `time`
    pub fn from_datetime(time: NaiveDateTime) -> Self {
        Self(time.format(ID_FORMAT).to_string())
    }

    /// Identifier of the snapshot stored at `dir`
    pub fn of_dir(dir: &Path) -> Result<Self> {
        dir.file_name()
            .map(|name| Self(name.to_string_lossy().into_owned()))
            .ok_or_else(|| SnapError::not_found(format!("{:?} has no directory name", dir)))
    }

    /// The identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse the identifier back into the instant it encodes.
    ///
    /// Returns `None` for directory names that were not produced by
    /// [`SnapshotId::from_datetime`].
    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.0, ID_FORMAT).ok()
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether a snapshot is self-sufficient or a diff against a full one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotKind {
    /// Complete copy of the source tree
    Full,
    /// Only entries changed since the latest full snapshot
    Incremental,
}

impl fmt::Display for SnapshotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotKind::Full => f.write_str("full"),
            SnapshotKind::Incremental => f.write_str("incremental"),
        }
    }
}

/// A snapshot directory inside a backup root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Directory name, a sortable timestamp
    pub id: SnapshotId,
    /// Full or incremental
    pub kind: SnapshotKind,
    /// Path of the snapshot directory
    pub root: PathBuf,
}

impl Snapshot {
    /// Describe the snapshot stored at `root`
    pub fn at(root: PathBuf, kind: SnapshotKind) -> Result<Self> {
        let id = SnapshotId::of_dir(&root)?;
        Ok(Self { id, kind, root })
    }

    /// Describe snapshot `id` inside `backup_root`
    pub fn in_root(backup_root: &Path, id: SnapshotId, kind: SnapshotKind) -> Self {
        let root = backup_root.join(id.as_str());
        Self { id, kind, root }
    }

    /// The backup root holding this snapshot
    pub fn backup_root(&self) -> Option<&Path> {
        self.root.parent()
    }

    /// Whether this is a full snapshot
    pub fn is_full(&self) -> bool {
        self.kind == SnapshotKind::Full
    }
}

/// Create a fresh, empty snapshot directory named `id`.
///
/// The backup root is created if missing. A directory that already carries
/// the same identifier (two snapshots within one second) is deleted first,
/// so the last writer for a given second wins. Callers that read from an
/// existing snapshot must make sure `id` differs from it.
pub(crate) fn allocate_snapshot_dir(
    backup_root: &Path,
    id: SnapshotId,
    kind: SnapshotKind,
) -> Result<Snapshot> {
    ensure_dir_or_absent(backup_root)?;

    let snapshot = Snapshot::in_root(backup_root, id, kind);

    match fs::symlink_metadata(&snapshot.root) {
        Ok(meta) => {
            warn!("Replacing existing snapshot directory {:?}", snapshot.root);
            if meta.is_dir() {
                fs::remove_dir_all(&snapshot.root).at(&snapshot.root)?;
            } else {
                fs::remove_file(&snapshot.root).at(&snapshot.root)?;
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(SnapError::io(&snapshot.root, e)),
    }

    fs::create_dir_all(&snapshot.root).at(&snapshot.root)?;
    debug!("Allocated {} snapshot {}", kind, snapshot.id);
    Ok(snapshot)
}

/// Fail unless `path` is a directory or does not exist yet
pub(crate) fn ensure_dir_or_absent(path: &Path) -> Result<()> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(SnapError::NotADirectory(path.to_path_buf())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(SnapError::io(path, e)),
    }
}

/// Fail unless `path` is an existing directory
pub(crate) fn ensure_dir(path: &Path) -> Result<()> {
    let meta = fs::metadata(path).at(path)?;
    if meta.is_dir() {
        Ok(())
    } else {
        Err(SnapError::NotADirectory(path.to_path_buf()))
    }
}

/// List the snapshots inside `backup_root`, oldest first.
///
/// Only directories are considered; the registry file and any stray files
/// are ignored. A backup root that does not exist has no snapshots.
pub fn list_snapshots(backup_root: &Path, registry: &dyn SnapshotRegistry) -> Result<Vec<Snapshot>> {
    let entries = match fs::read_dir(backup_root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(SnapError::io(backup_root, e)),
    };

    let mut snapshots = Vec::new();
    for entry in entries {
        let entry = entry.at(backup_root)?;
        let path = entry.path();
        if !entry.file_type().at(&path)?.is_dir() {
            continue;
        }
        let kind = if registry.is_full_snapshot(&path)? {
            SnapshotKind::Full
        } else {
            SnapshotKind::Incremental
        };
        snapshots.push(Snapshot::at(path, kind)?);
    }

    snapshots.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(snapshots)
}
