//! Result types returned by snapshot and restore operations
//!
//! All of them serialize with serde so that callers (and the `--json` mode of
//! the command-line tools) can report what an operation did.
//!
//! ```rust
//! use snapchain::types::IncrementalStats;
//!
//! let stats = IncrementalStats::default();
//! assert!(!stats.has_changes());
//! ```

use crate::copy::CopyStats;
use crate::snapshot::Snapshot;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A freshly written full snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullSnapshot {
    /// The new snapshot
    pub snapshot: Snapshot,
    /// What the copy wrote
    pub stats: CopyStats,
}

/// Counters gathered while writing an incremental snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncrementalStats {
    /// Source entries the walk visited (pruned subtrees are not visited)
    pub entries_examined: usize,
    /// Visited entries absent from the base snapshot
    pub entries_new: usize,
    /// Visited entries present in the base but classified as changed
    pub entries_changed: usize,
    /// Visited entries classified unchanged
    pub entries_unchanged: usize,
    /// Aggregate of every copy into the new snapshot
    pub copy: CopyStats,
}

impl IncrementalStats {
    /// Whether anything was copied
    pub fn has_changes(&self) -> bool {
        self.entries_new + self.entries_changed > 0
    }
}

/// Outcome of an incremental snapshot request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SnapshotOutcome {
    /// No full baseline existed, so a full snapshot was taken instead
    PerformedFull(FullSnapshot),
    /// An incremental snapshot holding the changed entries was written
    Created {
        /// The new incremental snapshot
        snapshot: Snapshot,
        /// The full snapshot it was diffed against
        base: Snapshot,
        /// Walk and copy counters
        stats: IncrementalStats,
    },
    /// Nothing changed since the base; no directory was created
    NoChanges {
        /// The full snapshot the source was compared to
        base: Snapshot,
        /// Walk counters
        stats: IncrementalStats,
    },
}

impl SnapshotOutcome {
    /// The snapshot written by this operation, if any
    pub fn snapshot(&self) -> Option<&Snapshot> {
        match self {
            SnapshotOutcome::PerformedFull(full) => Some(&full.snapshot),
            SnapshotOutcome::Created { snapshot, .. } => Some(snapshot),
            SnapshotOutcome::NoChanges { .. } => None,
        }
    }

    /// Whether the operation ended without writing anything
    pub fn is_no_changes(&self) -> bool {
        matches!(self, SnapshotOutcome::NoChanges { .. })
    }
}

/// Result of a restore operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreResult {
    /// Snapshot that was restored
    pub snapshot: Snapshot,
    /// Full snapshot merged underneath; `None` when `snapshot` was full
    pub base: Option<Snapshot>,
    /// Where the tree was reconstructed
    pub destination: PathBuf,
    /// Entries copied from the requested snapshot
    pub from_snapshot: CopyStats,
    /// Entries filled in from the base full snapshot
    pub from_base: CopyStats,
    /// Time taken in milliseconds
    pub duration_ms: u64,
}

impl RestoreResult {
    /// Entries written in total
    pub fn entries_restored(&self) -> usize {
        self.from_snapshot.entries() + self.from_base.entries()
    }

    /// Bytes written in total
    pub fn bytes_written(&self) -> u64 {
        self.from_snapshot.bytes + self.from_base.bytes
    }
}
