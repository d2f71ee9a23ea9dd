//! Reconstruction of a source tree from a snapshot
//!
//! A full snapshot is restored by copying it. An incremental snapshot only
//! holds what changed, so it is laid over its base full snapshot in two
//! passes:
//!
//! 1. the incremental snapshot is copied into the destination, overwriting;
//! 2. the base is copied into the destination, skipping every entry that
//!    already exists there and merging directories present in both.
//!
//! Entries from the incremental snapshot therefore always win. Entries that
//! were deleted from the source after the base was taken come back, because
//! neither snapshot records deletions.

use crate::copy::{copy_tree, CopyPolicy, CopyStats};
use crate::error::{IoResultExt, Result, SnapError};
use crate::registry::SnapshotRegistry;
use crate::snapshot::{ensure_dir, ensure_dir_or_absent, list_snapshots, Snapshot, SnapshotKind};
use crate::types::RestoreResult;
use crate::utils::resolve_path;
use std::fs;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Restore `snapshot_dir` into `destination`.
///
/// The snapshot path is canonicalized first. The destination is created when
/// missing and merged into when it exists. The full-snapshot marker never
/// survives into the destination.
///
/// # Errors
///
/// - [`SnapError::Io`] (not found) if the snapshot does not exist
/// - [`SnapError::NotADirectory`] if the snapshot or the destination is not
///   a directory
/// - [`SnapError::InvalidSnapshotChain`] if the snapshot is incremental and
///   no full snapshot precedes it
/// - [`SnapError::InvalidConfiguration`] if the destination lies inside one
///   of the snapshots being read
pub fn restore(
    snapshot_dir: &Path,
    destination: &Path,
    registry: &dyn SnapshotRegistry,
) -> Result<RestoreResult> {
    let start = Instant::now();

    ensure_dir(snapshot_dir)?;
    ensure_dir_or_absent(destination)?;
    let root = fs::canonicalize(snapshot_dir).at(snapshot_dir)?;

    let kind = if registry.is_full_snapshot(&root)? {
        SnapshotKind::Full
    } else {
        SnapshotKind::Incremental
    };
    let snapshot = Snapshot::at(root, kind)?;
    let base = match kind {
        SnapshotKind::Full => None,
        SnapshotKind::Incremental => Some(find_base_full(&snapshot, registry)?),
    };

    check_destination(destination, &snapshot)?;
    if let Some(base) = &base {
        check_destination(destination, base)?;
    }

    fs::create_dir_all(destination).at(destination)?;

    let from_snapshot = copy_tree(&snapshot.root, destination, CopyPolicy::Overwrite)?;
    debug!("Copied {} entries from {}", from_snapshot.entries(), snapshot.id);

    let from_base = match &base {
        Some(base) => {
            let stats = copy_tree(&base.root, destination, CopyPolicy::SkipExisting)?;
            debug!(
                "Filled {} entries from base {} ({} already present)",
                stats.entries(),
                base.id,
                stats.skipped
            );
            stats
        }
        None => CopyStats::default(),
    };

    registry.unmark_full(destination)?;

    let result = RestoreResult {
        snapshot,
        base,
        destination: destination.to_path_buf(),
        from_snapshot,
        from_base,
        duration_ms: start.elapsed().as_millis() as u64,
    };
    info!(
        "Restored {} into {:?}: {} entries in {}ms",
        result.snapshot.id,
        destination,
        result.entries_restored(),
        result.duration_ms
    );
    Ok(result)
}

/// The full snapshot an incremental `snapshot` is laid over.
///
/// The registry's latest full snapshot is used when it is older than
/// `snapshot` and still present. Otherwise the siblings of `snapshot` are
/// scanned for the newest full snapshot that precedes it.
pub fn find_base_full(snapshot: &Snapshot, registry: &dyn SnapshotRegistry) -> Result<Snapshot> {
    let backup_root = snapshot
        .backup_root()
        .ok_or_else(|| SnapError::InvalidSnapshotChain(snapshot.root.clone()))?;

    if let Some(latest) = registry.latest_full_snapshot(backup_root)? {
        if latest.id < snapshot.id && latest.root.is_dir() {
            debug!("Base of {} is latest full snapshot {}", snapshot.id, latest.id);
            return Ok(latest);
        }
    }

    list_snapshots(backup_root, registry)?
        .into_iter()
        .filter(|candidate| candidate.is_full() && candidate.id < snapshot.id)
        .max_by(|a, b| a.id.cmp(&b.id))
        .ok_or_else(|| SnapError::InvalidSnapshotChain(snapshot.root.clone()))
}

fn check_destination(destination: &Path, source: &Snapshot) -> Result<()> {
    let resolved = resolve_path(destination)?;
    if resolved.starts_with(&source.root) {
        return Err(SnapError::InvalidConfiguration(format!(
            "restore destination {:?} lies inside snapshot {}",
            destination, source.id
        )));
    }
    Ok(())
}
