//! Snapshot writers
//!
//! [`write_full`] copies a source tree wholesale into a new snapshot
//! directory and records it as the latest full snapshot of the backup root.
//!
//! [`write_incremental`] compares the source against that full snapshot and
//! copies only what changed. The walk is pre-order and pruned:
//!
//! - an entry classified unchanged is skipped, and if it is a directory its
//!   whole subtree is skipped with it;
//! - an entry classified changed is copied, and if it is a directory it is
//!   copied whole and not descended into.
//!
//! The snapshot directory is created lazily on the first copy, so a run that
//! finds nothing to copy leaves the backup root untouched.

use crate::classify::{classify, EntryInfo, Verdict};
use crate::copy::{copy_tree, CopyPolicy, CopyStats};
use crate::error::{IoResultExt, Result, SnapError};
use crate::index::build_index;
use crate::registry::SnapshotRegistry;
use crate::snapshot::{
    allocate_snapshot_dir, ensure_dir, ensure_dir_or_absent, Clock, Snapshot, SnapshotId, SnapshotKind,
};
use crate::types::{FullSnapshot, IncrementalStats, SnapshotOutcome};
use crate::utils::{make_relative, resolve_path};
use std::fs;
use std::path::Path;
use tracing::{debug, info, trace};
use walkdir::WalkDir;

/// Take a full snapshot of `source_root` inside `backup_root`.
///
/// The backup root is created when missing. The new snapshot is marked full
/// and becomes the registry's latest full snapshot.
///
/// # Errors
///
/// - [`SnapError::NotADirectory`] if the source is not a directory or the
///   backup root exists and is not one
/// - [`SnapError::InvalidConfiguration`] if the backup root lies inside the
///   source tree
/// - any I/O failure during the copy
pub fn write_full(
    source_root: &Path,
    backup_root: &Path,
    registry: &dyn SnapshotRegistry,
    clock: &Clock,
) -> Result<FullSnapshot> {
    check_roots(source_root, backup_root)?;

    let id = SnapshotId::from_datetime(clock());
    let snapshot = allocate_snapshot_dir(backup_root, id, SnapshotKind::Full)?;
    let stats = copy_tree(source_root, &snapshot.root, CopyPolicy::Overwrite)?;
    registry.mark_full(&snapshot.root)?;
    registry.record_latest_full_snapshot(backup_root, &snapshot)?;

    info!(
        "Full snapshot {} written: {} files, {} bytes",
        snapshot.id, stats.files, stats.bytes
    );
    Ok(FullSnapshot { snapshot, stats })
}

/// Take an incremental snapshot of `source_root` against the latest full
/// snapshot of `backup_root`.
///
/// Falls back to [`write_full`] when the registry knows no full snapshot for
/// the backup root, which covers empty and nonexistent roots.
///
/// # Errors
///
/// Same as [`write_full`], plus [`SnapError::SnapshotIdConflict`] when the
/// clock yields an identifier that does not sort after the base full
/// snapshot (for example within the same second). The base is never
/// touched in that case. Any I/O failure aborts the walk; a partially
/// written incremental directory is left in place.
pub fn write_incremental(
    source_root: &Path,
    backup_root: &Path,
    registry: &dyn SnapshotRegistry,
    clock: &Clock,
) -> Result<SnapshotOutcome> {
    check_roots(source_root, backup_root)?;

    let Some(base) = registry.latest_full_snapshot(backup_root)? else {
        info!("No full snapshot recorded in {:?}, taking a full one", backup_root);
        let full = write_full(source_root, backup_root, registry, clock)?;
        return Ok(SnapshotOutcome::PerformedFull(full));
    };
    ensure_dir(&base.root)?;

    let tree = build_index(&base.root)?;
    let mut stats = IncrementalStats::default();
    let mut created: Option<Snapshot> = None;

    // Pruning below assumes that adding, removing or renaming a direct child
    // advances the parent directory's mtime. Most filesystems do this, but
    // nothing guarantees it, and an in-place edit of a file never touches
    // its directory.
    let mut walker = WalkDir::new(source_root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter();

    while let Some(entry) = walker.next() {
        let entry = entry?;
        let relative = make_relative(entry.path(), source_root)?;
        let source = EntryInfo::from_metadata(&entry.metadata()?, entry.path())?;
        stats.entries_examined += 1;

        let base_entry = if tree.contains(&relative) {
            Some(EntryInfo::probe(&tree.resolve(&relative))?)
        } else {
            None
        };

        let verdict = classify(&source, base_entry.as_ref());
        trace!("{} -> {:?}", relative.display(), verdict);

        match verdict {
            Verdict::Unchanged => stats.entries_unchanged += 1,
            Verdict::New => stats.entries_new += 1,
            _ => stats.entries_changed += 1,
        }

        if verdict.must_copy() {
            let target = target_snapshot(&mut created, backup_root, &base, clock)?;
            stats.copy += copy_relative(entry.path(), &target.root, &relative)?;
            debug!("Copied {} ({:?})", relative.display(), verdict);
        }

        // Unchanged directories are pruned, copied ones were taken whole
        if source.is_dir() {
            if !verdict.must_copy() {
                debug!("Pruned unchanged directory {}", relative.display());
            }
            walker.skip_current_dir();
        }
    }

    match created {
        Some(snapshot) => {
            info!(
                "Incremental snapshot {} written against {}: {} new, {} changed, {} bytes",
                snapshot.id, base.id, stats.entries_new, stats.entries_changed, stats.copy.bytes
            );
            Ok(SnapshotOutcome::Created { snapshot, base, stats })
        }
        None => {
            info!("No changes since full snapshot {}", base.id);
            Ok(SnapshotOutcome::NoChanges { base, stats })
        }
    }
}

/// The incremental snapshot being written, allocated on first use.
///
/// Its identifier must sort after `base`, otherwise allocation would replace
/// the base or restore could not find it.
fn target_snapshot<'a>(
    slot: &'a mut Option<Snapshot>,
    backup_root: &Path,
    base: &Snapshot,
    clock: &Clock,
) -> Result<&'a Snapshot> {
    if slot.is_none() {
        let id = SnapshotId::from_datetime(clock());
        if id <= base.id {
            return Err(SnapError::SnapshotIdConflict {
                id: id.to_string(),
                base: base.id.to_string(),
            });
        }
        *slot = Some(allocate_snapshot_dir(backup_root, id, SnapshotKind::Incremental)?);
    }
    slot.as_ref()
        .ok_or_else(|| SnapError::internal("incremental snapshot was not allocated"))
}

/// Copy `entry` to `relative` under `snapshot_root`, creating missing parents
fn copy_relative(entry: &Path, snapshot_root: &Path, relative: &Path) -> Result<CopyStats> {
    let destination = snapshot_root.join(relative);
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).at(parent)?;
    }
    copy_tree(entry, &destination, CopyPolicy::Overwrite)
}

/// Validate both roots and refuse a backup root nested in the source
fn check_roots(source_root: &Path, backup_root: &Path) -> Result<()> {
    ensure_dir(source_root)?;
    ensure_dir_or_absent(backup_root)?;

    let source = resolve_path(source_root)?;
    let backup = resolve_path(backup_root)?;
    if backup.starts_with(&source) {
        return Err(SnapError::InvalidConfiguration(format!(
            "backup root {:?} lies inside source {:?}",
            backup_root, source_root
        )));
    }
    Ok(())
}
