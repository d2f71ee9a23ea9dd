//! Recursive tree copy with an explicit conflict policy
//!
//! [`copy_tree`] is the single primitive every snapshot and restore path
//! goes through. It walks the source depth-first and reproduces each entry
//! at the mirrored location under the destination:
//!
//! - **Directories** are created (or reused when one already exists) and
//!   their children copied recursively, so copying into an existing
//!   directory merges rather than replaces.
//! - **Regular files** are copied byte for byte. Timestamps are not
//!   preserved; a copy's mtime is the time it was written.
//! - **Symbolic links** are recreated as links with the same target and are
//!   never followed.
//! - Anything else (sockets, FIFOs, devices) is skipped with a warning.
//!
//! When the destination already holds an entry at some path, [`CopyPolicy`]
//! decides: `Overwrite` replaces it (removing it first when its type
//! differs), `SkipExisting` leaves it untouched. Directories present on both
//! sides are merged under either policy.

use crate::error::{IoResultExt, Result, SnapError};
use crate::utils::create_symlink;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::ops::AddAssign;
use std::path::Path;
use tracing::{trace, warn};

/// What to do when the destination already has an entry at a path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyPolicy {
    /// Replace whatever is there
    Overwrite,
    /// Keep whatever is there
    SkipExisting,
}

/// Counters accumulated by a copy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyStats {
    /// Regular files written
    pub files: usize,
    /// Directories created
    pub directories: usize,
    /// Symbolic links recreated
    pub symlinks: usize,
    /// Bytes written for regular files
    pub bytes: u64,
    /// Entries left alone (existing under `SkipExisting`, or unsupported)
    pub skipped: usize,
}

impl CopyStats {
    /// Entries written of any kind
    pub fn entries(&self) -> usize {
        self.files + self.directories + self.symlinks
    }
}

impl AddAssign for CopyStats {
    fn add_assign(&mut self, other: Self) {
        self.files += other.files;
        self.directories += other.directories;
        self.symlinks += other.symlinks;
        self.bytes += other.bytes;
        self.skipped += other.skipped;
    }
}

/// Copy `from` to `to` recursively under `policy`.
///
/// If `from` is a directory its contents land inside `to`, which is created
/// when missing. If `from` is a file or symlink it is copied to exactly
/// `to`. The parent of `to` must already exist.
///
/// # Errors
///
/// The first I/O failure aborts the copy; entries already written stay.
pub fn copy_tree(from: &Path, to: &Path, policy: CopyPolicy) -> Result<CopyStats> {
    let mut stats = CopyStats::default();
    copy_entry(from, to, policy, &mut stats)?;
    Ok(stats)
}

fn copy_entry(from: &Path, to: &Path, policy: CopyPolicy, stats: &mut CopyStats) -> Result<()> {
    let source_type = fs::symlink_metadata(from).at(from)?.file_type();
    let existing = probe(to)?;

    if source_type.is_dir() {
        match existing {
            Some(ref ft) if ft.is_dir() => {}
            Some(_) if policy == CopyPolicy::SkipExisting => {
                trace!("Keeping existing non-directory {:?}", to);
                stats.skipped += 1;
                return Ok(());
            }
            Some(ft) => {
                remove_entry(to, ft)?;
                create_dir(to, stats)?;
            }
            None => create_dir(to, stats)?,
        }

        // Collect first so the directory handle is released before recursing
        let mut children = Vec::new();
        for entry in fs::read_dir(from).at(from)? {
            children.push(entry.at(from)?.file_name());
        }
        children.sort();

        for name in children {
            copy_entry(&from.join(&name), &to.join(&name), policy, stats)?;
        }
        return Ok(());
    }

    if let Some(ft) = existing {
        if policy == CopyPolicy::SkipExisting {
            trace!("Keeping existing {:?}", to);
            stats.skipped += 1;
            return Ok(());
        }
        remove_entry(to, ft)?;
    }

    if source_type.is_symlink() {
        let target = fs::read_link(from).at(from)?;
        create_symlink(&target, to)?;
        stats.symlinks += 1;
    } else if source_type.is_file() {
        let bytes = fs::copy(from, to).map_err(|e| SnapError::io(from, e))?;
        stats.files += 1;
        stats.bytes += bytes;
    } else {
        warn!("Skipping unsupported file type at {:?}", from);
        stats.skipped += 1;
    }
    Ok(())
}

/// File type of whatever sits at `path`, without following symlinks
fn probe(path: &Path) -> Result<Option<fs::FileType>> {
    match fs::symlink_metadata(path) {
        Ok(meta) => Ok(Some(meta.file_type())),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(SnapError::io(path, e)),
    }
}

fn remove_entry(path: &Path, ft: fs::FileType) -> Result<()> {
    trace!("Replacing {:?}", path);
    if ft.is_dir() {
        fs::remove_dir_all(path).at(path)
    } else {
        fs::remove_file(path).at(path)
    }
}

fn create_dir(path: &Path, stats: &mut CopyStats) -> Result<()> {
    fs::create_dir(path).at(path)?;
    stats.directories += 1;
    Ok(())
}
