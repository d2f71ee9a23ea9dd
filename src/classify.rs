//! Change detection between a source entry and its base-snapshot counterpart
//!
//! Whether an entry goes into an incremental snapshot is decided from
//! metadata alone, never from content:
//!
//! | base entry             | source vs base                      | verdict            |
//! |------------------------|-------------------------------------|--------------------|
//! | absent                 | -                                   | `New`              |
//! | present, other type    | -                                   | `TypeChanged`      |
//! | present, same type     | mtime advanced, directory           | `DirectoryTouched` |
//! | present, same type     | mtime advanced, size differs        | `Resized`          |
//! | present, same type     | mtime advanced, same size           | `Unchanged`        |
//! | present, same type     | mtime not advanced                  | `Unchanged`        |
//!
//! An edit that keeps both mtime and size, or that leaves mtime behind, goes
//! unnoticed. That is a known limitation of the heuristic.

use crate::error::{IoResultExt, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::SystemTime;

/// Coarse file type used for comparisons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Regular file
    File,
    /// Directory
    Directory,
    /// Symbolic link (never followed)
    Symlink,
    /// Socket, FIFO, device, ...
    Other,
}

impl From<fs::FileType> for EntryKind {
    fn from(ft: fs::FileType) -> Self {
        if ft.is_symlink() {
            EntryKind::Symlink
        } else if ft.is_dir() {
            EntryKind::Directory
        } else if ft.is_file() {
            EntryKind::File
        } else {
            EntryKind::Other
        }
    }
}

/// The metadata the classifier looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryInfo {
    /// File type
    pub kind: EntryKind,
    /// Last modification time
    pub modified: SystemTime,
    /// Size in bytes as reported by the filesystem
    pub size: u64,
}

impl EntryInfo {
    /// Read the metadata of `path` without following symlinks
    pub fn probe(path: &Path) -> Result<Self> {
        let metadata = fs::symlink_metadata(path).at(path)?;
        Self::from_metadata(&metadata, path)
    }

    /// Extract from already-loaded metadata; `path` is only used for errors
    pub fn from_metadata(metadata: &fs::Metadata, path: &Path) -> Result<Self> {
        Ok(Self {
            kind: metadata.file_type().into(),
            modified: metadata.modified().at(path)?,
            size: metadata.len(),
        })
    }

    /// Whether this entry is a directory
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// Why an entry was or was not copied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Not present in the base snapshot
    New,
    /// Present with a different file type
    TypeChanged,
    /// Directory whose mtime advanced
    DirectoryTouched,
    /// Non-directory whose mtime advanced and size changed
    Resized,
    /// Considered identical to the base entry
    Unchanged,
}

impl Verdict {
    /// Whether the entry must be copied into the new snapshot
    pub fn must_copy(self) -> bool {
        !matches!(self, Verdict::Unchanged)
    }
}

/// Classify `source` against its base counterpart (`None` when absent)
pub fn classify(source: &EntryInfo, base: Option<&EntryInfo>) -> Verdict {
    let Some(base) = base else {
        return Verdict::New;
    };

    if source.kind != base.kind {
        return Verdict::TypeChanged;
    }

    // Size is only consulted once the mtime has moved forward
    if source.modified <= base.modified {
        return Verdict::Unchanged;
    }

    if source.is_dir() {
        Verdict::DirectoryTouched
    } else if source.size != base.size {
        Verdict::Resized
    } else {
        Verdict::Unchanged
    }
}

/// Whether `source` must be copied given its base counterpart
pub fn should_copy(source: &EntryInfo, base: Option<&EntryInfo>) -> bool {
    classify(source, base).must_copy()
}
