//! # snapchain - Full and incremental directory snapshots
//!
//! Back up a directory tree as a chain of plain directories: an occasional
//! full copy, followed by incremental snapshots that contain only what
//! changed since that copy. Any snapshot in the chain can be turned back into
//! a complete tree.
//!
//! ## Overview
//!
//! - **Full snapshots** copy the whole source tree into a new directory named
//!   after the current time (`YYYY-MM-DD_HH-MM-SS`) and mark it as full.
//! - **Incremental snapshots** walk the source and copy only entries that are
//!   new or changed compared to the latest full snapshot. If nothing changed,
//!   no directory is created at all.
//! - **Restore** copies a full snapshot as is, or lays an incremental snapshot
//!   over the full snapshot that precedes it.
//!
//! Snapshots are ordinary directories: they can be browsed, copied or pruned
//! with any file manager.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use snapchain::SnapChain;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let chain = SnapChain::new();
//!
//! let full = chain.full_snapshot(Path::new("./docs"), Path::new("/backups/docs"))?;
//! println!("Full snapshot {} ({} files)", full.snapshot.id, full.stats.files);
//!
//! let outcome = chain.incremental_snapshot(Path::new("./docs"), Path::new("/backups/docs"))?;
//! if let Some(snapshot) = outcome.snapshot() {
//!     let result = chain.restore(&snapshot.root, Path::new("./docs-restored"))?;
//!     println!("Restored {} entries", result.entries_restored());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Change detection
//!
//! An entry is copied into an incremental snapshot when it is absent from
//! the base, when its type changed, or when its modification time moved past
//! the base copy's and (for non-directories) its size differs. A directory
//! whose mtime did not advance is skipped together with everything below it.
//! See [`classify`] for the full table and its limitations.
//!
//! ## Known limitations
//!
//! - Deletions are not recorded. Restoring an incremental snapshot brings
//!   back files that were removed from the source after the full snapshot.
//! - Content is never compared. An edit that keeps the size, or a file whose
//!   mtime went backwards, is not detected.
//! - Pruning trusts directory mtimes. A file edited in place inside an
//!   otherwise untouched directory is not picked up.
//! - Timestamps and permissions of copied files are not preserved.
//!
//! ## Module Organization
//!
//! - [`engine`]: [`SnapChain`] entry point and its builder
//! - [`registry`]: which snapshots are full and which one is the latest
//! - [`snapshot`]: identifiers, kinds and listing
//! - [`index`]: lookup structure over an existing snapshot
//! - [`classify`]: per-entry change detection
//! - [`writer`]: full and incremental snapshot writers
//! - [`restore`]: reconstruction of a tree from a snapshot
//! - [`copy`]: recursive copy primitive
//! - [`types`]: result types
//! - [`error`]: error types and handling

// Public API modules
pub mod classify;
pub mod copy;
pub mod engine;
pub mod error;
pub mod index;
pub mod logging;
pub mod registry;
pub mod restore;
pub mod snapshot;
pub mod types;
pub mod writer;

// Internal modules (not part of public API)
mod collections;
mod utils;

// Re-export main types for convenience
pub use classify::{EntryInfo, EntryKind, Verdict};
pub use copy::{copy_tree, CopyPolicy, CopyStats};
pub use engine::{SnapChain, SnapChainBuilder};
pub use error::{Result, SnapError};
pub use index::{build_index, BackupTree};
pub use registry::{FsRegistry, MemoryRegistry, RegistryLayout, SnapshotRegistry};
pub use snapshot::{Clock, Snapshot, SnapshotId, SnapshotKind};
pub use types::*;
pub use utils::format_bytes;
