//! Error types for snapchain
//!
//! Every fallible operation in the crate returns [`Result<T>`], an alias over
//! [`SnapError`]. Filesystem failures carry the offending path so that a
//! message printed by the command-line tools points at the exact entry that
//! could not be read, created or copied.
//!
//! Errors fall into three groups:
//!
//! - **I/O failures** ([`SnapError::Io`], [`SnapError::WalkDir`]): the current
//!   operation aborts immediately. Nothing is retried and nothing already
//!   written is rolled back.
//! - **Absence** ([`SnapError::NotFound`]): a path that had to exist does not.
//!   Optional lookups (such as the latest-full-snapshot pointer) report
//!   absence as `Ok(None)` instead.
//! - **Logic errors** ([`SnapError::InvalidSnapshotChain`],
//!   [`SnapError::NotADirectory`]): the request itself cannot be satisfied.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Type alias for Results in the snapchain library
pub type Result<T> = std::result::Result<T, SnapError>;

/// Main error type for all snapchain operations
#[derive(Debug, Error)]
pub enum SnapError {
    /// Filesystem operation failed on a known path
    #[error("IO error at {path:?}: {source}")]
    Io {
        /// Path the operation was acting on
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// I/O error without path context
    #[error("IO error: {0}")]
    IoBare(#[from] std::io::Error),

    /// Directory enumeration failed
    #[error("Walk directory error: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// Errors during JSON serialization
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A required path or entry does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Restore target has no preceding full snapshot
    #[error("{0:?} is not part of a valid snapshot chain: no preceding full snapshot")]
    InvalidSnapshotChain(PathBuf),

    /// A path that must be a directory is something else
    #[error("Not a directory: {0:?}")]
    NotADirectory(PathBuf),

    /// A new incremental snapshot would not sort after its base
    #[error("Snapshot id {id} does not sort after base full snapshot {base}")]
    SnapshotIdConflict {
        /// Identifier the clock produced
        id: String,
        /// Identifier of the base full snapshot
        base: String,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SnapError {
    /// Wrap an I/O error with the path it occurred on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SnapError::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a not-found error with a custom message
    pub fn not_found(msg: impl Into<String>) -> Self {
        SnapError::NotFound(msg.into())
    }

    /// Create an internal error with a custom message
    pub fn internal(msg: impl Into<String>) -> Self {
        SnapError::Internal(msg.into())
    }

    /// Check if this error means "the thing does not exist"
    pub fn is_not_found(&self) -> bool {
        match self {
            SnapError::NotFound(_) => true,
            SnapError::Io { source, .. } | SnapError::IoBare(source) => {
                source.kind() == std::io::ErrorKind::NotFound
            }
            SnapError::WalkDir(e) => e
                .io_error()
                .map(|io| io.kind() == std::io::ErrorKind::NotFound)
                .unwrap_or(false),
            _ => false,
        }
    }

    /// Check if this error is a logic error rather than an I/O failure
    pub fn is_logic_error(&self) -> bool {
        matches!(
            self,
            SnapError::InvalidSnapshotChain(_)
                | SnapError::NotADirectory(_)
                | SnapError::InvalidConfiguration(_)
                | SnapError::SnapshotIdConflict { .. }
        )
    }

    /// Get a user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            SnapError::InvalidSnapshotChain(path) => {
                format!(
                    "{:?} is not a restorable snapshot: no full snapshot precedes it. \
                     Pass a snapshot directory that lives inside a backup root.",
                    path
                )
            }
            SnapError::NotADirectory(path) => {
                format!("{:?} is not a directory.", path)
            }
            SnapError::SnapshotIdConflict { base, .. } => {
                format!(
                    "An incremental snapshot cannot share the second of full snapshot {}. \
                     Wait a second and retry.",
                    base
                )
            }
            SnapError::Io { path, source } if source.kind() == std::io::ErrorKind::PermissionDenied => {
                format!(
                    "Permission denied for {:?}. Check file permissions or run with appropriate privileges.",
                    path
                )
            }
            _ => self.to_string(),
        }
    }
}

/// Attach a path to `std::io::Result` values
pub(crate) trait IoResultExt<T> {
    /// Map the error into [`SnapError::Io`] carrying `path`
    fn at(self, path: &Path) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn at(self, path: &Path) -> Result<T> {
        self.map_err(|e| SnapError::io(path, e))
    }
}
