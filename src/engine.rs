//! Main entry point for taking and restoring snapshots
//!
//! [`SnapChain`] bundles the two pieces of state every operation needs: the
//! registry that knows which snapshots are full, and the clock that names
//! new snapshots. Build one with [`SnapChainBuilder`], or use
//! [`SnapChain::new`] for the on-disk registry and the system clock.
//!
//! ## Example
//!
//! ```rust,no_run
//! use snapchain::{SnapChain, SnapshotOutcome};
//! use std::path::Path;
//!
//! # fn main() -> snapchain::Result<()> {
//! let chain = SnapChain::new();
//! let source = Path::new("./project");
//! let backups = Path::new("/var/backups/project");
//!
//! chain.full_snapshot(source, backups)?;
//!
//! // ... edit files ...
//!
//! match chain.incremental_snapshot(source, backups)? {
//!     SnapshotOutcome::Created { snapshot, .. } => {
//!         chain.restore(&snapshot.root, Path::new("./restored"))?;
//!     }
//!     SnapshotOutcome::NoChanges { .. } => println!("nothing to do"),
//!     SnapshotOutcome::PerformedFull(_) => unreachable!(),
//! }
//! # Ok(())
//! # }
//! ```

use crate::error::{Result, SnapError};
use crate::registry::{FsRegistry, RegistryLayout, SnapshotRegistry};
use crate::restore;
use crate::snapshot::{self, system_clock, Clock, Snapshot};
use crate::types::{FullSnapshot, RestoreResult, SnapshotOutcome};
use crate::writer;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument};

/// Snapshot engine holding the registry handle and the clock
#[derive(Clone)]
pub struct SnapChain {
    registry: Arc<dyn SnapshotRegistry>,
    clock: Clock,
}

impl SnapChain {
    /// Engine backed by marker files on disk and the UTC system clock
    pub fn new() -> Self {
        Self {
            registry: Arc::new(FsRegistry::new()),
            clock: system_clock(),
        }
    }

    /// Start configuring an engine
    pub fn builder() -> SnapChainBuilder {
        SnapChainBuilder::new()
    }

    /// Copy `source` wholesale into a new full snapshot under `backup_root`
    ///
    /// The backup root is created if it does not exist. The snapshot becomes
    /// the base for later incremental snapshots.
    #[instrument(skip(self))]
    pub fn full_snapshot(&self, source: &Path, backup_root: &Path) -> Result<FullSnapshot> {
        info!("Taking full snapshot of {:?}", source);
        writer::write_full(source, backup_root, self.registry.as_ref(), &self.clock)
    }

    /// Snapshot only what changed since the latest full snapshot
    ///
    /// Takes a full snapshot instead when `backup_root` has none yet, and
    /// writes nothing when no entry changed.
    ///
    /// # Returns
    ///
    /// - [`SnapshotOutcome::Created`] with the new incremental snapshot
    /// - [`SnapshotOutcome::NoChanges`] if every visited entry was unchanged
    /// - [`SnapshotOutcome::PerformedFull`] if there was no base to diff against
    #[instrument(skip(self))]
    pub fn incremental_snapshot(&self, source: &Path, backup_root: &Path) -> Result<SnapshotOutcome> {
        info!("Taking incremental snapshot of {:?}", source);
        writer::write_incremental(source, backup_root, self.registry.as_ref(), &self.clock)
    }

    /// Reconstruct the tree captured by `snapshot_dir` into `destination`
    ///
    /// See [`crate::restore`] for the merge rules.
    #[instrument(skip(self))]
    pub fn restore(&self, snapshot_dir: &Path, destination: &Path) -> Result<RestoreResult> {
        info!("Restoring {:?}", snapshot_dir);
        restore::restore(snapshot_dir, destination, self.registry.as_ref())
    }

    /// Snapshots inside `backup_root`, oldest first
    pub fn list_snapshots(&self, backup_root: &Path) -> Result<Vec<Snapshot>> {
        snapshot::list_snapshots(backup_root, self.registry.as_ref())
    }

    /// Latest full snapshot recorded for `backup_root`
    pub fn latest_full_snapshot(&self, backup_root: &Path) -> Result<Option<Snapshot>> {
        self.registry.latest_full_snapshot(backup_root)
    }

    /// The registry in use
    pub fn registry(&self) -> &dyn SnapshotRegistry {
        self.registry.as_ref()
    }
}

impl Default for SnapChain {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SnapChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapChain").finish_non_exhaustive()
    }
}

/// Builder for [`SnapChain`]
#[derive(Default)]
pub struct SnapChainBuilder {
    registry: Option<Arc<dyn SnapshotRegistry>>,
    layout: Option<RegistryLayout>,
    clock: Option<Clock>,
}

impl SnapChainBuilder {
    /// Builder with the default on-disk registry and system clock
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom registry
    ///
    /// Cannot be combined with [`SnapChainBuilder::layout`].
    ///
    /// ```rust
    /// use snapchain::{MemoryRegistry, SnapChain};
    /// use std::sync::Arc;
    ///
    /// let chain = SnapChain::builder()
    ///     .registry(Arc::new(MemoryRegistry::new()))
    ///     .build()
    ///     .unwrap();
    /// ```
    pub fn registry(mut self, registry: Arc<dyn SnapshotRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Use custom marker and registry file names with the on-disk registry
    pub fn layout(mut self, layout: RegistryLayout) -> Self {
        self.layout = Some(layout);
        self
    }

    /// Use a custom clock to name snapshots
    ///
    /// Snapshot identifiers have one-second resolution; a clock that ticks
    /// faster than the wall clock lets tests take several snapshots in a row.
    pub fn clock(mut self, clock: Clock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Build the engine
    ///
    /// # Errors
    ///
    /// - [`SnapError::InvalidConfiguration`] if both a registry and a layout
    ///   were given, or the layout names are not single path components
    pub fn build(self) -> Result<SnapChain> {
        let registry: Arc<dyn SnapshotRegistry> = match (self.registry, self.layout) {
            (Some(_), Some(_)) => {
                return Err(SnapError::InvalidConfiguration(
                    "a registry layout only applies to the built-in file registry".to_string(),
                ))
            }
            (Some(registry), None) => registry,
            (None, Some(layout)) => Arc::new(FsRegistry::with_layout(layout)?),
            (None, None) => Arc::new(FsRegistry::new()),
        };

        Ok(SnapChain {
            registry,
            clock: self.clock.unwrap_or_else(system_clock),
        })
    }
}
