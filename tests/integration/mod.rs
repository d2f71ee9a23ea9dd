//! End-to-end scenarios for snapchain
//!
//! Every test drives the public engine against real directories. Times are
//! pinned with `filetime` so that change detection never depends on how
//! fast the test runs, and a stepping clock gives each snapshot its own
//! identifier.

use ::snapchain::*;
use chrono::{Duration, NaiveDate};
use filetime::{set_file_mtime, FileTime};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// Clock starting at a fixed instant and advancing one second per reading
pub fn stepping_clock() -> Clock {
    let start = NaiveDate::from_ymd_opt(2024, 3, 1)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap();
    let tick = AtomicI64::new(0);
    Arc::new(move || start + Duration::seconds(tick.fetch_add(1, Ordering::SeqCst)))
}

/// One entry of a directory tree as seen by [`read_tree`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Dir,
    File(Vec<u8>),
    Link(PathBuf),
}

/// Every entry under `root` keyed by relative path, marker files excluded
pub fn read_tree(root: &Path) -> BTreeMap<PathBuf, Node> {
    let mut tree = BTreeMap::new();
    for entry in walkdir::WalkDir::new(root).min_depth(1).follow_links(false) {
        let entry = entry.unwrap();
        if entry.file_name() == registry::DEFAULT_MARKER_NAME {
            continue;
        }
        let relative = entry.path().strip_prefix(root).unwrap().to_path_buf();
        let ft = entry.file_type();
        let node = if ft.is_symlink() {
            Node::Link(fs::read_link(entry.path()).unwrap())
        } else if ft.is_dir() {
            Node::Dir
        } else {
            Node::File(fs::read(entry.path()).unwrap())
        };
        tree.insert(relative, node);
    }
    tree
}

/// A source tree, a backup root and a restore target in one place
pub struct SnapTestHarness {
    _tmp: TempDir,
    pub source: PathBuf,
    pub backups: PathBuf,
    pub restored: PathBuf,
    pub chain: SnapChain,
}

impl SnapTestHarness {
    /// Harness using the on-disk registry
    pub fn new() -> Self {
        Self::with_registry(Arc::new(FsRegistry::new()))
    }

    pub fn with_registry(registry: Arc<dyn SnapshotRegistry>) -> Self {
        let tmp = TempDir::new().unwrap();
        let base = fs::canonicalize(tmp.path()).unwrap();
        let source = base.join("source");
        fs::create_dir(&source).unwrap();

        let chain = SnapChain::builder()
            .registry(registry)
            .clock(stepping_clock())
            .build()
            .unwrap();

        Self {
            _tmp: tmp,
            source,
            backups: base.join("backups"),
            restored: base.join("restored"),
            chain,
        }
    }

    /// Write a file under the source, creating parent directories
    pub fn write(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.source.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    /// Move the mtime of a source entry one hour into the future
    pub fn touch_future(&self, relative: &str) {
        let later = FileTime::from_unix_time(FileTime::now().unix_seconds() + 3600, 0);
        set_file_mtime(self.source.join(relative), later).unwrap();
    }

    /// Move the mtime of a source entry far into the past
    pub fn touch_past(&self, relative: &str) {
        set_file_mtime(self.source.join(relative), FileTime::from_unix_time(1_000, 0)).unwrap();
    }

    pub fn full(&self) -> FullSnapshot {
        self.chain.full_snapshot(&self.source, &self.backups).unwrap()
    }

    pub fn incremental(&self) -> SnapshotOutcome {
        self.chain.incremental_snapshot(&self.source, &self.backups).unwrap()
    }

    /// Snapshot directories currently in the backup root
    pub fn snapshot_dirs(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<_> = fs::read_dir(&self.backups)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.is_dir())
            .collect();
        dirs.sort();
        dirs
    }
}

impl Default for SnapTestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Unwrap a created incremental snapshot
pub fn expect_created(outcome: SnapshotOutcome) -> (Snapshot, IncrementalStats) {
    match outcome {
        SnapshotOutcome::Created { snapshot, stats, .. } => (snapshot, stats),
        other => panic!("expected an incremental snapshot, got {:?}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[test]
    #[traced_test]
    fn test_unchanged_rerun_is_idempotent() {
        let h = SnapTestHarness::new();
        h.write("a.txt", "a");
        h.write("dir/b.txt", "b");
        h.full();

        for _ in 0..2 {
            let outcome = h.incremental();
            assert!(outcome.is_no_changes(), "{:?}", outcome);
        }
        assert_eq!(h.snapshot_dirs().len(), 1);
        assert!(logs_contain("No changes since full snapshot"));
    }

    #[test]
    fn test_full_then_incremental_round_trip() {
        let h = SnapTestHarness::new();
        h.write("b.txt", "before");
        h.write("c.txt", "constant");
        h.write("keep/c2.txt", "nested constant");
        let full = h.full();

        // Add A, modify B, keep C
        h.write("a.txt", "added");
        h.write("added_dir/deep/a2.txt", "added deep");
        h.write("b.txt", "after, and longer");
        h.touch_future("b.txt");

        let (snapshot, stats) = expect_created(h.incremental());
        assert_eq!(stats.entries_new, 2);
        assert_eq!(stats.entries_changed, 1);
        assert!(!snapshot.root.join("c.txt").exists());
        assert!(!snapshot.root.join("keep").exists());

        let result = h.chain.restore(&snapshot.root, &h.restored).unwrap();
        assert_eq!(result.base.unwrap().id, full.snapshot.id);
        assert_eq!(read_tree(&h.restored), read_tree(&h.source));
    }

    #[test]
    fn test_unchanged_directory_is_pruned() {
        let h = SnapTestHarness::new();
        h.write("stable/inner.txt", "short");
        h.full();

        // In-place edit: the file moves forward, the directory does not
        h.write("stable/inner.txt", "much longer content");
        h.touch_future("stable/inner.txt");
        h.touch_past("stable");

        let outcome = h.incremental();
        let stats = match outcome {
            SnapshotOutcome::NoChanges { stats, .. } => stats,
            other => panic!("expected no changes, got {:?}", other),
        };
        assert_eq!(stats.entries_examined, 1);
        assert_eq!(stats.entries_unchanged, 1);
    }

    #[test]
    fn test_type_change_forces_copy() {
        let h = SnapTestHarness::new();
        h.write("x", "was a file");
        h.write("y/inner.txt", "was a dir");
        h.full();

        fs::remove_file(h.source.join("x")).unwrap();
        h.write("x/inner.txt", "now a dir");
        fs::remove_dir_all(h.source.join("y")).unwrap();
        h.write("y", "was a dir");
        // Neither mtime nor size would trigger a copy on their own
        h.touch_past("x");
        h.touch_past("y");

        let (snapshot, stats) = expect_created(h.incremental());
        assert_eq!(stats.entries_changed, 2);
        assert!(snapshot.root.join("x").is_dir());
        assert!(snapshot.root.join("y").is_file());

        h.chain.restore(&snapshot.root, &h.restored).unwrap();
        assert_eq!(fs::read_to_string(h.restored.join("x/inner.txt")).unwrap(), "now a dir");
        assert_eq!(fs::read_to_string(h.restored.join("y")).unwrap(), "was a dir");
    }

    #[test]
    fn test_empty_backup_root_takes_full() {
        let h = SnapTestHarness::new();
        h.write("a.txt", "a");

        // Missing backup root
        let outcome = h.incremental();
        let full = match outcome {
            SnapshotOutcome::PerformedFull(full) => full,
            other => panic!("expected a full snapshot, got {:?}", other),
        };
        assert!(h.chain.registry().is_full_snapshot(&full.snapshot.root).unwrap());
        assert_eq!(h.snapshot_dirs(), vec![full.snapshot.root.clone()]);

        // Existing but empty backup root
        let other = SnapTestHarness::new();
        other.write("a.txt", "a");
        fs::create_dir(&other.backups).unwrap();
        assert!(matches!(other.incremental(), SnapshotOutcome::PerformedFull(_)));
    }

    #[test]
    fn test_restore_prefers_incremental_entry() {
        let h = SnapTestHarness::new();
        h.write("x/y", "old");
        h.write("x/z", "untouched");
        h.full();

        h.write("x/y", "new and longer");
        h.touch_future("x/y");
        h.touch_future("x");

        let (snapshot, _) = expect_created(h.incremental());
        h.chain.restore(&snapshot.root, &h.restored).unwrap();

        assert_eq!(fs::read_to_string(h.restored.join("x/y")).unwrap(), "new and longer");
        assert_eq!(fs::read_to_string(h.restored.join("x/z")).unwrap(), "untouched");
    }

    #[test]
    fn test_restore_uses_preceding_full() {
        let h = SnapTestHarness::new();
        h.write("v.txt", "one");
        h.full();
        h.write("v.txt", "version two");
        h.touch_future("v.txt");
        let (first_incremental, _) = expect_created(h.incremental());

        h.write("w.txt", "later");
        let second_full = h.full();
        assert_eq!(h.chain.latest_full_snapshot(&h.backups).unwrap(), Some(second_full.snapshot));

        // The registry now points past the first incremental
        let result = h.chain.restore(&first_incremental.root, &h.restored).unwrap();
        assert_eq!(result.base.unwrap().id.as_str(), "2024-03-01_09-00-00");
        assert_eq!(fs::read_to_string(h.restored.join("v.txt")).unwrap(), "version two");
        assert!(!h.restored.join("w.txt").exists());
    }

    #[test]
    fn test_orphan_incremental_cannot_be_restored() {
        let h = SnapTestHarness::new();
        h.write("a.txt", "a");
        fs::create_dir_all(h.backups.join("2000-01-01_00-00-00")).unwrap();
        h.full();

        let err = h
            .chain
            .restore(&h.backups.join("2000-01-01_00-00-00"), &h.restored)
            .unwrap_err();
        assert!(matches!(err, SnapError::InvalidSnapshotChain(_)));
        assert!(!h.restored.exists());
    }

    #[test]
    fn test_legacy_registry_entry_still_resolves() {
        let h = SnapTestHarness::new();
        h.write("a.txt", "a");
        let full = h.full();

        // Older tools stored the absolute path of the snapshot
        fs::write(
            h.backups.join(registry::DEFAULT_REGISTRY_NAME),
            full.snapshot.root.display().to_string(),
        )
        .unwrap();

        h.write("b.txt", "b");
        let outcome = h.chain.incremental_snapshot(&h.source, &h.backups).unwrap();
        let base = match outcome {
            SnapshotOutcome::Created { base, .. } => base,
            other => panic!("expected an incremental snapshot, got {:?}", other),
        };
        assert_eq!(base.id, full.snapshot.id);
    }

    #[test]
    fn test_memory_registry_leaves_no_marker_files() {
        let registry = Arc::new(MemoryRegistry::new());
        let h = SnapTestHarness::with_registry(registry.clone());
        h.write("a.txt", "a");
        let full = h.full();

        assert!(!full.snapshot.root.join(registry::DEFAULT_MARKER_NAME).exists());
        assert!(!h.backups.join(registry::DEFAULT_REGISTRY_NAME).exists());
        assert_eq!(registry.marked(), vec![full.snapshot.root.clone()]);

        h.write("b.txt", "b");
        let (snapshot, _) = expect_created(h.incremental());
        let result = h.chain.restore(&snapshot.root, &h.restored).unwrap();
        assert_eq!(result.base.unwrap().root, full.snapshot.root);
        assert_eq!(read_tree(&h.restored), read_tree(&h.source));
    }

    #[test]
    fn test_listing_reports_kinds_in_order() {
        let h = SnapTestHarness::new();
        h.write("a.txt", "a");
        h.full();
        h.write("b.txt", "b");
        h.incremental();
        h.full();

        let kinds: Vec<_> = h
            .chain
            .list_snapshots(&h.backups)
            .unwrap()
            .into_iter()
            .map(|s| s.kind)
            .collect();
        assert_eq!(kinds, vec![SnapshotKind::Full, SnapshotKind::Incremental, SnapshotKind::Full]);
    }
}
