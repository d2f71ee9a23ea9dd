//! Main test module for snapchain
//!
//! This module includes all test suites:
//! - Integration tests for end-to-end snapshot chains
//! - Property-based tests for the classifier and the index
//! - Edge cases around names, links and odd destinations

pub mod integration;

#[cfg(test)]
mod edge_cases {
    use crate::integration::{expect_created, read_tree, SnapTestHarness};
    use ::snapchain::*;
    use std::fs;

    #[test]
    fn test_empty_directory() {
        let h = SnapTestHarness::new();

        let full = h.full();
        assert_eq!(full.stats.entries(), 0);
        assert!(h.incremental().is_no_changes());

        h.chain.restore(&full.snapshot.root, &h.restored).unwrap();
        assert!(read_tree(&h.restored).is_empty());
    }

    #[test]
    fn test_special_filenames() {
        let h = SnapTestHarness::new();
        let special_names = vec![
            "file with spaces.txt",
            "file-with-dashes.txt",
            "file.with.dots.txt",
            "file@with#special$chars.txt",
            "file(with)parens.txt",
            "file[with]brackets.txt",
            ".hidden",
        ];

        h.full();
        for name in &special_names {
            h.write(name, &format!("Content of {}", name));
        }

        let (snapshot, stats) = expect_created(h.incremental());
        assert_eq!(stats.entries_new, special_names.len());

        h.chain.restore(&snapshot.root, &h.restored).unwrap();
        assert_eq!(read_tree(&h.restored), read_tree(&h.source));
    }

    #[test]
    fn test_unicode_filenames() {
        let h = SnapTestHarness::new();
        let names = ["文件.txt", "файл.txt", "αρχείο.txt", "ファイル/中身.txt"];
        for name in &names {
            h.write(name, name);
        }

        let full = h.full();
        h.chain.restore(&full.snapshot.root, &h.restored).unwrap();
        assert_eq!(read_tree(&h.restored), read_tree(&h.source));
    }

    #[test]
    fn test_restore_merges_into_existing_destination() {
        let h = SnapTestHarness::new();
        h.write("a.txt", "from snapshot");
        let full = h.full();

        fs::create_dir_all(&h.restored).unwrap();
        fs::write(h.restored.join("a.txt"), "stale").unwrap();
        fs::write(h.restored.join("unrelated.txt"), "kept").unwrap();

        h.chain.restore(&full.snapshot.root, &h.restored).unwrap();
        assert_eq!(fs::read_to_string(h.restored.join("a.txt")).unwrap(), "from snapshot");
        assert_eq!(fs::read_to_string(h.restored.join("unrelated.txt")).unwrap(), "kept");
    }

    #[test]
    fn test_restore_into_file_fails() {
        let h = SnapTestHarness::new();
        h.write("a.txt", "a");
        let full = h.full();
        fs::write(&h.restored, "not a directory").unwrap();

        let err = h.chain.restore(&full.snapshot.root, &h.restored).unwrap_err();
        assert!(matches!(err, SnapError::NotADirectory(_)));
    }

    #[test]
    fn test_source_file_is_rejected() {
        let h = SnapTestHarness::new();
        let file = h.write("plain.txt", "x");

        let err = h.chain.full_snapshot(&file, &h.backups).unwrap_err();
        assert!(matches!(err, SnapError::NotADirectory(_)));
        assert!(!h.backups.exists());
    }

    #[test]
    fn test_backup_root_inside_source_is_rejected() {
        let h = SnapTestHarness::new();
        h.write("a.txt", "a");

        let err = h
            .chain
            .incremental_snapshot(&h.source, &h.source.join("nested/backups"))
            .unwrap_err();
        assert!(matches!(err, SnapError::InvalidConfiguration(_)));
        assert!(err.is_logic_error());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks() {
        use std::os::unix::fs::symlink;

        let h = SnapTestHarness::new();
        h.write("target.txt", "Target content");
        h.write("dir/inner.txt", "inner");
        symlink("target.txt", h.source.join("link.txt")).unwrap();
        symlink("dir", h.source.join("dir_link")).unwrap();
        symlink("/nonexistent/elsewhere", h.source.join("dangling")).unwrap();

        let full = h.full();
        assert_eq!(full.stats.symlinks, 3);

        // Links are stored as links, never followed
        let link_in_snapshot = full.snapshot.root.join("dir_link");
        assert!(fs::symlink_metadata(&link_in_snapshot).unwrap().file_type().is_symlink());

        h.chain.restore(&full.snapshot.root, &h.restored).unwrap();
        assert_eq!(read_tree(&h.restored), read_tree(&h.source));
        assert_eq!(fs::read_to_string(h.restored.join("link.txt")).unwrap(), "Target content");
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_retargeted_to_directory() {
        use std::os::unix::fs::symlink;

        let h = SnapTestHarness::new();
        h.write("entry/inner.txt", "now gone");
        h.full();

        fs::remove_dir_all(h.source.join("entry")).unwrap();
        symlink("somewhere", h.source.join("entry")).unwrap();

        let (snapshot, stats) = expect_created(h.incremental());
        assert_eq!(stats.entries_changed, 1);
        assert_eq!(fs::read_link(snapshot.root.join("entry")).unwrap(), std::path::Path::new("somewhere"));
    }
}
