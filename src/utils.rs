//! Utility functions shared across snapchain
//!
//! Path arithmetic, atomic single-value writes, cross-platform symlink
//! creation and human-readable byte counts.

use crate::error::{IoResultExt, Result, SnapError};
use std::fs;
use std::path::{Path, PathBuf};

/// Make a path relative to a base path
///
/// Strips `base` lexically so that symbolic links inside the tree are never
/// resolved; every path handed to this function comes from a walk rooted at
/// `base`.
///
/// # Errors
///
/// - [`SnapError::Internal`] if `path` does not live under `base`
///
/// # Example
///
/// ```rust,ignore
/// use crate::utils::make_relative;
/// use std::path::{Path, PathBuf};
///
/// let relative = make_relative(Path::new("/snap/src/main.rs"), Path::new("/snap"))?;
/// assert_eq!(relative, PathBuf::from("src/main.rs"));
/// ```
pub fn make_relative(path: &Path, base: &Path) -> Result<PathBuf> {
    path.strip_prefix(base)
        .map(Path::to_path_buf)
        .map_err(|_| SnapError::internal(format!("Path {:?} is not relative to {:?}", path, base)))
}

/// Absolute, symlink-free form of `path`, which need not exist yet.
///
/// The longest existing ancestor is canonicalized and the missing tail is
/// appended unchanged.
pub fn resolve_path(path: &Path) -> Result<PathBuf> {
    let mut existing = path;
    let mut missing = Vec::new();

    loop {
        let probe = if existing.as_os_str().is_empty() {
            Path::new(".")
        } else {
            existing
        };
        match fs::canonicalize(probe) {
            Ok(resolved) => {
                return Ok(missing.iter().rev().fold(resolved, |acc, part| acc.join(part)));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                match (existing.parent(), existing.file_name()) {
                    (Some(parent), Some(name)) => {
                        missing.push(name.to_os_string());
                        existing = parent;
                    }
                    _ => return Err(SnapError::io(path, e)),
                }
            }
            Err(e) => return Err(SnapError::io(path, e)),
        }
    }
}

/// Format bytes in human-readable form
///
/// Uses binary units (1024-based). Values below 1 KB are printed as whole
/// numbers, everything else with two decimals.
///
/// ```rust,ignore
/// assert_eq!(format_bytes(1023), "1023 B");
/// assert_eq!(format_bytes(1536), "1.50 KB");
/// ```
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", size as u64, UNITS[unit_idx])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}

/// Atomic file write (write to temp file then rename)
///
/// Readers of `path` see either the previous content or the new content,
/// never a truncated file. The temporary file sits next to the target so the
/// rename stays on one filesystem.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let mut temp_name = path
        .file_name()
        .ok_or_else(|| SnapError::internal(format!("{:?} has no file name", path)))?
        .to_os_string();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    fs::write(&temp_path, content).at(&temp_path)?;
    fs::rename(&temp_path, path).at(path)?;

    Ok(())
}

/// Create a symlink (cross-platform)
#[cfg(unix)]
pub fn create_symlink(target: &Path, link: &Path) -> Result<()> {
    std::os::unix::fs::symlink(target, link).at(link)
}

/// Create a symlink (Windows)
#[cfg(windows)]
pub fn create_symlink(target: &Path, link: &Path) -> Result<()> {
    use std::os::windows::fs::{symlink_dir, symlink_file};

    // Resolve relative targets against the link's directory to pick the flavour
    let resolved = link.parent().map(|p| p.join(target)).unwrap_or_else(|| target.to_path_buf());
    if resolved.is_dir() {
        symlink_dir(target, link).at(link)
    } else {
        symlink_file(target, link).at(link)
    }
}
