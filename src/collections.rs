//! Path-keyed collection aliases that switch between gxhash and std
//! collections based on the `gxhash` feature. gxhash needs AES-NI and SSE2
//! target features, so the std maps are the portable default.
//!
//! Both backends implement `Default`; construct with `PathMap::default()`.

use std::path::PathBuf;

/// Map keyed by relative paths
#[cfg(feature = "gxhash")]
pub type PathMap<V> = gxhash::HashMap<PathBuf, V>;

/// Set of relative paths
#[cfg(feature = "gxhash")]
pub type PathSet = gxhash::HashSet<PathBuf>;

/// Map keyed by relative paths
#[cfg(not(feature = "gxhash"))]
pub type PathMap<V> = std::collections::HashMap<PathBuf, V>;

/// Set of relative paths
#[cfg(not(feature = "gxhash"))]
pub type PathSet = std::collections::HashSet<PathBuf>;
