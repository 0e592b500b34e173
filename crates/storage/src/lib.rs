//! On-disk bookkeeping for the video proxy cache.
//!
//! The filesystem is the single source of truth. The cache root holds one
//! directory per resource, named after the [cache key](vcache_keys::compute_key)
//! of the resource URL; each directory holds the cached segments plus at most
//! one [`INFO_FILE`] describing them. Nothing here keeps state between calls
//! apart from the [`MetadataStore`] lock.
//!
//! Failures at this layer degrade to cache misses: most operations come in a
//! sentinel flavour (`Option`, `bool`) for callers that only need to know
//! whether to rebuild, and a `try_` flavour returning a [`Result`](error::Result)
//! when the distinction matters.

pub mod error;
mod files;
mod info;
mod lru;
mod metadata;

pub use crate::files::{Touched, delete_flat, recursive_delete, recursive_size, total_size, touch_now, try_recursive_delete};
pub use crate::info::CacheInfo;
pub use crate::lru::{CacheEntry, EvictionReport, list_by_least_recently_used, lru_entries, trim_to_budget};
pub use crate::metadata::{INFO_FILE, LockStrategy, MetadataStore};
use std::path::{Path, PathBuf};

/// Directory holding the cached data of `url` under the cache `root`.
pub fn resource_dir(root: impl AsRef<Path>, url: impl AsRef<str>) -> PathBuf {
    root.as_ref().join(vcache_keys::compute_key(url))
}
