//! Least-recently-used ordering of cache entries.

use crate::files::{recursive_delete, recursive_size};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use time::OffsetDateTime;
use tracing::instrument;

/// A direct child of the cache root, as seen at listing time.
///
/// Entries are computed on demand and never persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheEntry {
    /// Absolute path of the file or resource directory.
    pub path: PathBuf,
    /// Last modification (used as last access) time.
    pub modified: OffsetDateTime,
    /// Size as reported by [`recursive_size`].
    pub size: u64,
}
impl CacheEntry {
    fn new(path: PathBuf) -> Self {
        // An unreadable timestamp sorts first, making the entry the first
        // candidate for eviction.
        let modified = fs::metadata(&path).and_then(|m| m.modified()).unwrap_or(SystemTime::UNIX_EPOCH).into();
        let size = recursive_size(&path);
        Self { path, modified, size }
    }
}

/// Direct children of `dir`, oldest modification first.
///
/// Entries with equal timestamps are ordered by path so the result doesn't
/// depend on directory listing order. A missing or unreadable `dir` yields an
/// empty list.
pub fn lru_entries(dir: &Path) -> Vec<CacheEntry> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!(path = %dir.display(), error = %e, "Could not list cache directory");
            return Vec::new();
        },
    };
    let mut entries: Vec<CacheEntry> = entries.filter_map(|e| e.ok()).map(|e| CacheEntry::new(e.path())).collect();
    entries.sort_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.path.cmp(&b.path)));
    entries
}

/// Paths of the direct children of `dir`, least recently used first.
///
/// Eviction consumes this front to back until enough space is freed.
pub fn list_by_least_recently_used(dir: &Path) -> Vec<PathBuf> {
    lru_entries(dir).into_iter().map(|entry| entry.path).collect()
}

/// What [`trim_to_budget`] did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EvictionReport {
    /// Entries deleted, in eviction order.
    pub removed: Vec<PathBuf>,
    /// Entries that could not be (completely) deleted.
    pub failed: Vec<PathBuf>,
    /// Bytes released.
    pub freed: u64,
    /// Size of the cache after eviction.
    pub remaining: u64,
}

/// Evict least recently used entries of `dir` until it fits in `max_bytes`.
#[instrument(level = "debug", fields(removed, freed))]
pub fn trim_to_budget(dir: &Path, max_bytes: u64) -> EvictionReport {
    let entries = lru_entries(dir);
    let mut report = EvictionReport {
        remaining: entries.iter().map(|e| e.size).sum(),
        ..Default::default()
    };
    for entry in entries {
        if report.remaining <= max_bytes {
            break;
        }
        let freed = match recursive_delete(&entry.path) {
            true => {
                report.removed.push(entry.path);
                entry.size
            },
            false => {
                // Whatever did get deleted still counts.
                let left = recursive_size(&entry.path);
                report.failed.push(entry.path);
                entry.size.saturating_sub(left)
            },
        };
        report.freed += freed;
        report.remaining = report.remaining.saturating_sub(freed);
    }
    let span = tracing::Span::current();
    span.record("removed", report.removed.len());
    span.record("freed", report.freed);
    if report.remaining > max_bytes {
        tracing::warn!(remaining = report.remaining, max_bytes, "Cache is still over budget after eviction");
    }
    report
}
