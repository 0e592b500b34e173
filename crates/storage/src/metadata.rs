//! Persistence of per-resource cache metadata.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tempfile::NamedTempFile;
use tracing::instrument;

/// Fixed name of the metadata file inside each resource directory.
pub const INFO_FILE: &str = "video.info";

/// How [`MetadataStore`] serializes access to metadata files.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LockStrategy {
    /// One lock for every metadata file: access to different resources also
    /// serializes.
    #[default]
    Global,
    /// One lock per resource directory.
    PerDirectory,
}

#[derive(Debug)]
enum Locks {
    Global(Mutex<()>),
    PerDirectory(Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>),
}

/// Reads and writes the [`INFO_FILE`] of resource directories.
///
/// The record type is opaque to the store: anything serde can round-trip is
/// stored as JSON. No record is cached in memory, so every load re-reads the
/// disk. Within one process a given metadata file never has a reader and a
/// writer at the same time; clones share the same locks. Nothing guards
/// against a second process using the same cache directory.
#[derive(Clone, Debug)]
pub struct MetadataStore {
    locks: Arc<Locks>,
}
impl Default for MetadataStore {
    fn default() -> Self {
        Self::new(LockStrategy::default())
    }
}
impl MetadataStore {
    pub fn new(strategy: LockStrategy) -> Self {
        let locks = match strategy {
            LockStrategy::Global => Locks::Global(Mutex::new(())),
            LockStrategy::PerDirectory => Locks::PerDirectory(Mutex::new(HashMap::new())),
        };
        Self { locks: Arc::new(locks) }
    }

    pub fn strategy(&self) -> LockStrategy {
        match *self.locks {
            Locks::Global(_) => LockStrategy::Global,
            Locks::PerDirectory(_) => LockStrategy::PerDirectory,
        }
    }

    fn exclusive<T>(&self, dir: &Path, f: impl FnOnce() -> T) -> T {
        // The locks guard no data, so a panic while holding one leaves
        // nothing inconsistent behind: ignore poisoning.
        match &*self.locks {
            Locks::Global(lock) => {
                let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
                f()
            },
            Locks::PerDirectory(locks) => {
                // Keyed on the path as given: canonicalizing would change the
                // key once a missing directory is created.
                let key = dir.to_path_buf();
                let lock = Arc::clone(locks.lock().unwrap_or_else(PoisonError::into_inner).entry(key.clone()).or_default());
                let result = {
                    let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
                    f()
                };
                // Clones are only handed out under the map lock, so a count of
                // two (map and ours) means nobody else is waiting on it.
                let mut map = locks.lock().unwrap_or_else(PoisonError::into_inner);
                if Arc::strong_count(&lock) == 2 {
                    map.remove(&key);
                }
                drop(lock);
                result
            },
        }
    }

    #[cfg(test)]
    fn tracked_directories(&self) -> usize {
        match &*self.locks {
            Locks::Global(_) => 0,
            Locks::PerDirectory(locks) => locks.lock().unwrap_or_else(PoisonError::into_inner).len(),
        }
    }

    /// Load the record stored in `dir`.
    ///
    /// A missing file and a corrupt file both come back as [`None`]: either
    /// way the caller should rebuild the record from scratch. Use
    /// [`try_load`](Self::try_load) to tell them apart.
    pub fn load<T: DeserializeOwned>(&self, dir: &Path) -> Option<T> {
        match self.try_load(dir) {
            Ok(info) => info,
            Err(e) => {
                tracing::warn!(path = %dir.display(), error = ?e, "Could not load cache metadata");
                None
            },
        }
    }

    /// Load the record stored in `dir`, or `Ok(None)` if there isn't one.
    ///
    /// # Errors
    /// [`Corrupt`](ErrorKind::Corrupt) if the file doesn't deserialize, or an
    /// I/O category if it can't be read.
    #[instrument(level = "debug", skip(self))]
    pub fn try_load<T: DeserializeOwned>(&self, dir: &Path) -> Result<Option<T>> {
        let path = dir.join(INFO_FILE);
        let bytes = match self.exclusive(dir, || fs::read(&path)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No cache metadata stored");
                return Ok(None);
            },
            Err(e) => exn::bail!(ErrorKind::from_io(e, &path)),
        };
        let info = serde_json::from_slice(&bytes).or_raise(|| ErrorKind::Corrupt(path.clone()))?;
        Ok(Some(info))
    }

    /// Store `info` in `dir`, returning whether it was written.
    ///
    /// A failed save is abandoned and logged; the previous record (if any)
    /// remains in place.
    pub fn save<T: Serialize>(&self, info: &T, dir: &Path) -> bool {
        match self.try_save(info, dir) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(path = %dir.display(), error = ?e, "Could not save cache metadata");
                false
            },
        }
    }

    /// Store `info` in `dir`.
    ///
    /// The record is written to a temporary file in `dir`, synced, then
    /// renamed over [`INFO_FILE`], so readers only ever see a complete record.
    /// `dir` must already exist.
    #[instrument(level = "debug", skip(self, info))]
    pub fn try_save<T: Serialize>(&self, info: &T, dir: &Path) -> Result<()> {
        let bytes = serde_json::to_vec(info).or_raise(|| ErrorKind::Serialize)?;
        let path = dir.join(INFO_FILE);
        self.exclusive(dir, || -> Result<()> {
            let mut temp = NamedTempFile::new_in(dir).map_err(|e| ErrorKind::from_io(e, dir))?;
            temp.write_all(&bytes).map_err(ErrorKind::Io)?;
            temp.as_file().sync_all().map_err(ErrorKind::Io)?;
            temp.persist(&path).map_err(|e| ErrorKind::from_io(e.error, &path))?;
            Ok(())
        })?;
        tracing::trace!(path = %path.display(), bytes = bytes.len(), "Saved cache metadata");
        Ok(())
    }
}
