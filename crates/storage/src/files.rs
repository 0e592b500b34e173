//! Filesystem helpers for cached resource directories.

use crate::error::{Error, ErrorKind, Result};
use filetime::FileTime;
use std::fs::{self, File};
use std::io;
use std::path::Path;
use tracing::instrument;

/// Name of the throwaway file used to bump a directory's timestamp.
const SENTINEL_NAME: &str = "tempFile";
/// Filesystems with coarse timestamps (FAT: 2 seconds) round what they store.
const MTIME_SLACK_SECONDS: i64 = 2;

/// Outcome of [`touch_now`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Touched {
    /// Nothing exists at the path; nothing was done.
    Missing,
    /// The modification time was set directly.
    Updated,
    /// Setting the modification time failed or was ignored by the filesystem,
    /// so a sentinel file was created and deleted to bump the directory instead.
    Fallback,
}

/// Mark `path` as used right now, for [LRU ordering](crate::lru_entries).
///
/// Some platforms accept an mtime update but silently drop it. When the
/// update fails or does not stick, a sentinel file is created and immediately
/// deleted inside the directory (`path` itself, or its parent for a file) to
/// bump the directory's timestamp instead. That fallback is best effort: this
/// function never fails.
#[instrument(level = "trace")]
pub fn touch_now(path: &Path) -> Touched {
    touch_with(path, |path, time| filetime::set_file_mtime(path, time))
}

fn touch_with<F>(path: &Path, set_mtime: F) -> Touched
where
    F: Fn(&Path, FileTime) -> io::Result<()>,
{
    if !path.exists() {
        return Touched::Missing;
    }
    let now = FileTime::now();
    match set_mtime(path, now) {
        Ok(()) if mtime_applied(path, now) => return Touched::Updated,
        Ok(()) => tracing::debug!(path = %path.display(), "Modification time was ignored by the filesystem"),
        Err(e) => tracing::debug!(path = %path.display(), error = %e, "Could not set modification time"),
    }
    let dir = match path.is_dir() {
        true => path,
        false => path.parent().unwrap_or(path),
    };
    let sentinel = dir.join(SENTINEL_NAME);
    if let Err(e) = File::create(&sentinel).and_then(|_| fs::remove_file(&sentinel)) {
        tracing::warn!(path = %sentinel.display(), error = %e, "Could not bump directory timestamp");
    }
    Touched::Fallback
}

fn mtime_applied(path: &Path, requested: FileTime) -> bool {
    fs::metadata(path)
        .map(|m| FileTime::from_last_modification_time(&m))
        .is_ok_and(|actual| actual.unix_seconds() + MTIME_SLACK_SECONDS >= requested.unix_seconds())
}

/// Size in bytes of a file, or of a directory's direct children.
///
/// For a directory only one level is summed: each child contributes its own
/// reported length, so a nested directory counts for its directory-entry size
/// rather than for its contents. Eviction accounting is calibrated against
/// this number, so it is kept as-is rather than turned into a full walk.
/// Anything that cannot be inspected counts as zero.
pub fn recursive_size(path: &Path) -> u64 {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(_) => return 0,
    };
    if !metadata.is_dir() {
        return metadata.len();
    }
    match fs::read_dir(path) {
        Ok(entries) => entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| fs::metadata(entry.path()).ok())
            .map(|metadata| metadata.len())
            .sum(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Could not list directory for sizing");
            0
        },
    }
}

/// Sum of [`recursive_size`] over `paths`.
pub fn total_size<P: AsRef<Path>>(paths: impl IntoIterator<Item = P>) -> u64 {
    paths.into_iter().map(|p| recursive_size(p.as_ref())).sum()
}

/// Delete a file, or a directory and everything below it.
///
/// Returns `true` only if the whole subtree is gone. A failure does not stop
/// the walk: every sibling is still attempted, so as much as possible is
/// removed even when `false` is returned.
pub fn recursive_delete(path: &Path) -> bool {
    match try_recursive_delete(path) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = ?e, "Could not completely delete cache path");
            false
        },
    }
}

/// [`recursive_delete`], reporting the first failure encountered.
#[instrument(level = "debug")]
pub fn try_recursive_delete(path: &Path) -> Result<()> {
    let mut first_error = None;
    remove_tree(path, &|file: &Path| fs::remove_file(file), &mut first_error);
    match first_error {
        None => Ok(()),
        Some(e) => Err(e),
    }
}

fn remove_tree<F>(path: &Path, remove_file: &F, first_error: &mut Option<Error>)
where
    F: Fn(&Path) -> io::Result<()>,
{
    // Never follow a symlink into a directory that lives outside the cache.
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) => return record_failure(first_error, ErrorKind::from_io(e, path)),
    };
    if !metadata.is_dir() {
        if let Err(e) = remove_file(path) {
            record_failure(first_error, ErrorKind::from_io(e, path));
        }
        return;
    }
    match fs::read_dir(path) {
        Ok(entries) => {
            for entry in entries {
                match entry {
                    Ok(entry) => remove_tree(&entry.path(), remove_file, first_error),
                    Err(e) => record_failure(first_error, ErrorKind::from_io(e, path)),
                }
            }
        },
        Err(e) => record_failure(first_error, ErrorKind::from_io(e, path)),
    }
    if let Err(e) = fs::remove_dir(path) {
        record_failure(first_error, ErrorKind::from_io(e, path));
    }
}

#[track_caller]
fn record_failure(first_error: &mut Option<Error>, kind: ErrorKind) {
    tracing::debug!(error = %kind, "Deletion failed; continuing with siblings");
    if first_error.is_none() {
        *first_error = Some(Error::from(kind));
    }
}

/// Delete a file, or a directory holding only files, stopping at the first
/// failure.
///
/// Unlike [`recursive_delete`] this does not descend: a non-empty
/// subdirectory cannot be removed and aborts the whole operation.
pub fn delete_flat(path: &Path) -> bool {
    let result = (|| -> io::Result<()> {
        if !path.is_dir() {
            return fs::remove_file(path);
        }
        for entry in fs::read_dir(path)? {
            let child = entry?.path();
            match child.is_dir() {
                true => fs::remove_dir(&child)?,
                false => fs::remove_file(&child)?,
            }
        }
        fs::remove_dir(path)
    })();
    if let Err(e) = &result {
        tracing::warn!(path = %path.display(), error = %e, "Could not delete cache path");
    }
    result.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::{Duration, SystemTime};

    fn write(path: &Path, bytes: usize) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, vec![0u8; bytes]).unwrap();
    }

    fn set_mtime(path: &Path, seconds_ago: u64) {
        let then = SystemTime::now() - Duration::from_secs(seconds_ago);
        filetime::set_file_mtime(path, FileTime::from_system_time(then)).unwrap();
    }

    /// Removes files like `fs::remove_file`, except anything named `denied`.
    fn remove_unless(denied: &'static str) -> impl Fn(&Path) -> io::Result<()> {
        move |path: &Path| match path.file_name().is_some_and(|name| name == denied) {
            true => Err(io::Error::from(io::ErrorKind::PermissionDenied)),
            false => fs::remove_file(path),
        }
    }

    #[test]
    fn test_touch_missing() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert_eq!(touch_now(&temp_dir.path().join("nope")), Touched::Missing);
    }

    #[test]
    fn test_touch_updates_mtime() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file = temp_dir.path().join("segment.ts");
        write(&file, 4);
        set_mtime(&file, 3600);
        assert_eq!(touch_now(&file), Touched::Updated);
        let modified = fs::metadata(&file).unwrap().modified().unwrap();
        assert!(modified > SystemTime::now() - Duration::from_secs(60));
        // The fallback sentinel is never left behind.
        assert!(!temp_dir.path().join(SENTINEL_NAME).exists());
    }

    #[test]
    fn test_touch_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dir = temp_dir.path().join("abc");
        fs::create_dir(&dir).unwrap();
        set_mtime(&dir, 3600);
        assert_ne!(touch_now(&dir), Touched::Missing);
        assert!(!dir.join(SENTINEL_NAME).exists());
        let modified = fs::metadata(&dir).unwrap().modified().unwrap();
        assert!(modified > SystemTime::now() - Duration::from_secs(60));
    }

    #[test]
    fn test_touch_falls_back_when_mtime_fails() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dir = temp_dir.path().join("abc");
        write(&dir.join("0.ts"), 1);
        set_mtime(&dir, 3600);
        let touched = touch_with(&dir.join("0.ts"), |_, _| Err(io::Error::from(io::ErrorKind::Unsupported)));
        assert_eq!(touched, Touched::Fallback);
        assert!(!dir.join(SENTINEL_NAME).exists());
        let modified = fs::metadata(&dir).unwrap().modified().unwrap();
        assert!(modified > SystemTime::now() - Duration::from_secs(60));
    }

    #[test]
    fn test_touch_falls_back_when_mtime_ignored() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dir = temp_dir.path().join("abc");
        fs::create_dir(&dir).unwrap();
        set_mtime(&dir, 3600);
        // Accepts the update and does nothing, like a filesystem that drops it.
        let touched = touch_with(&dir, |_, _| Ok(()));
        assert_eq!(touched, Touched::Fallback);
        assert!(!dir.join(SENTINEL_NAME).exists());
        let modified = fs::metadata(&dir).unwrap().modified().unwrap();
        assert!(modified > SystemTime::now() - Duration::from_secs(60));
    }

    #[test]
    fn test_size_of_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file = temp_dir.path().join("a.ts");
        write(&file, 123);
        assert_eq!(recursive_size(&file), 123);
    }

    #[test]
    fn test_size_of_missing_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert_eq!(recursive_size(&temp_dir.path().join("missing")), 0);
    }

    #[test]
    fn test_size_sums_one_level() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dir = temp_dir.path().join("abc");
        write(&dir.join("0.ts"), 100);
        write(&dir.join("1.ts"), 50);
        write(&dir.join("nested/2.ts"), 10_000);
        let nested_entry = fs::metadata(dir.join("nested")).unwrap().len();
        // The nested file's contents are not included, only the directory entry.
        assert_eq!(recursive_size(&dir), 150 + nested_entry);
    }

    #[test]
    fn test_total_size() {
        let temp_dir = tempfile::tempdir().unwrap();
        let a = temp_dir.path().join("a/0.ts");
        let b = temp_dir.path().join("b.ts");
        write(&a, 10);
        write(&b, 5);
        assert_eq!(total_size([temp_dir.path().join("a"), b]), 15);
        assert_eq!(total_size(Vec::<PathBuf>::new()), 0);
    }

    #[test]
    fn test_recursive_delete_tree() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path().join("abc");
        write(&root.join("0.ts"), 1);
        write(&root.join("a/1.ts"), 1);
        write(&root.join("a/b/2.ts"), 1);
        assert!(recursive_delete(&root));
        assert!(!root.exists());
    }

    #[test]
    fn test_recursive_delete_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file = temp_dir.path().join("0.ts");
        write(&file, 1);
        assert!(recursive_delete(&file));
        assert!(!file.exists());
    }

    #[test]
    fn test_recursive_delete_missing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let missing = temp_dir.path().join("missing");
        assert!(!recursive_delete(&missing));
        let err = try_recursive_delete(&missing).unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(p) if *p == missing));
    }

    #[test]
    fn test_recursive_delete_continues_after_failure() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path().join("abc");
        write(&root.join("0.ts"), 1);
        write(&root.join("locked/1.ts"), 1);
        write(&root.join("locked/3.ts"), 1);
        write(&root.join("z/2.ts"), 1);
        let mut first_error = None;
        remove_tree(&root, &remove_unless("1.ts"), &mut first_error);
        let err = first_error.expect("a failure is reported");
        assert!(matches!(&*err, ErrorKind::PermissionDenied(p) if *p == root.join("locked/1.ts")));
        assert!(root.join("locked/1.ts").exists());
        assert!(!root.join("locked/3.ts").exists());
        assert!(!root.join("0.ts").exists());
        assert!(!root.join("z").exists());
    }

    #[test]
    fn test_delete_flat() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path().join("abc");
        write(&root.join("0.ts"), 1);
        write(&root.join("1.ts"), 1);
        fs::create_dir(root.join("empty")).unwrap();
        assert!(delete_flat(&root));
        assert!(!root.exists());
    }

    #[test]
    fn test_delete_flat_does_not_descend() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path().join("abc");
        write(&root.join("nested/0.ts"), 1);
        assert!(!delete_flat(&root));
        assert!(root.join("nested/0.ts").exists());
    }
}
