//! Cross-process reader-writer discipline.
//!
//! One empty token file at the store root carries an advisory lock.
//! Readers take it shared, the writer takes it exclusive, and every
//! operation holds its guard from before the config is consulted until
//! after the last data file is touched.
//!
//! Each acquisition opens a fresh handle. Advisory locks are tracked per
//! open file description, so fresh handles contend correctly whether the
//! competing holder lives in another process or another thread of this
//! one, and releasing one guard can never release another's lock.

use std::fs::{File, OpenOptions};
use std::path::PathBuf;

use fs2::FileExt;
use tracing::trace;

use crate::error::Result;

/// Handle on the store's lock token file.
#[derive(Debug)]
pub(crate) struct LockFile {
    path: PathBuf,
}

/// A held lock; dropping it releases the lock.
#[derive(Debug)]
pub(crate) struct LockGuard {
    _file: File,
}

impl LockFile {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Block until a shared (reader) lock is granted.
    pub(crate) fn shared(&self) -> Result<LockGuard> {
        let file = self.open()?;
        file.lock_shared()?;
        trace!(path = %self.path.display(), "shared lock acquired");
        Ok(LockGuard { _file: file })
    }

    /// Block until the exclusive (writer) lock is granted.
    pub(crate) fn exclusive(&self) -> Result<LockGuard> {
        let file = self.open()?;
        file.lock_exclusive()?;
        trace!(path = %self.path.display(), "exclusive lock acquired");
        Ok(LockGuard { _file: file })
    }

    fn open(&self) -> Result<File> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)?;
        Ok(file)
    }
}

// ---- tests ----

#[cfg(test)]
mod tests {
    use super::*;

    fn probe(path: &std::path::Path) -> File {
        OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .unwrap()
    }

    #[test]
    fn shared_locks_coexist() {
        let dir = tempfile::tempdir().unwrap();
        let lock = LockFile::new(dir.path().join(".LOCK"));
        let first = lock.shared().unwrap();
        let second = lock.shared().unwrap();
        drop(first);
        drop(second);
    }

    #[test]
    fn exclusive_lock_blocks_others() {
        let dir = tempfile::tempdir().unwrap();
        let lock = LockFile::new(dir.path().join(".LOCK"));
        let guard = lock.exclusive().unwrap();

        let outsider = probe(&dir.path().join(".LOCK"));
        assert!(outsider.try_lock_shared().is_err());
        assert!(outsider.try_lock_exclusive().is_err());

        drop(guard);
        assert!(outsider.try_lock_shared().is_ok());
    }

    #[test]
    fn shared_lock_blocks_writers_only() {
        let dir = tempfile::tempdir().unwrap();
        let lock = LockFile::new(dir.path().join(".LOCK"));
        let guard = lock.shared().unwrap();

        let outsider = probe(&dir.path().join(".LOCK"));
        assert!(outsider.try_lock_exclusive().is_err());
        assert!(outsider.try_lock_shared().is_ok());
        outsider.unlock().unwrap();

        drop(guard);
        assert!(outsider.try_lock_exclusive().is_ok());
    }

    #[test]
    fn dropping_one_guard_keeps_the_other() {
        let dir = tempfile::tempdir().unwrap();
        let lock = LockFile::new(dir.path().join(".LOCK"));
        let keep = lock.shared().unwrap();
        let release = lock.shared().unwrap();
        drop(release);

        // Still read-locked by `keep`.
        let outsider = probe(&dir.path().join(".LOCK"));
        assert!(outsider.try_lock_exclusive().is_err());
        drop(keep);
        assert!(outsider.try_lock_exclusive().is_ok());
    }
}
