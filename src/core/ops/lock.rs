//! core::ops::lock
//!
//! Exclusive lock scoping "read latest, compute next id, write commit".
//!
//! # Architecture
//!
//! Commit ids are derived from the number of commits already present, so
//! two writers that read the history at the same time would compute the
//! same id. Every append therefore runs inside a [`RepoLock`] held on the
//! repository's `lock` file. The client uses the same lock on its
//! workspace so a push and a local commit never interleave.
//!
//! The lock is an OS-level advisory lock (`fs2`). On Unix it is a `flock`,
//! which is owned by the open file description: two handles opened by two
//! threads of the same process conflict exactly like two processes do.
//!
//! # Invariants
//!
//! - The lock is held for the whole read-compute-write sequence
//! - The lock is released on drop (RAII)
//! - [`RepoLock::acquire`] waits for the holder; [`RepoLock::try_acquire`] fails fast
//!
//! # Example
//!
//! ```ignore
//! use pit::core::ops::lock::RepoLock;
//!
//! let lock = RepoLock::acquire(&paths.repo_lock_path(&repo))?;
//! let next = store.latest_commit(&repo)?.id.index() + 1;
//! // ... write commit `next` ...
//! drop(lock);
//! ```

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;

/// Errors from locking operations.
#[derive(Debug, Error)]
pub enum LockError {
    /// Another writer already holds the lock.
    #[error("repository is locked by another writer")]
    AlreadyLocked,

    /// Failed to create lock file or directory.
    #[error("failed to create lock: {0}")]
    CreateFailed(String),

    /// Failed to acquire the OS lock.
    #[error("failed to acquire lock: {0}")]
    AcquireFailed(String),

    /// Failed to release the lock.
    #[error("failed to release lock: {0}")]
    ReleaseFailed(String),
}

/// An exclusive lock on a repository or workspace.
///
/// Released when dropped, even if the holder panics.
#[derive(Debug)]
pub struct RepoLock {
    path: PathBuf,
    /// Held while `Some`.
    file: Option<File>,
}

impl RepoLock {
    /// Acquire the lock, waiting for any current holder to release it.
    ///
    /// Creates the lock file and its parent directory if needed.
    ///
    /// # Errors
    ///
    /// - [`LockError::CreateFailed`] if the lock file cannot be opened
    /// - [`LockError::AcquireFailed`] if the OS lock call fails
    pub fn acquire(path: &Path) -> Result<Self, LockError> {
        let file = Self::open(path)?;
        file.lock_exclusive()
            .map_err(|e| LockError::AcquireFailed(e.to_string()))?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Some(file),
        })
    }

    /// Try to acquire the lock without waiting.
    ///
    /// Returns `Ok(None)` if someone else holds it.
    pub fn try_acquire(path: &Path) -> Result<Option<Self>, LockError> {
        let file = Self::open(path)?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self {
                path: path.to_path_buf(),
                file: Some(file),
            })),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(None),
            Err(e) if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => Ok(None),
            Err(e) => Err(LockError::AcquireFailed(e.to_string())),
        }
    }

    /// Acquire without waiting, failing with [`LockError::AlreadyLocked`].
    pub fn acquire_now(path: &Path) -> Result<Self, LockError> {
        Self::try_acquire(path)?.ok_or(LockError::AlreadyLocked)
    }

    fn open(path: &Path) -> Result<File, LockError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                LockError::CreateFailed(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }
        OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| LockError::CreateFailed(format!("cannot open {}: {}", path.display(), e)))
    }

    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock before the guard goes out of scope.
    pub fn release(&mut self) -> Result<(), LockError> {
        if let Some(file) = self.file.take() {
            file.unlock()
                .map_err(|e| LockError::ReleaseFailed(e.to_string()))?;
        }
        Ok(())
    }
}

impl Drop for RepoLock {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = file.unlock();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;
    use tempfile::TempDir;

    fn lock_path(dir: &TempDir) -> PathBuf {
        dir.path().join("repo").join("lock")
    }

    #[test]
    fn acquire_creates_parent_and_holds() {
        let temp = TempDir::new().expect("create temp dir");
        let path = lock_path(&temp);

        let lock = RepoLock::acquire(&path).expect("acquire lock");
        assert!(lock.is_held());
        assert!(path.exists());
        assert_eq!(lock.path(), path);
    }

    #[test]
    fn second_try_acquire_returns_none() {
        let temp = TempDir::new().expect("create temp dir");
        let path = lock_path(&temp);

        let _held = RepoLock::acquire(&path).expect("first acquire");
        assert!(RepoLock::try_acquire(&path).expect("try").is_none());
        assert!(matches!(
            RepoLock::acquire_now(&path),
            Err(LockError::AlreadyLocked)
        ));
    }

    #[test]
    fn released_on_drop() {
        let temp = TempDir::new().expect("create temp dir");
        let path = lock_path(&temp);

        {
            let _lock = RepoLock::acquire(&path).expect("first acquire");
        }
        let again = RepoLock::try_acquire(&path).expect("try");
        assert!(again.is_some());
    }

    #[test]
    fn explicit_release_is_idempotent() {
        let temp = TempDir::new().expect("create temp dir");
        let path = lock_path(&temp);

        let mut lock = RepoLock::acquire(&path).expect("acquire");
        lock.release().expect("first release");
        lock.release().expect("second release");
        assert!(!lock.is_held());
        assert!(RepoLock::try_acquire(&path).expect("try").is_some());
    }

    #[test]
    fn acquire_serializes_threads() {
        let temp = TempDir::new().expect("create temp dir");
        let path = Arc::new(lock_path(&temp));
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let path = Arc::clone(&path);
                let inside = Arc::clone(&inside);
                let max_seen = Arc::clone(&max_seen);
                thread::spawn(move || {
                    let _lock = RepoLock::acquire(&path).expect("acquire");
                    let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                    max_seen.fetch_max(now, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(10));
                    inside.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("join");
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn error_display_formatting() {
        assert!(LockError::AlreadyLocked.to_string().contains("locked"));
        assert!(LockError::CreateFailed("x".into())
            .to_string()
            .contains("create"));
        assert!(LockError::AcquireFailed("x".into())
            .to_string()
            .contains("acquire"));
        assert!(LockError::ReleaseFailed("x".into())
            .to_string()
            .contains("release"));
    }
}
