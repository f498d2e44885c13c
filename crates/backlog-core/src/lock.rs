//! Per-backlog advisory locks.
//!
//! Reordering reads a window of ranks and writes shifted values back, so two
//! concurrent reorders in the same backlog must not interleave. Each backlog
//! gets its own lock file (`backlog-<id>.lock`) under the lock directory;
//! different backlogs never contend with each other.

use crate::error::ErrorCode;
use crate::model::BacklogId;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("backlog {backlog} is locked by another writer (waited {waited:?} on {})", path.display())]
    Contended {
        backlog: BacklogId,
        path: PathBuf,
        waited: Duration,
    },

    #[error("cannot lock {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl LockError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Contended { .. } => ErrorCode::LockContention,
            Self::Io { .. } => ErrorCode::StorageFailed,
        }
    }
}

/// Where backlog lock files live and how long to wait for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockSettings {
    pub dir: PathBuf,
    pub timeout: Duration,
}

impl LockSettings {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            dir: dir.into(),
            timeout,
        }
    }

    #[must_use]
    pub fn path_for(&self, backlog: BacklogId) -> PathBuf {
        self.dir.join(format!("backlog-{backlog}.lock"))
    }

    /// Take the exclusive lock of `backlog`, polling until the timeout.
    ///
    /// # Errors
    ///
    /// [`LockError::Contended`] when another holder keeps the lock past the
    /// timeout, [`LockError::Io`] when the lock file cannot be created or
    /// locking fails for any reason other than contention.
    pub fn acquire(&self, backlog: BacklogId) -> Result<BacklogLock, LockError> {
        let path = self.path_for(backlog);
        let io_err = |source| LockError::Io {
            path: path.clone(),
            source,
        };
        std::fs::create_dir_all(&self.dir).map_err(io_err)?;
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(io_err)?;

        let started = Instant::now();
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => break,
                Err(err) if is_contended(&err) => {
                    let waited = started.elapsed();
                    if waited >= self.timeout {
                        tracing::debug!(backlog = %backlog, ?waited, "backlog lock contended");
                        return Err(LockError::Contended {
                            backlog,
                            path,
                            waited,
                        });
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(source) => return Err(LockError::Io { path, source }),
            }
        }

        Ok(BacklogLock {
            backlog,
            file,
            path,
        })
    }
}

/// Whether `err` means another holder has the lock.
fn is_contended(err: &io::Error) -> bool {
    err.kind() == fs2::lock_contended_error().kind()
}

/// Exclusive hold on one backlog's rank space. Unlocked on drop.
#[derive(Debug)]
pub struct BacklogLock {
    backlog: BacklogId,
    file: File,
    path: PathBuf,
}

impl BacklogLock {
    #[must_use]
    pub const fn backlog(&self) -> BacklogId {
        self.backlog
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for BacklogLock {
    fn drop(&mut self) {
        if let Err(err) = self.file.unlock() {
            tracing::warn!(backlog = %self.backlog, error = %err, "failed to unlock backlog");
        }
    }
}
