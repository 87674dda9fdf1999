//! Repository locking for concurrent safety.
//!
//! Uses advisory file locks (`flock(2)` on Unix) via the `fs2` crate.
//! The OS releases the lock when a process crashes, so no PID tracking
//! or stale lock detection is needed. Locking is purely advisory and
//! changes no observable command semantics.

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::time::{Duration, Instant};

use fs2::FileExt;

use crate::error::{GitletError, GitletResult};

/// Name of the lock file inside `.gitlet/`.
const LOCK_FILE: &str = "gitlet.lock";

/// An exclusive repository lock.
///
/// Held for the lifetime of the value; dropping it releases the lock.
pub struct RepoLock {
    _file: File,
}

impl RepoLock {
    /// Acquire an exclusive lock on the repository.
    ///
    /// Polls with a short sleep interval until the lock is acquired or
    /// the timeout expires.
    pub fn acquire(gitlet_dir: &Path, timeout: Duration) -> GitletResult<Self> {
        let lock_path = gitlet_dir.join(LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)?;

        let start = Instant::now();
        let poll_interval = Duration::from_millis(10);

        loop {
            match file.try_lock_exclusive() {
                Ok(()) => return Ok(RepoLock { _file: file }),
                Err(_) if start.elapsed() >= timeout => {
                    return Err(GitletError::LockTimeout);
                }
                Err(_) => std::thread::sleep(poll_interval),
            }
        }
    }
}
