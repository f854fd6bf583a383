//! Cross-process exclusive lock on a zone's `<zone>.lock` sidecar file.
//!
//! Uses `flock(2)` advisory locks. These belong to the open file description, so two
//! acquisitions contend with each other whether they come from separate processes or from
//! concurrent requests inside one process.
use crate::error::Error;
use std::fs::{File, OpenOptions};
use std::future::Future;
use std::io;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Suffix appended to the zone path to name the lock file.
pub const LOCK_SUFFIX: &str = ".lock";

/// Time between lock attempts.
pub const LOCK_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// An exclusive lock on a lock file, released on drop.
#[derive(Debug)]
pub struct LockGuard {
    file: File,
    path: PathBuf,
    locked: bool,
}

impl LockGuard {
    /// Release the lock. Calling this more than once is a no-op.
    pub fn release(&mut self) {
        if !self.locked {
            return;
        }
        self.locked = false;
        if let Err(err) = flock(&self.file, libc::LOCK_UN) {
            // Closing the descriptor on drop releases the lock regardless.
            tracing::warn!(path = %self.path.display(), error = %err, "failed to unlock");
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        self.release();
    }
}

/// Acquire an exclusive lock on `path`, trying once per [`LOCK_RETRY_INTERVAL`].
///
/// The lock file is created if absent and is never removed. `cancelled` is polled before every
/// attempt and during every wait; once it resolves no further attempts are made. A
/// `max_attempts` of zero still makes one attempt.
///
/// # Errors
///
/// Returns [`Error::LockFile`] if the lock file can't be opened, [`Error::LockCancelled`] if
/// `cancelled` resolves first, or [`Error::LockTimeout`] with the last `flock` error once
/// `max_attempts` attempts have failed.
pub async fn acquire<C>(path: &Path, max_attempts: u32, cancelled: C) -> Result<LockGuard, Error>
where
    C: Future<Output = ()>,
{
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)
        .map_err(Error::LockFile)?;
    tokio::pin!(cancelled);

    let max_attempts = max_attempts.max(1);
    let mut attempt = 0;
    loop {
        tokio::select! {
            biased;
            () = &mut cancelled => return Err(Error::LockCancelled),
            () = std::future::ready(()) => {}
        }

        attempt += 1;
        let last_err = match flock(&file, libc::LOCK_EX | libc::LOCK_NB) {
            Ok(()) => {
                tracing::debug!(path = %path.display(), attempt, "acquired zone lock");
                return Ok(LockGuard {
                    file,
                    path: path.to_path_buf(),
                    locked: true,
                });
            }
            Err(err) => err,
        };

        if attempt >= max_attempts {
            return Err(Error::LockTimeout {
                attempts: attempt,
                source: last_err,
            });
        }

        tracing::debug!(path = %path.display(), attempt, error = %last_err, "zone lock busy");
        tokio::select! {
            biased;
            () = &mut cancelled => return Err(Error::LockCancelled),
            () = tokio::time::sleep(LOCK_RETRY_INTERVAL) => {}
        }
    }
}

fn flock(file: &File, operation: libc::c_int) -> io::Result<()> {
    // SAFETY: the descriptor is owned by `file` and stays open for the duration of the call.
    let rc = unsafe { libc::flock(file.as_raw_fd(), operation) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}
