//! Cross-process mutual exclusion for sandbox setup and teardown.
//!
//! Two supervisor processes racing on the same sandbox root — one tearing
//! mounts down while the other is still adding them — corrupt each other's
//! view of the mount table. The scoped lock serializes the whole
//! setup-then-mount or unmount-then-teardown sequence. It is purely a
//! mutual-exclusion aid across processes sharing a filesystem, not a
//! substitute for namespace isolation.

use std::fs::OpenOptions;

use nix::fcntl::{Flock, FlockArg};
use tracing::{debug, instrument, trace};

use crate::error::LockError;

/// Exclusive advisory lock on a filesystem path, held for the lifetime of
/// the value.
///
/// Acquisition opens (creating if absent) the lock file and blocks until the
/// exclusive lock is granted. Dropping the guard releases the lock and
/// closes the descriptor on every exit path, so a failed sandbox setup can
/// never leave a stale lock behind.
#[derive(Debug)]
pub struct ScopedFileLock {
    _lock: Flock<std::fs::File>,
}

impl ScopedFileLock {
    /// Opens the lock file at `path` and blocks until the exclusive lock is
    /// acquired.
    ///
    /// # Errors
    ///
    /// [`LockError::Open`] if the lock file cannot be opened or created,
    /// [`LockError::Flock`] if the flock syscall fails. No guard is returned
    /// on failure; an unusable guard would silently void the exclusion.
    #[instrument]
    pub fn acquire(path: &str) -> Result<Self, LockError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| LockError::Open {
                path: path.to_string(),
                source: e,
            })?;

        trace!("Waiting for exclusive lock");
        let lock = Flock::lock(file, FlockArg::LockExclusive).map_err(|(_, errno)| {
            LockError::Flock {
                path: path.to_string(),
                errno,
            }
        })?;

        debug!("Lock acquired");
        Ok(Self { _lock: lock })
    }
}
