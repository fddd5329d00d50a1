//! Advisory lock over the instance root.

use std::fs::{File, OpenOptions};
use std::os::unix::fs::OpenOptionsExt as _;
use std::path::{Path, PathBuf};

use nix::fcntl::{Flock, FlockArg};

use crate::error::{AppError, Result};
use crate::paths::LOCK_FILE;

/// Exclusive `flock` on `<root>/.lock`, released on drop.
///
/// Serializes port allocation and instance creation across processes.
pub struct RootLock {
    _lock: Flock<File>,
    path: PathBuf,
}

impl RootLock {
    /// Block (off the async executor) until the lock is held.
    pub async fn acquire(root: &Path) -> Result<Self> {
        let path = root.join(LOCK_FILE);
        tokio::task::spawn_blocking(move || Self::acquire_blocking(path))
            .await
            .map_err(|e| AppError::internal(format!("Lock task failed: {e}")))?
    }

    fn acquire_blocking(path: PathBuf) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .mode(0o600)
            .open(&path)
            .map_err(|e| {
                AppError::storage(format!("Failed to open {}", path.display()))
                    .with("detail", e.to_string())
            })?;
        let lock = Flock::lock(file, FlockArg::LockExclusive).map_err(|(_, errno)| {
            AppError::storage(format!("Failed to lock {}", path.display()))
                .with("detail", errno.to_string())
        })?;
        log::debug!("Acquired {}", path.display());
        Ok(Self { _lock: lock, path })
    }
}

impl std::fmt::Debug for RootLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RootLock")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}
