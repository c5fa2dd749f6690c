//! Install-directory lock.
//!
//! Two launchers pointed at the same install directory would each run a
//! worker and overwrite each other's bundle. The supervisor therefore holds an
//! exclusive OS file lock on `<install_dir>/.bundlekeeper.lock` for as long as
//! it runs. The lock is released when the [`InstallLock`] is dropped or the
//! process dies.
//!
//! File operations run under `spawn_blocking` so a contended lock never stalls
//! the runtime's worker threads.

use fs4::fs_std::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_retry::strategy::ExponentialBackoff;
use tracing::debug;

use crate::constants::{LOCK_FILE_NAME, MAX_BACKOFF_DELAY_MS, STARTING_BACKOFF_DELAY_MS};
use crate::core::LauncherError;

/// Exclusive lock over an install directory.
#[derive(Debug)]
pub struct InstallLock {
    _file: Arc<File>,
    path: PathBuf,
}

impl Drop for InstallLock {
    fn drop(&mut self) {
        debug!(path = %self.path.display(), "Install lock released");
    }
}

impl InstallLock {
    /// Acquire the lock for `install_dir`, waiting up to `timeout`.
    ///
    /// Retries `try_lock_exclusive` with exponential backoff (10ms doubling,
    /// capped at 500ms).
    ///
    /// # Errors
    ///
    /// - [`LauncherError::LockHeld`] if another process keeps the lock past `timeout`
    /// - [`LauncherError::Io`] if the directory or lock file cannot be created
    pub async fn acquire(install_dir: &Path, timeout: Duration) -> Result<Self, LauncherError> {
        tokio::fs::create_dir_all(install_dir)
            .await
            .map_err(|e| LauncherError::io("create install directory", install_dir, &e))?;

        let path = install_dir.join(LOCK_FILE_NAME);
        debug!(path = %path.display(), "Waiting for install lock");

        let open_path = path.clone();
        let file = tokio::task::spawn_blocking(move || {
            OpenOptions::new().create(true).write(true).truncate(false).open(&open_path)
        })
        .await
        .map_err(|e| LauncherError::Io {
            operation: "open lock file".to_string(),
            path: path.display().to_string(),
            reason: e.to_string(),
        })?
        .map_err(|e| LauncherError::io("open lock file", &path, &e))?;
        let file = Arc::new(file);

        let start = Instant::now();
        let backoff = ExponentialBackoff::from_millis(STARTING_BACKOFF_DELAY_MS)
            .max_delay(Duration::from_millis(MAX_BACKOFF_DELAY_MS));

        for delay in backoff {
            let attempt = Arc::clone(&file);
            let locked = tokio::task::spawn_blocking(move || attempt.try_lock_exclusive())
                .await
                .map_err(|e| LauncherError::Io {
                    operation: "lock install directory".to_string(),
                    path: path.display().to_string(),
                    reason: e.to_string(),
                })?;

            match locked {
                Ok(true) => {
                    debug!(
                        path = %path.display(),
                        wait_ms = start.elapsed().as_millis(),
                        "Install lock acquired"
                    );
                    return Ok(Self { _file: file, path });
                }
                Ok(false) | Err(_) => {
                    let remaining = timeout.saturating_sub(start.elapsed());
                    if remaining.is_zero() {
                        break;
                    }
                    tokio::time::sleep(delay.min(remaining)).await;
                }
            }
        }

        Err(LauncherError::LockHeld {
            path: install_dir.display().to_string(),
        })
    }

    /// Path of the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
