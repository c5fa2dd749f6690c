//! Persisted record of the installed bundle version.
//!
//! The whole content of `<install_dir>/version` is the version string; there is
//! no framing and no trailing newline. A missing file means nothing has been
//! installed from the feed yet and reads as the empty string.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::constants::VERSION_FILE_NAME;
use crate::core::LauncherError;
use crate::utils::atomic_write;

/// Reads and writes the `version` file of an install directory.
#[derive(Debug, Clone)]
pub struct VersionStore {
    path: PathBuf,
}

impl VersionStore {
    /// Store for `install_dir`.
    pub fn new(install_dir: &Path) -> Self {
        Self {
            path: install_dir.join(VERSION_FILE_NAME),
        }
    }

    /// Path of the version file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Installed version, or `""` when none is recorded.
    ///
    /// Read failures other than "not found" are logged and also reported as
    /// `""`, which makes the next update check reinstall rather than stall.
    pub async fn read(&self) -> String {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(version) => version,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No version file at {}", self.path.display());
                String::new()
            }
            Err(e) => {
                warn!("Could not read {}: {}, treating as not installed", self.path.display(), e);
                String::new()
            }
        }
    }

    /// Record `version` as installed. Readers never observe a partial write.
    pub async fn write(&self, version: &str) -> Result<(), LauncherError> {
        let path = self.path.clone();
        let content = version.as_bytes().to_vec();
        tokio::task::spawn_blocking(move || atomic_write(&path, &content))
            .await
            .map_err(|e| LauncherError::Io {
                operation: "write version file".to_string(),
                path: self.path.display().to_string(),
                reason: e.to_string(),
            })?
            .map_err(|e| LauncherError::io_chain("write version file", &self.path, &e))?;

        debug!(version = %version, "Version file updated");
        Ok(())
    }

    /// Forget the recorded version. Clearing an empty store is not an error.
    pub async fn clear(&self) -> Result<(), LauncherError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!("Version file removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(LauncherError::io("remove version file", &self.path, &e)),
        }
    }
}
