//! First-run preparation of the install directory.
//!
//! Before the supervisor can start its first cycle the install directory must
//! contain both the runtime executable and a bundle. [`Bootstrapper::ensure_ready`]
//! obtains whichever is missing:
//!
//! 1. Runtime missing: download it (see [`RuntimeInstaller`])
//! 2. Bundle entry point missing: force-install the latest release from the
//!    feed, ignoring the recorded version
//! 3. Feed unusable: extract the pre-staged fallback archive; no version is
//!    recorded, so the first cycle still installs from the feed
//!
//! If the runtime cannot be installed, or neither the feed nor the fallback
//! yields a bundle, the result is [`LauncherError::Bootstrap`], the only
//! error that stops the launcher.

use std::path::PathBuf;
use tracing::{info, warn};

use super::{UpdateCoordinator, UpdateOutcome};
use crate::core::LauncherError;
use crate::installer::{RuntimeInstaller, extract_archive_async};

/// Where the bundle came from during bootstrap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleSource {
    /// The entry point was already installed.
    Present,
    /// Installed from the release feed.
    Feed {
        /// Version recorded in the version store.
        version: String,
    },
    /// Extracted from the local fallback archive.
    Fallback {
        /// Archive that was extracted.
        archive: PathBuf,
    },
}

/// What [`Bootstrapper::ensure_ready`] established.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapReport {
    /// Runtime executable path.
    pub runtime: PathBuf,
    /// Origin of the bundle.
    pub bundle: BundleSource,
}

/// Makes sure the runtime and a bundle are installed.
pub struct Bootstrapper {
    runtime: RuntimeInstaller,
    entry_point: PathBuf,
    fallback_archive: PathBuf,
}

impl Bootstrapper {
    /// `entry_point` and `fallback_archive` are absolute paths.
    pub fn new(runtime: RuntimeInstaller, entry_point: PathBuf, fallback_archive: PathBuf) -> Self {
        Self {
            runtime,
            entry_point,
            fallback_archive,
        }
    }

    /// Install whatever is missing.
    pub async fn ensure_ready(
        &self,
        coordinator: &UpdateCoordinator,
    ) -> Result<BootstrapReport, LauncherError> {
        let runtime = self.runtime.ensure_installed().await.map_err(|e| LauncherError::Bootstrap {
            reason: format!("runtime unavailable: {e}"),
        })?;

        if self.entry_point.is_file() {
            return Ok(BootstrapReport {
                runtime,
                bundle: BundleSource::Present,
            });
        }

        info!("No bundle at {}, installing from the release feed", self.entry_point.display());
        let feed_error = match coordinator.ensure_updated_forced().await {
            UpdateOutcome::Updated { version, .. } | UpdateOutcome::Unchanged { version } => {
                return Ok(BootstrapReport {
                    runtime,
                    bundle: BundleSource::Feed { version },
                });
            }
            UpdateOutcome::FetchFailed(e) | UpdateOutcome::InstallFailed(e) => e,
        };

        if !self.fallback_archive.is_file() {
            return Err(LauncherError::Bootstrap {
                reason: format!(
                    "no bundle installed, release feed failed ({feed_error}) and no fallback archive at {}",
                    self.fallback_archive.display()
                ),
            });
        }

        warn!("Installing fallback bundle {}", self.fallback_archive.display());
        extract_archive_async(self.fallback_archive.clone(), coordinator.install_dir().to_path_buf())
            .await
            .map_err(|e| LauncherError::Bootstrap {
                reason: format!("fallback bundle could not be installed: {e}"),
            })?;
        // The fallback carries no version, so the next check must reinstall from the feed
        coordinator.version_store().clear().await.map_err(|e| LauncherError::Bootstrap {
            reason: format!("fallback bundle installed but the old version record remains: {e}"),
        })?;

        Ok(BootstrapReport {
            runtime,
            bundle: BundleSource::Fallback {
                archive: self.fallback_archive.clone(),
            },
        })
    }
}
