//! Keeping the installed bundle current.
//!
//! [`UpdateCoordinator::ensure_updated`] runs once per supervision cycle:
//!
//! 1. Read the installed version from the [`VersionStore`] (`""` if none)
//! 2. Ask the release feed for the latest release
//! 3. Find the bundle artifact in that release
//! 4. Stop if the versions are equal (exact, case-sensitive string equality)
//! 5. Download the artifact next to the bundle, verify its checksum when one
//!    is published, extract it over the install directory, delete the
//!    download, then record the new version
//!
//! The version file is written last. A version on disk therefore always names
//! a bundle whose extraction finished, and a failed install is retried on the
//! next cycle.
//!
//! Failures never propagate as errors. They come back as an [`UpdateOutcome`]
//! so the supervisor can log them and carry on with whatever is installed.
//!
//! # Version Ordering
//!
//! Versions are opaque. If both parse as semver and the feed's version is
//! lower than the installed one a warning is logged, but the install goes
//! ahead: the feed is the source of truth.

pub mod bootstrap;
pub mod version_store;


pub use bootstrap::{BootstrapReport, Bootstrapper, BundleSource};
pub use version_store::VersionStore;

use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::config::FeedConfig;
use crate::core::LauncherError;
use crate::installer::extract_archive_async;
use crate::release::{ChecksumVerifier, ReleaseAsset, ReleaseClient, ReleaseDescriptor};
use crate::utils::ensure_dir;

/// Result of one update check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Installed version already matches the feed.
    Unchanged {
        /// Version reported by both.
        version: String,
    },
    /// A new bundle was extracted and recorded.
    Updated {
        /// Version installed before, `""` if none.
        previous: String,
        /// Version now installed.
        version: String,
    },
    /// The feed could not be queried or the release lacks the bundle.
    /// Nothing on disk was touched.
    FetchFailed(LauncherError),
    /// Download, verification, extraction or the version write failed.
    /// The version file still names the previous version.
    InstallFailed(LauncherError),
}

impl UpdateOutcome {
    /// True if a new bundle was installed.
    pub fn is_updated(&self) -> bool {
        matches!(self, Self::Updated { .. })
    }

    /// True for either failure kind.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::FetchFailed(_) | Self::InstallFailed(_))
    }

    /// The error of a failed check.
    pub fn error(&self) -> Option<&LauncherError> {
        match self {
            Self::FetchFailed(e) | Self::InstallFailed(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for UpdateOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unchanged { version } => write!(f, "up to date ({})", display_version(version)),
            Self::Updated { previous, version } => {
                write!(f, "updated {} -> {}", display_version(previous), version)
            }
            Self::FetchFailed(e) => write!(f, "update check failed: {e}"),
            Self::InstallFailed(e) => write!(f, "update install failed: {e}"),
        }
    }
}

/// Compares the installed version with the feed and installs new bundles.
#[derive(Debug, Clone)]
pub struct UpdateCoordinator {
    client: ReleaseClient,
    store: VersionStore,
    install_dir: PathBuf,
    asset_name: String,
    verify_checksum: bool,
}

impl UpdateCoordinator {
    /// Create a coordinator for `install_dir`.
    pub fn new(client: ReleaseClient, install_dir: impl Into<PathBuf>, feed: &FeedConfig) -> Self {
        let install_dir = install_dir.into();
        Self {
            client,
            store: VersionStore::new(&install_dir),
            install_dir,
            asset_name: feed.asset_name.clone(),
            verify_checksum: feed.verify_checksum,
        }
    }

    /// Install directory this coordinator writes into.
    pub fn install_dir(&self) -> &Path {
        &self.install_dir
    }

    /// The version store for the install directory.
    pub fn version_store(&self) -> &VersionStore {
        &self.store
    }

    /// HTTP client used for the feed and downloads.
    pub fn client(&self) -> &ReleaseClient {
        &self.client
    }

    /// Install the latest release unless it is already installed.
    pub async fn ensure_updated(&self) -> UpdateOutcome {
        self.check(false).await
    }

    /// Install the latest release even if the version file already names it.
    ///
    /// Used when the bundle files are missing but a version is still recorded.
    pub async fn ensure_updated_forced(&self) -> UpdateOutcome {
        self.check(true).await
    }

    async fn check(&self, force: bool) -> UpdateOutcome {
        let current = self.store.read().await;
        info!(current = %display_version(&current), "Checking for updates");

        let release = match self.client.latest_release().await {
            Ok(release) => release,
            Err(e) => {
                warn!("Update check failed, keeping installed bundle: {}", e);
                return UpdateOutcome::FetchFailed(e);
            }
        };

        let asset = match release.require_asset(&self.asset_name) {
            Ok(asset) => asset,
            Err(e) => {
                warn!("Release {} is malformed: {}", release.version, e);
                return UpdateOutcome::FetchFailed(e);
            }
        };

        if !force && release.version == current {
            info!("Bundle is up to date ({})", current);
            return UpdateOutcome::Unchanged {
                version: current,
            };
        }

        if is_regression(&current, &release.version) {
            warn!(
                "Feed version {} is older than installed {}, installing it anyway",
                release.version, current
            );
        }

        info!("Updating bundle {} -> {}", display_version(&current), release.version);
        match self.install(&release, asset).await {
            Ok(()) => {
                info!("Bundle updated to {}", release.version);
                UpdateOutcome::Updated {
                    previous: current,
                    version: release.version,
                }
            }
            Err(e) => {
                error!("Failed to install {}: {}", release.version, e);
                UpdateOutcome::InstallFailed(e)
            }
        }
    }

    async fn install(
        &self,
        release: &ReleaseDescriptor,
        asset: &ReleaseAsset,
    ) -> Result<(), LauncherError> {
        ensure_dir(&self.install_dir).map_err(|e| {
            LauncherError::io_chain("create install directory", &self.install_dir, &e)
        })?;

        // Deleted on drop, so every early return below cleans up the download
        let download = tempfile::Builder::new()
            .prefix(".download-")
            .suffix(".zip")
            .tempfile_in(&self.install_dir)
            .map_err(|e| LauncherError::io("create download file", &self.install_dir, &e))?
            .into_temp_path();

        self.client.download(&asset.download_url, &download).await?;

        if self.verify_checksum {
            ChecksumVerifier::verify_from_release(&self.client, release, &self.asset_name, &download)
                .await?;
        }

        extract_archive_async(download.to_path_buf(), self.install_dir.clone()).await?;

        let download_path = download.to_path_buf();
        if let Err(e) = download.close() {
            warn!("Could not remove {}: {}", download_path.display(), e);
        }

        self.store.write(&release.version).await
    }
}

/// `""` renders as `<none>` in logs.
pub(crate) fn display_version(version: &str) -> &str {
    if version.is_empty() { "<none>" } else { version }
}

/// True when both strings are semver (optional `v` prefix) and `fetched < current`.
pub fn is_regression(current: &str, fetched: &str) -> bool {
    let parse = |v: &str| semver::Version::parse(v.trim().trim_start_matches('v')).ok();
    match (parse(current), parse(fetched)) {
        (Some(current), Some(fetched)) => fetched < current,
        _ => false,
    }
}
