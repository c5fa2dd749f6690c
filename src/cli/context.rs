use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::LauncherConfig;
use crate::installer::RuntimeInstaller;
use crate::release::ReleaseClient;
use crate::update::{Bootstrapper, UpdateCoordinator};

/// Resolved configuration shared by every command.
#[derive(Debug, Clone)]
pub struct LaunchContext {
    /// Directory relative configuration paths are resolved against.
    pub base_dir: PathBuf,
    /// Absolute install directory.
    pub install_dir: PathBuf,
    /// Effective configuration.
    pub config: LauncherConfig,
}

impl LaunchContext {
    /// Load configuration and apply the `--install-dir` override.
    pub async fn load(
        base_dir: PathBuf,
        config_path: Option<&Path>,
        install_dir: Option<PathBuf>,
    ) -> Result<Self> {
        let mut config = LauncherConfig::load(config_path, &base_dir).await?;
        if let Some(dir) = install_dir {
            config.install_dir = dir;
        }

        let install_dir = config.resolved_install_dir(&base_dir);
        debug!(install_dir = %install_dir.display(), feed = %config.feed.latest_release_url(), "Configuration loaded");

        Ok(Self {
            base_dir,
            install_dir,
            config,
        })
    }

    /// Client for the configured release feed.
    pub fn release_client(&self) -> Result<ReleaseClient> {
        Ok(ReleaseClient::from_config(&self.config.feed)?)
    }

    /// Coordinator for the install directory.
    pub fn coordinator(&self, client: ReleaseClient) -> UpdateCoordinator {
        UpdateCoordinator::new(client, &self.install_dir, &self.config.feed)
    }

    /// Bootstrapper for the runtime and first bundle.
    pub fn bootstrapper(&self, client: ReleaseClient) -> Bootstrapper {
        let runtime =
            RuntimeInstaller::new(client, self.config.runtime.clone(), &self.install_dir);
        Bootstrapper::new(
            runtime,
            self.entry_point(),
            self.config.resolved_fallback_archive(&self.base_dir),
        )
    }

    /// Absolute path of the bundle entry point.
    pub fn entry_point(&self) -> PathBuf {
        self.install_dir.join(&self.config.bundle.entry_point)
    }

    /// Absolute path of the runtime executable.
    pub fn runtime_path(&self) -> PathBuf {
        self.install_dir.join(self.config.runtime.executable_file_name())
    }
}
