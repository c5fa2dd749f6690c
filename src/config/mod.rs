//! Launcher configuration.
//!
//! Configuration lives in a single optional TOML file. Every field has a
//! default, so a host with no file at all runs the stock deployment.
//!
//! # Lookup Order
//!
//! 1. `--config <path>` on the command line
//! 2. `BUNDLEKEEPER_CONFIG_PATH` environment variable
//! 3. `<base_dir>/bundlekeeper.toml`
//!
//! A missing file is not an error; a file that fails to parse is.
//!
//! # File Format
//!
//! ```toml
//! install_dir = "bin"
//!
//! [feed]
//! repo_owner = "acme"
//! repo_name = "printer-http-service"
//!
//! [watchdog]
//! health_url = "http://localhost:5001/health"
//! interval_secs = 30
//!
//! [supervisor]
//! restart_delay_secs = 2
//! ```

mod sections;

pub use sections::{BundleConfig, FeedConfig, RuntimeConfig, SupervisorConfig, WatchdogConfig};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::constants::{CONFIG_FILE_NAME, CONFIG_PATH_ENV};
use crate::core::LauncherError;

/// Complete launcher configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherConfig {
    /// Install directory holding the runtime, the bundle and the version file.
    /// Relative paths are resolved against the base directory.
    pub install_dir: PathBuf,
    /// Release feed settings.
    pub feed: FeedConfig,
    /// Bundle layout.
    pub bundle: BundleConfig,
    /// Runtime acquisition and invocation.
    pub runtime: RuntimeConfig,
    /// Liveness probing.
    pub watchdog: WatchdogConfig,
    /// Outer loop timing.
    pub supervisor: SupervisorConfig,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            install_dir: PathBuf::from("bin"),
            feed: FeedConfig::default(),
            bundle: BundleConfig::default(),
            runtime: RuntimeConfig::default(),
            watchdog: WatchdogConfig::default(),
            supervisor: SupervisorConfig::default(),
        }
    }
}

impl LauncherConfig {
    /// Load configuration using the lookup order described in the module docs.
    ///
    /// # Errors
    ///
    /// Fails if the selected file exists but cannot be read, parsed or validated.
    pub async fn load(explicit: Option<&Path>, base_dir: &Path) -> Result<Self> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from),
        }
        .unwrap_or_else(|| base_dir.join(CONFIG_FILE_NAME));

        if path.exists() {
            Self::load_from(&path).await
        } else {
            debug!("No configuration at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the supervisor cannot run with.
    pub fn validate(&self) -> Result<(), LauncherError> {
        let invalid = |message: &str| {
            Err(LauncherError::Config {
                message: message.to_string(),
            })
        };

        if self.feed.asset_name.trim().is_empty() {
            return invalid("feed.asset_name must not be empty");
        }
        if self.bundle.entry_point.trim().is_empty() {
            return invalid("bundle.entry_point must not be empty");
        }
        if self.runtime.executable.trim().is_empty() {
            return invalid("runtime.executable must not be empty");
        }
        if self.watchdog.interval_secs == 0 {
            return invalid("watchdog.interval_secs must be greater than zero");
        }
        if self.watchdog.probe_timeout_secs == 0 {
            return invalid("watchdog.probe_timeout_secs must be greater than zero");
        }
        if self.feed.request_timeout_secs == 0 {
            return invalid("feed.request_timeout_secs must be greater than zero");
        }
        Ok(())
    }

    /// Install directory resolved against `base_dir`.
    pub fn resolved_install_dir(&self, base_dir: &Path) -> PathBuf {
        resolve(base_dir, &self.install_dir)
    }

    /// Fallback bundle archive resolved against `base_dir`.
    pub fn resolved_fallback_archive(&self, base_dir: &Path) -> PathBuf {
        resolve(base_dir, Path::new(&self.bundle.fallback_archive))
    }
}

fn resolve(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}
