use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::{
    DEFAULT_ASSET_NAME, DEFAULT_ENTRY_POINT, DEFAULT_FALLBACK_ARCHIVE, DEFAULT_FEED_API_BASE,
    DEFAULT_HEALTH_URL, DEFAULT_RUNTIME_DOWNLOAD_BASE, DEFAULT_RUNTIME_VERSION,
    FEED_REQUEST_TIMEOUT, LOCK_TIMEOUT, PROBE_TIMEOUT, RESTART_DELAY, WATCHDOG_INTERVAL,
};

/// Where releases are published and which artifact carries the bundle.
///
/// ## TOML Example
/// ```toml
/// [feed]
/// repo_owner = "acme"
/// repo_name = "printer-http-service"
/// asset_name = "app-bundle.zip"
/// verify_checksum = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// API host queried for `/repos/{owner}/{name}/releases/latest`.
    pub api_base: String,
    /// Repository owner on the release host.
    pub repo_owner: String,
    /// Repository name on the release host.
    pub repo_name: String,
    /// Full feed URL. When set, `api_base`, `repo_owner` and `repo_name` are ignored.
    pub url: Option<String>,
    /// Artifact name matched exactly against the release assets.
    pub asset_name: String,
    /// Verify `<asset_name>.sha256` when the release publishes one.
    pub verify_checksum: bool,
    /// Timeout for feed queries and downloads, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_FEED_API_BASE.to_string(),
            repo_owner: "sakatimuna7".to_string(),
            repo_name: "printer-http-service".to_string(),
            url: None,
            asset_name: DEFAULT_ASSET_NAME.to_string(),
            verify_checksum: true,
            request_timeout_secs: FEED_REQUEST_TIMEOUT.as_secs(),
        }
    }
}

impl FeedConfig {
    /// The URL answering "latest release".
    pub fn latest_release_url(&self) -> String {
        match &self.url {
            Some(url) => url.clone(),
            None => format!(
                "{}/repos/{}/{}/releases/latest",
                self.api_base.trim_end_matches('/'),
                self.repo_owner,
                self.repo_name
            ),
        }
    }

    /// Feed request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Layout of the installed worker bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BundleConfig {
    /// File executed by the runtime, relative to the install directory.
    pub entry_point: String,
    /// Pre-staged archive used on first run when the feed is unreachable,
    /// relative to the base directory.
    pub fallback_archive: String,
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            entry_point: DEFAULT_ENTRY_POINT.to_string(),
            fallback_archive: DEFAULT_FALLBACK_ARCHIVE.to_string(),
        }
    }
}

/// The language runtime that executes the bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Executable name inside the install directory (`.exe` is appended on Windows).
    pub executable: String,
    /// Runtime release tag downloaded during bootstrap.
    pub version: String,
    /// Base URL of runtime release downloads.
    pub download_base: String,
    /// Arguments placed before the entry point.
    pub args: Vec<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            executable: "bun".to_string(),
            version: DEFAULT_RUNTIME_VERSION.to_string(),
            download_base: DEFAULT_RUNTIME_DOWNLOAD_BASE.to_string(),
            args: vec!["run".to_string()],
        }
    }
}

impl RuntimeConfig {
    /// Platform-specific executable file name.
    pub fn executable_file_name(&self) -> String {
        if cfg!(windows) {
            format!("{}.exe", self.executable)
        } else {
            self.executable.clone()
        }
    }
}

/// Liveness probing of the running worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchdogConfig {
    /// Endpoint that must answer HTTP 200.
    pub health_url: String,
    /// Seconds between probes.
    pub interval_secs: u64,
    /// Upper bound for a single probe, in seconds.
    pub probe_timeout_secs: u64,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            health_url: DEFAULT_HEALTH_URL.to_string(),
            interval_secs: WATCHDOG_INTERVAL.as_secs(),
            probe_timeout_secs: PROBE_TIMEOUT.as_secs(),
        }
    }
}

impl WatchdogConfig {
    /// Probe period.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Probe timeout.
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

/// Outer loop timing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Pause after every worker exit, in seconds.
    pub restart_delay_secs: u64,
    /// How long to wait for the install lock, in seconds.
    pub lock_timeout_secs: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            restart_delay_secs: RESTART_DELAY.as_secs(),
            lock_timeout_secs: LOCK_TIMEOUT.as_secs(),
        }
    }
}

impl SupervisorConfig {
    /// Restart delay.
    pub fn restart_delay(&self) -> Duration {
        Duration::from_secs(self.restart_delay_secs)
    }

    /// Install lock timeout.
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.lock_timeout_secs)
    }
}
