//! Fixed names, intervals and timeouts used across the launcher.
//!
//! Most of these are defaults for [`LauncherConfig`](crate::config::LauncherConfig);
//! the file names are part of the on-disk contract and are not configurable.

use std::time::Duration;

/// Name of the persisted version file inside the install directory.
pub const VERSION_FILE_NAME: &str = "version";

/// Name of the install-directory lock file.
pub const LOCK_FILE_NAME: &str = ".bundlekeeper.lock";

/// Default configuration file name, looked up in the base directory.
pub const CONFIG_FILE_NAME: &str = "bundlekeeper.toml";

/// Environment variable overriding the configuration file path.
pub const CONFIG_PATH_ENV: &str = "BUNDLEKEEPER_CONFIG_PATH";

/// Environment variable disabling progress bars.
pub const NO_PROGRESS_ENV: &str = "BUNDLEKEEPER_NO_PROGRESS";

/// Release artifact that carries the worker bundle.
pub const DEFAULT_ASSET_NAME: &str = "app-bundle.zip";

/// Suffix of the optional checksum artifact published next to the bundle.
pub const CHECKSUM_ASSET_SUFFIX: &str = ".sha256";

/// Entry point executed by the runtime, relative to the install directory.
pub const DEFAULT_ENTRY_POINT: &str = "index.js";

/// Pre-staged bundle used when the feed is unreachable on first run.
pub const DEFAULT_FALLBACK_ARCHIVE: &str = "dist/app-bundle.zip";

/// Worker liveness endpoint.
pub const DEFAULT_HEALTH_URL: &str = "http://localhost:5001/health";

/// Delay between a worker exit and the next cycle.
pub const RESTART_DELAY: Duration = Duration::from_secs(2);

/// Period between liveness probes.
pub const WATCHDOG_INTERVAL: Duration = Duration::from_secs(30);

/// Upper bound for a single liveness probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound for release feed requests and downloads.
pub const FEED_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// How long to wait for a previous launcher to release the install lock.
pub const LOCK_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum backoff delay while waiting for the install lock (500ms).
pub const MAX_BACKOFF_DELAY_MS: u64 = 500;

/// Starting delay for the install lock backoff (10ms).
pub const STARTING_BACKOFF_DELAY_MS: u64 = 10;

/// Runtime release pinned by default.
pub const DEFAULT_RUNTIME_VERSION: &str = "v1.1.38";

/// Base URL for runtime release downloads.
pub const DEFAULT_RUNTIME_DOWNLOAD_BASE: &str = "https://github.com/oven-sh/bun/releases/download";

/// Default release feed API host.
pub const DEFAULT_FEED_API_BASE: &str = "https://api.github.com";

/// User agent sent with every request; the GitHub API rejects requests without one.
pub const USER_AGENT: &str = concat!("bundlekeeper/", env!("CARGO_PKG_VERSION"));
