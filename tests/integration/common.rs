//! Shared fixtures for the integration suite.

#![allow(dead_code)]

use bundlekeeper::config::LauncherConfig;
use bundlekeeper::constants::CONFIG_FILE_NAME;
use bundlekeeper::test_utils::{ArchiveBuilder, MockServer, init_test_logging};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A base directory plus the mock server its configuration points at.
pub struct Site {
    pub temp: TempDir,
    pub server: MockServer,
}

impl Site {
    pub async fn new() -> Self {
        init_test_logging(None);
        Self {
            temp: TempDir::new().unwrap(),
            server: MockServer::start().await,
        }
    }

    pub fn base_dir(&self) -> &Path {
        self.temp.path()
    }

    pub fn install_dir(&self) -> PathBuf {
        self.base_dir().join("bin")
    }

    /// Defaults, wired to the mock server, with the shortest intervals the
    /// configuration allows.
    pub fn config(&self) -> LauncherConfig {
        let mut config = LauncherConfig::default();
        config.feed.url = Some(self.server.feed_url());
        config.watchdog.health_url = self.server.url("/health");
        config.watchdog.interval_secs = 1;
        config.watchdog.probe_timeout_secs = 1;
        config.supervisor.restart_delay_secs = 0;
        config.supervisor.lock_timeout_secs = 1;
        config
    }

    /// Write `config` as `<base_dir>/bundlekeeper.toml`.
    pub fn write_config(&self, config: &LauncherConfig) -> PathBuf {
        let path = self.base_dir().join(CONFIG_FILE_NAME);
        std::fs::write(&path, toml::to_string(config).unwrap()).unwrap();
        path
    }

    /// Install a stand-in runtime: `bun run <entry>` executes `<entry>` with `sh`.
    #[cfg(unix)]
    pub fn install_fake_runtime(&self) {
        use std::os::unix::fs::PermissionsExt;

        let dir = self.install_dir();
        std::fs::create_dir_all(&dir).unwrap();
        let runtime = dir.join("bun");
        std::fs::write(&runtime, "#!/bin/sh\nexec /bin/sh \"$2\"\n").unwrap();
        std::fs::set_permissions(&runtime, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    pub fn read_installed(&self, relative: &str) -> String {
        std::fs::read_to_string(self.install_dir().join(relative)).unwrap()
    }
}

/// A bundle whose entry point is `script`.
pub fn bundle(script: &str) -> Vec<u8> {
    ArchiveBuilder::new().file("index.js", script.as_bytes()).build()
}
