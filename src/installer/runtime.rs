//! Runtime acquisition.
//!
//! The worker bundle is executed by the bun runtime, which is not assumed to be
//! installed on the host. When the executable is missing from the install
//! directory it is downloaded once from the runtime's own release page:
//!
//! ```text
//! {download_base}/bun-{version}/{asset}.zip
//! ```
//!
//! The upstream archives nest the executable one level deep
//! (`bun-linux-x64/bun`); after extraction it is hoisted to the top of the
//! install directory and the nested directory is removed.

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::archive::extract_archive_async;
use crate::config::RuntimeConfig;
use crate::core::LauncherError;
use crate::release::ReleaseClient;
use crate::utils::{ensure_dir, ensure_executable, remove_file_if_exists};

/// Upstream archive name for an operating system / architecture pair.
pub fn platform_asset(os: &str, arch: &str) -> Result<&'static str, LauncherError> {
    match (os, arch) {
        ("windows", "x86_64") => Ok("bun-windows-x64"),
        ("linux", "x86_64") => Ok("bun-linux-x64"),
        ("linux", "aarch64") => Ok("bun-linux-aarch64"),
        ("macos", "aarch64") => Ok("bun-darwin-aarch64"),
        ("macos", "x86_64") => Ok("bun-darwin-x64"),
        _ => Err(LauncherError::UnsupportedPlatform {
            os: os.to_string(),
            arch: arch.to_string(),
        }),
    }
}

/// Installs the runtime executable into the install directory.
pub struct RuntimeInstaller {
    client: ReleaseClient,
    config: RuntimeConfig,
    install_dir: PathBuf,
}

impl RuntimeInstaller {
    /// Create an installer that downloads through `client`.
    pub fn new(client: ReleaseClient, config: RuntimeConfig, install_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            config,
            install_dir: install_dir.into(),
        }
    }

    /// Where the runtime executable lives once installed.
    pub fn executable_path(&self) -> PathBuf {
        self.install_dir.join(self.config.executable_file_name())
    }

    /// Whether the runtime executable is present.
    pub fn is_installed(&self) -> bool {
        self.executable_path().is_file()
    }

    /// Download URL for the current host.
    pub fn download_url(&self) -> Result<String, LauncherError> {
        let asset = platform_asset(std::env::consts::OS, std::env::consts::ARCH)?;
        Ok(self.download_url_for(asset))
    }

    fn download_url_for(&self, asset: &str) -> String {
        format!(
            "{}/bun-{}/{}.zip",
            self.config.download_base.trim_end_matches('/'),
            self.config.version,
            asset
        )
    }

    /// Install the runtime unless it is already present.
    ///
    /// Returns the executable path.
    pub async fn ensure_installed(&self) -> Result<PathBuf, LauncherError> {
        if self.is_installed() {
            debug!("Runtime present at {}", self.executable_path().display());
            return Ok(self.executable_path());
        }
        let asset = platform_asset(std::env::consts::OS, std::env::consts::ARCH)?;
        self.install_asset(asset).await
    }

    /// Download, extract and hoist the runtime archive named `asset`.
    pub async fn install_asset(&self, asset: &str) -> Result<PathBuf, LauncherError> {
        ensure_dir(&self.install_dir)
            .map_err(|e| LauncherError::io_chain("create install directory", &self.install_dir, &e))?;

        let url = self.download_url_for(asset);
        let archive = self.install_dir.join(format!("{asset}.zip"));
        info!("Downloading runtime {} from {}", self.config.version, url);

        self.client.download(&url, &archive).await?;
        let extracted = extract_archive_async(archive.clone(), self.install_dir.clone()).await;
        remove_file_if_exists(&archive)
            .map_err(|e| LauncherError::io_chain("remove runtime archive", &archive, &e))?;
        extracted?;

        let executable = self.executable_path();
        hoist_nested(&self.install_dir.join(asset), &executable)?;

        if !executable.is_file() {
            return Err(LauncherError::Bootstrap {
                reason: format!(
                    "runtime archive {asset}.zip did not contain {}",
                    self.config.executable_file_name()
                ),
            });
        }

        ensure_executable(&executable)
            .map_err(|e| LauncherError::io_chain("mark runtime executable", &executable, &e))?;

        info!("Runtime installed at {}", executable.display());
        Ok(executable)
    }
}

/// Move `<nested_dir>/<exe name>` to `executable` and drop `nested_dir`.
fn hoist_nested(nested_dir: &Path, executable: &Path) -> Result<(), LauncherError> {
    if !nested_dir.is_dir() {
        return Ok(());
    }

    if let Some(name) = executable.file_name() {
        let nested_exe = nested_dir.join(name);
        if nested_exe.is_file() {
            debug!("Hoisting {} to {}", nested_exe.display(), executable.display());
            remove_file_if_exists(executable)
                .map_err(|e| LauncherError::io_chain("replace runtime", executable, &e))?;
            std::fs::rename(&nested_exe, executable)
                .map_err(|e| LauncherError::io("hoist runtime", &nested_exe, &e))?;
        }
    }

    std::fs::remove_dir_all(nested_dir)
        .map_err(|e| LauncherError::io("remove nested runtime directory", nested_dir, &e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{ArchiveBuilder, MockServer};
    use std::time::Duration;
    use tempfile::TempDir;

    fn installer(server: &MockServer, install_dir: &Path) -> RuntimeInstaller {
        let client = ReleaseClient::new(server.url("/feed"), Duration::from_secs(5)).unwrap();
        let config = RuntimeConfig {
            download_base: server.url("/runtime/"),
            version: "v9.9.9".to_string(),
            ..RuntimeConfig::default()
        };
        RuntimeInstaller::new(client, config, install_dir)
    }

    #[test]
    fn test_platform_assets() {
        assert_eq!(platform_asset("linux", "x86_64").unwrap(), "bun-linux-x64");
        assert_eq!(platform_asset("linux", "aarch64").unwrap(), "bun-linux-aarch64");
        assert_eq!(platform_asset("macos", "aarch64").unwrap(), "bun-darwin-aarch64");
        assert_eq!(platform_asset("macos", "x86_64").unwrap(), "bun-darwin-x64");
        assert_eq!(platform_asset("windows", "x86_64").unwrap(), "bun-windows-x64");
        assert!(matches!(
            platform_asset("freebsd", "x86_64"),
            Err(LauncherError::UnsupportedPlatform { .. })
        ));
    }

    #[tokio::test]
    async fn test_download_url_layout() {
        let server = MockServer::start().await;
        let temp = TempDir::new().unwrap();
        let installer = installer(&server, temp.path());
        assert_eq!(
            installer.download_url_for("bun-linux-x64"),
            server.url("/runtime/bun-v9.9.9/bun-linux-x64.zip")
        );
    }

    #[tokio::test]
    async fn test_install_hoists_nested_executable() {
        let server = MockServer::start().await;
        let exe_name = RuntimeConfig::default().executable_file_name();
        let zip = ArchiveBuilder::new()
            .directory("bun-test-x64/")
            .file_with_mode(&format!("bun-test-x64/{exe_name}"), b"#!/bin/sh\n", 0o644)
            .build();
        server.set_bytes("/runtime/bun-v9.9.9/bun-test-x64.zip", zip);

        let temp = TempDir::new().unwrap();
        let install_dir = temp.path().join("bin");
        let installer = installer(&server, &install_dir);

        let exe = installer.install_asset("bun-test-x64").await.unwrap();
        assert_eq!(exe, install_dir.join(&exe_name));
        assert!(installer.is_installed());
        assert!(!install_dir.join("bun-test-x64").exists());
        assert!(!install_dir.join("bun-test-x64.zip").exists());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&exe).unwrap().permissions().mode();
            assert_eq!(mode & 0o111, 0o111);
        }
    }

    #[tokio::test]
    async fn test_install_rejects_archive_without_executable() {
        let server = MockServer::start().await;
        let zip = ArchiveBuilder::new().file("bun-test-x64/README.md", b"docs").build();
        server.set_bytes("/runtime/bun-v9.9.9/bun-test-x64.zip", zip);

        let temp = TempDir::new().unwrap();
        let installer = installer(&server, temp.path());

        let err = installer.install_asset("bun-test-x64").await.unwrap_err();
        assert!(matches!(err, LauncherError::Bootstrap { .. }));
        assert!(!installer.is_installed());
    }

    #[tokio::test]
    async fn test_install_download_failure() {
        let server = MockServer::start().await;
        let temp = TempDir::new().unwrap();
        let installer = installer(&server, temp.path());

        let err = installer.install_asset("bun-test-x64").await.unwrap_err();
        assert!(matches!(err, LauncherError::Download { .. }));
    }

    #[tokio::test]
    async fn test_ensure_installed_skips_when_present() {
        let server = MockServer::start().await;
        let temp = TempDir::new().unwrap();
        let installer = installer(&server, temp.path());
        std::fs::write(installer.executable_path(), "present").unwrap();

        let exe = installer.ensure_installed().await.unwrap();
        assert_eq!(exe, installer.executable_path());
        assert_eq!(server.total_hits(), 0);
    }
}
