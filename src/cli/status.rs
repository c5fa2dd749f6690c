//! `bundlekeeper status`: what is installed, without touching the network.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use super::LaunchContext;
use crate::update::VersionStore;

/// Show the installed version and which pieces are present.
#[derive(Args, Debug, Default)]
pub struct StatusCommand {
    /// Print JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

/// Snapshot printed by `status`.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct InstallStatus {
    /// Absolute install directory.
    pub install_dir: String,
    /// Recorded version, `None` when nothing is recorded.
    pub version: Option<String>,
    /// Runtime executable present.
    pub runtime_installed: bool,
    /// Bundle entry point present.
    pub bundle_installed: bool,
    /// Release feed queried by `check` and `run`.
    pub feed_url: String,
}

impl InstallStatus {
    /// Inspect the install directory described by `context`.
    pub async fn collect(context: &LaunchContext) -> Self {
        let version = VersionStore::new(&context.install_dir).read().await;
        Self {
            install_dir: context.install_dir.display().to_string(),
            version: (!version.is_empty()).then_some(version),
            runtime_installed: context.runtime_path().is_file(),
            bundle_installed: context.entry_point().is_file(),
            feed_url: context.config.feed.latest_release_url(),
        }
    }
}

impl StatusCommand {
    /// Execute the command.
    pub async fn execute(self, context: &LaunchContext) -> Result<()> {
        let status = InstallStatus::collect(context).await;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&status)?);
            return Ok(());
        }

        let present = |yes: bool| if yes { "present".green() } else { "missing".red() };
        println!("{} {}", "Install directory:".bold(), status.install_dir);
        println!(
            "{} {}",
            "Installed version:".bold(),
            status.version.as_deref().unwrap_or("none")
        );
        println!("{} {}", "Runtime:".bold(), present(status.runtime_installed));
        println!("{} {}", "Bundle:".bold(), present(status.bundle_installed));
        println!("{} {}", "Release feed:".bold(), status.feed_url);
        Ok(())
    }
}
