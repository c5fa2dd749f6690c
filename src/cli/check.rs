//! `bundlekeeper check`: a single update check.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::LaunchContext;
use crate::update::UpdateOutcome;

/// Check the feed once and install a newer bundle if there is one.
#[derive(Args, Debug, Default)]
pub struct CheckCommand {
    /// Reinstall even if the installed version matches the feed.
    #[arg(long)]
    pub force: bool,
}

impl CheckCommand {
    /// Execute the command. Fails when the check or the install fails.
    pub async fn execute(self, context: &LaunchContext) -> Result<()> {
        let coordinator = context.coordinator(context.release_client()?);
        let outcome = if self.force {
            coordinator.ensure_updated_forced().await
        } else {
            coordinator.ensure_updated().await
        };

        match outcome {
            UpdateOutcome::Unchanged { version } => {
                println!("{} {}", "Up to date:".green(), version);
                Ok(())
            }
            UpdateOutcome::Updated { previous, version } => {
                let previous = if previous.is_empty() { "none".to_string() } else { previous };
                println!("{} {} -> {}", "Updated:".green().bold(), previous, version);
                Ok(())
            }
            UpdateOutcome::FetchFailed(e) | UpdateOutcome::InstallFailed(e) => Err(e.into()),
        }
    }
}
