//! `bundlekeeper run`: bootstrap, then supervise until Ctrl-C.

use anyhow::Result;
use clap::Args;
use tracing::{info, warn};

use super::LaunchContext;
use crate::supervisor::{InstallLock, Supervisor};
use crate::update::BundleSource;

/// Bootstrap the install directory and supervise the worker.
#[derive(Args, Debug, Default)]
pub struct RunCommand {
    /// Run this many cycles and exit instead of supervising forever.
    #[arg(long, value_name = "N")]
    pub max_cycles: Option<u64>,
}

impl RunCommand {
    /// Execute the command.
    ///
    /// Only bootstrap failures and a held install lock return an error; once
    /// supervision starts this returns on Ctrl-C (or after `--max-cycles`).
    pub async fn execute(self, context: &LaunchContext) -> Result<()> {
        let config = &context.config;
        let _lock = InstallLock::acquire(&context.install_dir, config.supervisor.lock_timeout()).await?;

        let client = context.release_client()?;
        let coordinator = context.coordinator(client.clone());
        let report = context.bootstrapper(client).ensure_ready(&coordinator).await?;

        match &report.bundle {
            BundleSource::Present => info!("Using installed bundle"),
            BundleSource::Feed { version } => info!("Installed bundle {} from the release feed", version),
            BundleSource::Fallback { archive } => {
                warn!("Running fallback bundle from {}", archive.display())
            }
        }

        let mut supervisor = Supervisor::from_config(config, &context.install_dir, coordinator)?;
        info!(install_dir = %context.install_dir.display(), "Supervising worker");

        supervisor.run_limited(self.max_cycles, shutdown_signal()).await;
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Cannot listen for Ctrl-C, supervising until killed: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Ctrl-C received");
}
