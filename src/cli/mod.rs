//! Command-line interface for bundlekeeper.
//!
//! # Available Commands
//!
//! - `run` (default) - bootstrap the install directory and supervise the
//!   worker until interrupted
//! - `check` - run a single update check and report the outcome
//! - `status` - show what is installed
//!
//! # Global Options
//!
//! - `--verbose` / `--quiet` - log at `debug` / `error` instead of `info`
//!   (`RUST_LOG` overrides both)
//! - `--config <path>` - configuration file (see [`crate::config`])
//! - `--base-dir <dir>` - directory relative paths are resolved against
//! - `--install-dir <dir>` - override `install_dir` from the configuration
//! - `--no-progress` - hide download progress bars
//! - `--no-pause` - exit immediately on a fatal error instead of waiting for Enter
//!
//! ```bash
//! # Supervise with defaults from ./bundlekeeper.toml
//! bundlekeeper
//!
//! # One-off update check against a custom install directory
//! bundlekeeper --install-dir /srv/printer/bin check
//! ```

mod check;
mod context;
mod run;
mod status;


pub use check::CheckCommand;
pub use context::LaunchContext;
pub use run::RunCommand;
pub use status::StatusCommand;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::constants::NO_PROGRESS_ENV;

/// Settings derived from global flags, applied once before a command runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliConfig {
    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: String,
    /// Hide progress bars.
    pub no_progress: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            no_progress: false,
        }
    }
}

impl CliConfig {
    /// Export settings that deeper layers read from the environment.
    pub fn apply_to_env(&self) {
        if self.no_progress {
            // SAFETY: set once at startup, before any task reads the environment
            unsafe {
                std::env::set_var(NO_PROGRESS_ENV, "1");
            }
        }
    }

    /// Install the global tracing subscriber. Later calls are no-ops.
    pub fn init_tracing(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.log_level));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init();
    }
}

/// Top-level argument parser.
#[derive(Parser, Debug)]
#[command(
    name = "bundlekeeper",
    about = "Keeps a worker bundle installed, current and alive",
    version,
    long_about = None
)]
pub struct Cli {
    /// Command to run; `run` when omitted.
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log at debug level.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Log errors only.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Configuration file path.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Base directory for relative paths (default: current directory).
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    /// Install directory, overriding the configuration file.
    #[arg(long, global = true)]
    install_dir: Option<PathBuf>,

    /// Disable download progress bars.
    #[arg(long, global = true)]
    no_progress: bool,

    /// Do not wait for Enter after a fatal error.
    #[arg(long, global = true)]
    no_pause: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Bootstrap and supervise the worker (default)
    Run(RunCommand),
    /// Check the release feed once and install a newer bundle
    Check(CheckCommand),
    /// Show the installed version and install directory contents
    Status(StatusCommand),
}

impl Cli {
    /// Parse global flags into a [`CliConfig`].
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "info"
        };

        CliConfig {
            log_level: log_level.to_string(),
            no_progress: self.no_progress,
        }
    }

    /// Whether a fatal error should wait for the operator to press Enter.
    pub fn pause_on_error(&self) -> bool {
        !self.no_pause
    }

    /// Apply global settings, load configuration and run the selected command.
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        config.apply_to_env();
        config.init_tracing();

        let context = self.load_context().await?;
        match self.command.unwrap_or_default() {
            Commands::Run(cmd) => cmd.execute(&context).await,
            Commands::Check(cmd) => cmd.execute(&context).await,
            Commands::Status(cmd) => cmd.execute(&context).await,
        }
    }

    async fn load_context(&self) -> Result<LaunchContext> {
        let base_dir = match &self.base_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().context("Failed to determine current directory")?,
        };
        LaunchContext::load(base_dir, self.config.as_deref(), self.install_dir.clone()).await
    }
}

impl Default for Commands {
    fn default() -> Self {
        Self::Run(RunCommand::default())
    }
}
