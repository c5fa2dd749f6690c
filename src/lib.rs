//! bundlekeeper - self-updating launcher for a single worker process
//!
//! bundlekeeper keeps one long-running worker (a JavaScript bundle executed by
//! the bun runtime) installed, current and alive on an unattended host. Each
//! supervision cycle checks a GitHub-style release feed, installs a newer
//! bundle when the published version differs from the installed one, launches
//! the worker and watches its health endpoint until it exits or hangs.
//!
//! # Architecture Overview
//!
//! ```text
//! Supervisor ──▶ UpdateCoordinator ──▶ ReleaseClient ──▶ release feed
//!     │                 │                    └──────────▶ artifact download
//!     │                 ├──▶ extract_archive ──▶ install dir
//!     │                 └──▶ VersionStore ──▶ install dir/version
//!     ├──▶ worker process (inherited stdio)
//!     └──▶ Watchdog ──▶ health endpoint
//!              └── TerminateRequest ──▶ Supervisor
//! ```
//!
//! # Core Modules
//!
//! - [`supervisor`] - the update / launch / watch / restart state machine,
//!   the liveness watchdog and the install-directory lock
//! - [`update`] - version comparison, bundle installation and first-run bootstrap
//! - [`release`] - release feed queries, downloads and checksum verification
//! - [`installer`] - zip extraction and runtime acquisition
//!
//! # Supporting Modules
//!
//! - [`cli`] - command-line interface
//! - [`config`] - `bundlekeeper.toml` loading and defaults
//! - [`constants`] - file names, intervals and timeouts
//! - [`core`] - error types and user-facing error rendering
//! - [`utils`] - filesystem and progress helpers
//!
//! # Example
//!
//! ```rust,no_run
//! use bundlekeeper::config::LauncherConfig;
//! use bundlekeeper::release::ReleaseClient;
//! use bundlekeeper::update::{UpdateCoordinator, UpdateOutcome};
//! use std::path::Path;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = LauncherConfig::default();
//! let install_dir = Path::new("/srv/printer/bin");
//! let client = ReleaseClient::from_config(&config.feed)?;
//! let coordinator = UpdateCoordinator::new(client, install_dir, &config.feed);
//!
//! match coordinator.ensure_updated().await {
//!     UpdateOutcome::Updated { version, .. } => println!("now running {version}"),
//!     outcome => println!("{outcome}"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod installer;
pub mod release;
pub mod supervisor;
pub mod update;
pub mod utils;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
