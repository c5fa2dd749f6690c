//! Test utilities for bundlekeeper
//!
//! Available to unit tests and, through the `test-utils` feature, to the
//! integration test suite.
//!
//! - [`init_test_logging`] - one-time tracing setup
//! - [`ArchiveBuilder`] - in-memory zip fixtures
//! - [`MockServer`] - local HTTP server standing in for the release feed, the
//!   artifact host and the worker's health endpoint
//!
//! # Example
//!
//! ```rust,no_run
//! use bundlekeeper::test_utils::{ArchiveBuilder, MockServer};
//!
//! # async fn example() {
//! let server = MockServer::start().await;
//! let bundle = ArchiveBuilder::new().file("index.js", b"console.log('hi')").build();
//! server.publish_release("v2.0.0", "app-bundle.zip", bundle);
//!
//! let feed_url = server.feed_url();
//! # }
//! ```

mod archive;
mod server;

pub use archive::ArchiveBuilder;
pub use server::{MockServer, trickle_server, unused_local_url};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. With `None` the `RUST_LOG` environment
/// variable decides, and nothing is logged when it is unset.
///
/// ```bash
/// RUST_LOG=bundlekeeper=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}
