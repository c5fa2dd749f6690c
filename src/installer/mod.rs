//! Writing artifacts into the install directory.
//!
//! - [`archive`] unpacks a bundle zip over the install directory
//! - [`runtime`] fetches the runtime executable on first run

pub mod archive;
pub mod runtime;

pub use archive::{ExtractionSummary, extract_archive, extract_archive_async};
pub use runtime::{RuntimeInstaller, platform_asset};
