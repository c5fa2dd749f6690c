//! Error handling for bundlekeeper
//!
//! The error system follows two rules:
//! 1. **Strongly-typed errors** ([`LauncherError`]) inside the library, so the
//!    supervisor can classify a failure without string matching
//! 2. **User-friendly messages** ([`ErrorContext`]) at the CLI boundary, with a
//!    suggestion for the operator of the unattended host
//!
//! # Error Categories
//!
//! - **Transport**: [`LauncherError::Network`]
//! - **Protocol**: [`LauncherError::FeedStatus`], [`LauncherError::FeedParse`]
//! - **Missing artifact**: [`LauncherError::AssetNotFound`]
//! - **Filesystem / archive**: [`LauncherError::Io`], [`LauncherError::ArchiveOpen`],
//!   [`LauncherError::Extraction`], [`LauncherError::ChecksumMismatch`],
//!   [`LauncherError::Download`]
//! - **Process launch**: [`LauncherError::Launch`]
//! - **Fatal bootstrap**: [`LauncherError::Bootstrap`], [`LauncherError::LockHeld`]
//!
//! Cycle-level errors never unwind past the supervisor loop; they are logged and
//! the loop continues. Only bootstrap errors reach [`user_friendly_error`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use bundlekeeper::core::{LauncherError, user_friendly_error};
//!
//! let error = LauncherError::AssetNotFound {
//!     asset: "app-bundle.zip".to_string(),
//!     version: "v2.0.0".to_string(),
//! };
//! assert!(error.is_fetch_error());
//!
//! let ctx = user_friendly_error(anyhow::Error::from(error));
//! ctx.display();
//! ```

use colored::Colorize;
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// The main error type for launcher operations.
///
/// Variants carry owned strings rather than source errors so that the type is
/// `Clone` and can travel inside [`UpdateOutcome`](crate::update::UpdateOutcome)
/// and cycle reports.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LauncherError {
    /// Network, DNS or timeout failure while talking to a remote endpoint.
    #[error("Network error during {operation}: {reason}")]
    Network {
        /// What was being attempted (e.g. "release feed query").
        operation: String,
        /// Underlying transport error text.
        reason: String,
    },

    /// The release feed answered with a non-success status.
    #[error("Release feed at {url} returned HTTP {status}")]
    FeedStatus {
        /// Feed URL that was queried.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// The release feed body was not the expected JSON document.
    #[error("Failed to parse release feed response: {reason}")]
    FeedParse {
        /// Parser error text.
        reason: String,
    },

    /// The release exists but does not publish the bundle artifact.
    #[error("{asset} not found in release {version}")]
    AssetNotFound {
        /// Expected artifact name.
        asset: String,
        /// Release tag that was inspected.
        version: String,
    },

    /// Downloading an artifact failed after the feed query succeeded.
    #[error("Failed to download {url}: {reason}")]
    Download {
        /// Artifact URL.
        url: String,
        /// Failure description.
        reason: String,
    },

    /// Downloaded archive does not match the published SHA-256.
    #[error("Checksum mismatch for {path}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Archive that was verified.
        path: String,
        /// Published checksum.
        expected: String,
        /// Computed checksum.
        actual: String,
    },

    /// The archive could not be opened or its central directory is corrupt.
    #[error("Failed to open archive {path}: {reason}")]
    ArchiveOpen {
        /// Archive path.
        path: String,
        /// Reader error text.
        reason: String,
    },

    /// A single archive entry could not be created or written.
    #[error("Failed to extract entry '{entry}': {reason}")]
    Extraction {
        /// Entry name as recorded in the archive.
        entry: String,
        /// Failure description.
        reason: String,
    },

    /// Generic filesystem failure.
    #[error("File system error during {operation} on {path}: {reason}")]
    Io {
        /// Operation that failed (e.g. "write version file").
        operation: String,
        /// Path involved.
        path: String,
        /// I/O error text.
        reason: String,
    },

    /// The worker process could not be started.
    #[error("Failed to launch worker {program}: {reason}")]
    Launch {
        /// Executable that was spawned.
        program: String,
        /// Spawn error text.
        reason: String,
    },

    /// No runtime download exists for this operating system / architecture.
    #[error("Platform not supported: {os}/{arch}")]
    UnsupportedPlatform {
        /// `std::env::consts::OS`.
        os: String,
        /// `std::env::consts::ARCH`.
        arch: String,
    },

    /// Runtime or first bundle could not be obtained. Fatal.
    #[error("Bootstrap failed: {reason}")]
    Bootstrap {
        /// What could not be obtained.
        reason: String,
    },

    /// Another launcher already supervises the install directory. Fatal.
    #[error("Install directory {path} is locked by another launcher")]
    LockHeld {
        /// Install directory.
        path: String,
    },

    /// Invalid configuration file or value.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the problem.
        message: String,
    },
}

impl LauncherError {
    /// Build an [`LauncherError::Io`] from an [`std::io::Error`].
    pub fn io(operation: impl Into<String>, path: &Path, err: &std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            path: path.display().to_string(),
            reason: err.to_string(),
        }
    }

    /// Build an [`LauncherError::Io`] from an `anyhow` chain returned by [`crate::utils::fs`].
    pub fn io_chain(operation: impl Into<String>, path: &Path, err: &anyhow::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            path: path.display().to_string(),
            reason: format!("{err:#}"),
        }
    }

    /// Build a [`LauncherError::Network`] from a `reqwest` error.
    pub fn network(operation: impl Into<String>, err: &reqwest::Error) -> Self {
        Self::Network {
            operation: operation.into(),
            reason: err.to_string(),
        }
    }

    /// True for transport, protocol and missing-artifact failures.
    ///
    /// These leave the installed bundle untouched and are reported as
    /// [`UpdateOutcome::FetchFailed`](crate::update::UpdateOutcome::FetchFailed).
    pub fn is_fetch_error(&self) -> bool {
        matches!(
            self,
            Self::Network { .. }
                | Self::FeedStatus { .. }
                | Self::FeedParse { .. }
                | Self::AssetNotFound { .. }
        )
    }

    /// True for errors that must halt the launcher.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Bootstrap { .. } | Self::LockHeld { .. } | Self::Config { .. })
    }
}

/// Error wrapper with a suggestion and details for display at the CLI boundary.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: LauncherError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub const fn new(error: LauncherError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr: error in red, details in yellow, suggestion in green.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into an [`ErrorContext`] with a suggestion where one is known.
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(launcher_error) = error.downcast_ref::<LauncherError>() {
        return create_error_context(launcher_error.clone());
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        if io_error.kind() == std::io::ErrorKind::PermissionDenied {
            return ErrorContext::new(LauncherError::Io {
                operation: "file access".to_string(),
                path: "unknown".to_string(),
                reason: io_error.to_string(),
            })
            .with_suggestion("Check that the launcher may write to its install directory");
        }
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(LauncherError::Config {
            message: toml_error.to_string(),
        })
        .with_suggestion("Check the TOML syntax in bundlekeeper.toml");
    }

    // Keep the whole anyhow chain so context lines are not lost
    ErrorContext::new(LauncherError::Bootstrap {
        reason: format!("{error:#}"),
    })
}

fn create_error_context(error: LauncherError) -> ErrorContext {
    match &error {
        LauncherError::Bootstrap { .. } => ErrorContext::new(error)
            .with_details("There is nothing to supervise until the runtime and a bundle are installed")
            .with_suggestion(
                "Check network access to the release feed, or place a bundle archive at the configured fallback path",
            ),
        LauncherError::LockHeld { .. } => ErrorContext::new(error)
            .with_suggestion("Stop the other launcher instance or use a different --install-dir"),
        LauncherError::UnsupportedPlatform { .. } => ErrorContext::new(error)
            .with_suggestion("Install the runtime manually into the install directory"),
        LauncherError::Config { .. } => ErrorContext::new(error)
            .with_suggestion("Fix bundlekeeper.toml or remove it to use defaults"),
        LauncherError::Network { .. } => ErrorContext::new(error)
            .with_suggestion("Check your internet connection and proxy settings"),
        _ => ErrorContext::new(error),
    }
}
