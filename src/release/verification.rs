//! SHA-256 verification of downloaded bundle archives.
//!
//! A release may publish `<asset>.sha256` next to the bundle. Both common
//! layouts are accepted:
//!
//! ```text
//! 9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08
//! 9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08  app-bundle.zip
//! ```
//!
//! Releases without a checksum asset are installed unverified.

use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::fs;
use tracing::{debug, info, warn};

use super::{ReleaseClient, ReleaseDescriptor};
use crate::constants::CHECKSUM_ASSET_SUFFIX;
use crate::core::LauncherError;

/// Verifies downloaded archives against published SHA-256 digests.
pub struct ChecksumVerifier;

impl ChecksumVerifier {
    /// Hex-encoded SHA-256 of a file, lowercase.
    pub async fn compute_sha256(file_path: &Path) -> Result<String, LauncherError> {
        debug!("Computing SHA256 checksum for: {}", file_path.display());

        let contents = fs::read(file_path)
            .await
            .map_err(|e| LauncherError::io("read archive for checksum", file_path, &e))?;

        let mut hasher = Sha256::new();
        hasher.update(&contents);
        Ok(hex::encode(hasher.finalize()))
    }

    /// Compare a file against `expected`, ignoring case and an optional `sha256:` prefix.
    pub async fn verify_checksum(file_path: &Path, expected: &str) -> Result<(), LauncherError> {
        let actual = Self::compute_sha256(file_path).await?;
        let expected = normalize(expected);

        if actual != expected {
            return Err(LauncherError::ChecksumMismatch {
                path: file_path.display().to_string(),
                expected,
                actual,
            });
        }

        info!("Checksum verified for {}", file_path.display());
        Ok(())
    }

    /// Extract the digest for `asset_name` from a checksum file body.
    ///
    /// A single bare digest is accepted as-is. Otherwise the first line whose
    /// file column names `asset_name` wins (`*name` binary-mode markers are
    /// understood).
    pub fn parse_checksum_file(content: &str, asset_name: &str) -> Option<String> {
        let lines: Vec<&str> =
            content.lines().map(str::trim).filter(|line| !line.is_empty()).collect();

        if let [only] = lines.as_slice() {
            let mut parts = only.split_whitespace();
            if let (Some(digest), None) = (parts.next(), parts.next()) {
                return Some(normalize(digest));
            }
        }

        lines.iter().find_map(|line| {
            let mut parts = line.split_whitespace();
            let digest = parts.next()?;
            let file = parts.next()?.trim_start_matches('*');
            let file_name = file.rsplit('/').next().unwrap_or(file);
            (file_name == asset_name).then(|| normalize(digest))
        })
    }

    /// Verify `archive` against the release's `<asset>.sha256`, if published.
    ///
    /// Returns `Ok(false)` when the release has no checksum asset or the
    /// checksum file cannot be retrieved or understood, `Ok(true)` after a
    /// successful comparison.
    pub async fn verify_from_release(
        client: &ReleaseClient,
        release: &ReleaseDescriptor,
        asset_name: &str,
        archive: &Path,
    ) -> Result<bool, LauncherError> {
        let checksum_name = format!("{asset_name}{CHECKSUM_ASSET_SUFFIX}");
        let Some(checksum_asset) = release.find_asset(&checksum_name) else {
            debug!("Release {} publishes no {}, skipping verification", release.version, checksum_name);
            return Ok(false);
        };

        let Some(content) = client.fetch_text(&checksum_asset.download_url).await? else {
            warn!("Could not fetch {}, installing unverified", checksum_name);
            return Ok(false);
        };

        let Some(expected) = Self::parse_checksum_file(&content, asset_name) else {
            warn!("No digest for {} in {}, installing unverified", asset_name, checksum_name);
            return Ok(false);
        };

        Self::verify_checksum(archive, &expected).await?;
        Ok(true)
    }
}

fn normalize(digest: &str) -> String {
    let digest = digest.trim();
    digest.strip_prefix("sha256:").unwrap_or(digest).to_lowercase()
}
