//! Release feed access.
//!
//! The feed answers a single question: "what is the latest published version
//! and where are its artifacts". The response shape is the GitHub
//! `releases/latest` document, of which only two fields matter:
//!
//! ```json
//! {
//!   "tag_name": "v2.0.0",
//!   "assets": [
//!     { "name": "app-bundle.zip", "browser_download_url": "https://..." }
//!   ]
//! }
//! ```
//!
//! A [`ReleaseDescriptor`] is fetched fresh on every cycle and never cached.
//!
//! # Error Mapping
//!
//! | Failure | Error |
//! |---------|-------|
//! | connect / DNS / timeout | [`LauncherError::Network`] |
//! | non-2xx status | [`LauncherError::FeedStatus`] |
//! | body is not the expected JSON | [`LauncherError::FeedParse`] |
//! | artifact missing from the release | [`LauncherError::AssetNotFound`] |

mod download;
pub mod verification;

pub use verification::ChecksumVerifier;

use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::FeedConfig;
use crate::constants::USER_AGENT;
use crate::core::LauncherError;

/// One downloadable artifact of a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseAsset {
    /// Artifact file name, e.g. `app-bundle.zip`.
    pub name: String,
    /// Direct download URL.
    #[serde(rename = "browser_download_url")]
    pub download_url: String,
}

/// Latest release as reported by the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseDescriptor {
    /// Opaque version identifier (the release tag).
    #[serde(rename = "tag_name")]
    pub version: String,
    /// Published artifacts, in feed order.
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

impl ReleaseDescriptor {
    /// First asset whose name equals `name` exactly.
    pub fn find_asset(&self, name: &str) -> Option<&ReleaseAsset> {
        self.assets.iter().find(|asset| asset.name == name)
    }

    /// Like [`find_asset`](Self::find_asset) but a missing asset is an error.
    pub fn require_asset(&self, name: &str) -> Result<&ReleaseAsset, LauncherError> {
        self.find_asset(name).ok_or_else(|| LauncherError::AssetNotFound {
            asset: name.to_string(),
            version: self.version.clone(),
        })
    }
}

/// HTTP client for the release feed and artifact downloads.
///
/// `timeout` bounds connecting and every individual read. Feed queries and
/// checksum fetches are also bounded as a whole by it; artifact downloads are
/// not, so a large archive on a slow link completes as long as bytes keep
/// arriving.
#[derive(Debug, Clone)]
pub struct ReleaseClient {
    client: reqwest::Client,
    feed_url: String,
    timeout: Duration,
}

impl ReleaseClient {
    /// Create a client for `feed_url`.
    pub fn new(feed_url: impl Into<String>, timeout: Duration) -> Result<Self, LauncherError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .build()
            .map_err(|e| LauncherError::network("HTTP client setup", &e))?;

        Ok(Self {
            client,
            feed_url: feed_url.into(),
            timeout,
        })
    }

    /// Create a client from the `[feed]` configuration section.
    pub fn from_config(feed: &FeedConfig) -> Result<Self, LauncherError> {
        Self::new(feed.latest_release_url(), feed.request_timeout())
    }

    /// URL queried by [`latest_release`](Self::latest_release).
    pub fn feed_url(&self) -> &str {
        &self.feed_url
    }

    /// Query the feed for the latest release.
    pub async fn latest_release(&self) -> Result<ReleaseDescriptor, LauncherError> {
        debug!("Querying release feed {}", self.feed_url);

        let response = self
            .client
            .get(&self.feed_url)
            .timeout(self.timeout)
            .header(ACCEPT, "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| LauncherError::network("release feed query", &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LauncherError::FeedStatus {
                url: self.feed_url.clone(),
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| LauncherError::network("release feed read", &e))?;

        let release: ReleaseDescriptor =
            serde_json::from_slice(&body).map_err(|e| LauncherError::FeedParse {
                reason: e.to_string(),
            })?;

        debug!(version = %release.version, assets = release.assets.len(), "Release feed answered");
        Ok(release)
    }

    /// Fetch a small text artifact. `Ok(None)` when the server answers non-2xx.
    pub async fn fetch_text(&self, url: &str) -> Result<Option<String>, LauncherError> {
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| LauncherError::Download {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            debug!("{} answered HTTP {}", url, response.status());
            return Ok(None);
        }

        let text = response.text().await.map_err(|e| LauncherError::Download {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Some(text))
    }
}
