use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::ReleaseClient;
use crate::core::LauncherError;
use crate::utils::ProgressBar;

impl ReleaseClient {
    /// Stream `url` into `dest`, truncating any existing file.
    ///
    /// Only connecting and each read are time-limited; the transfer as a whole
    /// may take as long as the server keeps sending.
    ///
    /// Returns the number of bytes written. A non-2xx answer is a
    /// [`LauncherError::Download`]; `dest` may then hold a partial file, which
    /// callers own and clean up.
    pub async fn download(&self, url: &str, dest: &Path) -> Result<u64, LauncherError> {
        let download_error = |reason: String| LauncherError::Download {
            url: url.to_string(),
            reason,
        };

        debug!("Downloading {} to {}", url, dest.display());

        let mut response =
            self.client.get(url).send().await.map_err(|e| download_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(download_error(format!("HTTP {status}")));
        }

        let label = dest.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        let progress = ProgressBar::for_download(response.content_length(), &label);

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| LauncherError::io("create download file", dest, &e))?;

        let mut written: u64 = 0;
        while let Some(chunk) = response.chunk().await.map_err(|e| download_error(e.to_string()))? {
            file.write_all(&chunk)
                .await
                .map_err(|e| LauncherError::io("write download file", dest, &e))?;
            written += chunk.len() as u64;
            progress.inc(chunk.len() as u64);
        }

        file.flush().await.map_err(|e| LauncherError::io("flush download file", dest, &e))?;
        file.sync_all().await.map_err(|e| LauncherError::io("sync download file", dest, &e))?;
        progress.finish_and_clear();

        debug!("Downloaded {} bytes from {}", written, url);
        Ok(written)
    }
}
