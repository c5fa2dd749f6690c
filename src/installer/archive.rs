//! Zip extraction into the install directory.
//!
//! Extraction merges into the destination: entries overwrite files at the same
//! path, files not named by the archive are left alone. There is no rollback;
//! the first entry that cannot be written aborts the run and leaves earlier
//! entries on disk.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::core::LauncherError;

/// What an extraction created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractionSummary {
    /// Regular files written.
    pub files: usize,
    /// Directory entries ensured.
    pub directories: usize,
}

/// Extract every entry of `archive_path` under `dest_dir`.
///
/// Directory entries are created. File entries get their parent directories
/// created, are truncated and rewritten, then receive the entry's recorded
/// Unix mode when the archive carries one.
///
/// # Errors
///
/// - [`LauncherError::ArchiveOpen`] if the file is missing or not a zip archive
/// - [`LauncherError::Extraction`] for the first entry that cannot be written,
///   including entries whose path would escape `dest_dir`
pub fn extract_archive(
    archive_path: &Path,
    dest_dir: &Path,
) -> Result<ExtractionSummary, LauncherError> {
    let open_error = |reason: String| LauncherError::ArchiveOpen {
        path: archive_path.display().to_string(),
        reason,
    };

    let file = File::open(archive_path).map_err(|e| open_error(e.to_string()))?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| open_error(e.to_string()))?;

    debug!("Extracting {} entries from {}", archive.len(), archive_path.display());

    let mut summary = ExtractionSummary::default();
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(|e| LauncherError::Extraction {
            entry: format!("#{index}"),
            reason: e.to_string(),
        })?;

        let name = entry.name().to_string();
        let extraction_error = |reason: String| LauncherError::Extraction {
            entry: name.clone(),
            reason,
        };

        let relative: PathBuf = entry
            .enclosed_name()
            .ok_or_else(|| extraction_error("path escapes the destination directory".to_string()))?;
        let target = dest_dir.join(&relative);

        if entry.is_dir() {
            fs::create_dir_all(&target).map_err(|e| extraction_error(e.to_string()))?;
            summary.directories += 1;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| extraction_error(e.to_string()))?;
        }

        let mut out = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&target)
            .map_err(|e| extraction_error(e.to_string()))?;
        io::copy(&mut entry, &mut out).map_err(|e| extraction_error(e.to_string()))?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&target, fs::Permissions::from_mode(mode & 0o7777))
                .map_err(|e| extraction_error(e.to_string()))?;
        }

        summary.files += 1;
    }

    debug!(
        files = summary.files,
        directories = summary.directories,
        "Extracted {} into {}",
        archive_path.display(),
        dest_dir.display()
    );
    Ok(summary)
}

/// Run [`extract_archive`] on the blocking thread pool.
pub async fn extract_archive_async(
    archive_path: PathBuf,
    dest_dir: PathBuf,
) -> Result<ExtractionSummary, LauncherError> {
    let archive_display = archive_path.display().to_string();
    tokio::task::spawn_blocking(move || extract_archive(&archive_path, &dest_dir))
        .await
        .map_err(|e| LauncherError::Extraction {
            entry: archive_display,
            reason: format!("extraction task failed: {e}"),
        })?
}
