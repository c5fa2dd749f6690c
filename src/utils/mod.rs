//! Cross-platform helpers
//!
//! - [`fs`] - atomic writes, directory creation, permission fix-ups
//! - [`progress`] - download progress bars

pub mod fs;
pub mod progress;

pub use fs::{atomic_write, ensure_dir, ensure_executable, remove_file_if_exists};
pub use progress::ProgressBar;
