//! Download progress display.
//!
//! Progress bars are hidden when `BUNDLEKEEPER_NO_PROGRESS` is set (the
//! `--no-progress` flag sets it) or when stderr is not a terminal, which is
//! the normal case for a launcher running as a service.

use indicatif::{ProgressBar as IndicatifBar, ProgressStyle as IndicatifStyle};
use std::io::IsTerminal;

use crate::constants::NO_PROGRESS_ENV;

fn is_progress_disabled() -> bool {
    std::env::var_os(NO_PROGRESS_ENV).is_some() || !std::io::stderr().is_terminal()
}

/// Byte-count progress bar for artifact downloads.
#[derive(Clone)]
pub struct ProgressBar {
    inner: IndicatifBar,
}

impl ProgressBar {
    /// Create a bar for a download of `total` bytes, or a spinner when the
    /// server did not send a content length.
    pub fn for_download(total: Option<u64>, label: &str) -> Self {
        let bar = if is_progress_disabled() {
            IndicatifBar::hidden()
        } else {
            match total {
                Some(len) => {
                    let bar = IndicatifBar::new(len);
                    bar.set_style(download_style());
                    bar
                }
                None => {
                    let bar = IndicatifBar::new_spinner();
                    bar.set_style(spinner_style());
                    bar
                }
            }
        };
        bar.set_message(label.to_string());
        Self { inner: bar }
    }

    /// Advance by `delta` bytes.
    pub fn inc(&self, delta: u64) {
        self.inner.inc(delta);
    }

    /// Current position in bytes.
    pub fn position(&self) -> u64 {
        self.inner.position()
    }

    /// Remove the bar from the terminal.
    pub fn finish_and_clear(&self) {
        self.inner.finish_and_clear();
    }
}

fn download_style() -> IndicatifStyle {
    IndicatifStyle::default_bar()
        .template("{msg} [{bar:30.cyan/blue}] {bytes}/{total_bytes} ({eta})")
        .unwrap_or_else(|_| IndicatifStyle::default_bar())
        .progress_chars("=>-")
}

fn spinner_style() -> IndicatifStyle {
    IndicatifStyle::default_spinner()
        .template("{spinner} {msg} {bytes}")
        .unwrap_or_else(|_| IndicatifStyle::default_spinner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_bar_still_counts() {
        unsafe {
            std::env::set_var(NO_PROGRESS_ENV, "1");
        }
        let bar = ProgressBar::for_download(Some(100), "bundle");
        bar.inc(40);
        bar.inc(2);
        assert_eq!(bar.position(), 42);
        bar.finish_and_clear();
    }
}
