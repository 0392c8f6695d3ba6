//! Progress indicators for long-running build stages.
//!
//! Bars are hidden when `ADDONPACK_NO_PROGRESS` is set, when `--no-progress`
//! was passed, or when stderr is not a terminal.
//!
//! ```rust
//! use addonpack::utils::progress::ProgressBar;
//!
//! let progress = ProgressBar::new(3);
//! progress.set_prefix("Binarizing");
//! for _ in 0..3 {
//!     progress.inc(1);
//! }
//! progress.finish_and_clear();
//! ```

use indicatif::{ProgressBar as IndicatifBar, ProgressStyle as IndicatifStyle};
use std::io::IsTerminal;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::constants::NO_PROGRESS_ENV;

static DISABLED: AtomicBool = AtomicBool::new(false);

/// Hides every progress bar created afterwards.
pub fn disable_progress() {
    DISABLED.store(true, Ordering::Relaxed);
}

/// Whether progress output is suppressed for this process.
#[must_use]
pub fn is_progress_disabled() -> bool {
    DISABLED.load(Ordering::Relaxed)
        || std::env::var_os(NO_PROGRESS_ENV).is_some()
        || !std::io::stderr().is_terminal()
}

/// A styled progress bar that silently ignores updates when disabled.
#[derive(Clone)]
pub struct ProgressBar {
    inner: IndicatifBar,
}

impl ProgressBar {
    /// Creates a bar tracking `len` units of work.
    pub fn new(len: u64) -> Self {
        let bar = if is_progress_disabled() {
            IndicatifBar::hidden()
        } else {
            let bar = IndicatifBar::new(len);
            if let Ok(style) = default_style() {
                bar.set_style(style);
            }
            bar
        };
        Self { inner: bar }
    }

    /// Sets the message shown after the bar.
    pub fn set_message(&self, msg: impl Into<String>) {
        self.inner.set_message(msg.into());
    }

    /// Sets the label shown before the bar.
    pub fn set_prefix(&self, prefix: impl Into<String>) {
        self.inner.set_prefix(prefix.into());
    }

    /// Advances the bar.
    pub fn inc(&self, delta: u64) {
        self.inner.inc(delta);
    }

    /// Removes the bar from the terminal.
    pub fn finish_and_clear(&self) {
        self.inner.finish_and_clear();
    }

    /// Whether the bar draws anything.
    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.inner.is_hidden()
    }
}

fn default_style() -> Result<IndicatifStyle, indicatif::style::TemplateError> {
    Ok(IndicatifStyle::default_bar()
        .template("{prefix:.bold} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
        .progress_chars("━╸━"))
}
