//! Progress bar helpers
//!
//! Bars are hidden entirely when the install is quiet.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Standard spinner characters
const SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// Standard tick interval for spinners
const TICK_INTERVAL_MS: u64 = 80;

const SPINNER_TEMPLATE: &str = "     {spinner:.cyan} {msg}";
const BYTES_TEMPLATE: &str =
    "     {spinner:.cyan} [{bar:30.cyan/dim}] {bytes}/{total_bytes} ({eta})";

/// Create a spinner progress bar with standard styling.
pub fn create_spinner(message: &str, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template(SPINNER_TEMPLATE) {
        pb.set_style(style.tick_chars(SPINNER_CHARS));
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(TICK_INTERVAL_MS));
    pb
}

/// Upgrade a spinner to a byte progress bar when content length becomes known.
pub fn upgrade_to_bytes(pb: &ProgressBar, total_bytes: u64) {
    pb.set_length(total_bytes);
    if pb.is_hidden() {
        return;
    }
    if let Ok(style) = ProgressStyle::default_bar().template(BYTES_TEMPLATE) {
        pb.set_style(style.progress_chars("━╸━"));
    }
}

/// RAII guard that clears a progress bar when dropped.
///
/// Keeps the terminal clean when a download bails out early.
pub struct ProgressGuard(ProgressBar);

impl ProgressGuard {
    pub fn new(pb: ProgressBar) -> Self {
        Self(pb)
    }

    pub fn bar(&self) -> &ProgressBar {
        &self.0
    }
}

impl Drop for ProgressGuard {
    fn drop(&mut self) {
        self.0.finish_and_clear();
    }
}
