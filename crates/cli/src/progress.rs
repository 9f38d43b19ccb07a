//! Progress indicators
//!
//! Bars draw to stderr and stay hidden when it is not a terminal.

use indicatif::ProgressStyle;

pub use indicatif::ProgressBar;
use std::time::Duration;

/// Create a spinner for indeterminate progress
pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.blue} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Create a progress bar for converting `total` images
pub fn conversion_progress(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} images ({eta}) {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓░");
    pb.set_style(style);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// A bar that never draws, for machine-readable output
pub fn hidden() -> ProgressBar {
    ProgressBar::hidden()
}

/// Finish a progress bar with a success message
pub fn finish_success(pb: &ProgressBar, message: &str) {
    pb.finish_with_message(format!("✓ {}", message));
}

/// Finish a progress bar with an error message
pub fn finish_error(pb: &ProgressBar, message: &str) {
    pb.finish_with_message(format!("✗ {}", message));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spinner_creation() {
        let pb = spinner("Scanning...");
        pb.finish_and_clear();
    }

    #[test]
    fn test_conversion_progress() {
        let pb = conversion_progress(10);
        pb.inc(4);
        assert_eq!(pb.position(), 4);
        finish_success(&pb, "done");
        assert!(pb.is_finished());
    }

    #[test]
    fn test_hidden_bar_counts() {
        let pb = hidden();
        pb.set_length(3);
        pb.inc(3);
        assert_eq!(pb.position(), 3);
        finish_error(&pb, "stopped");
    }
}
