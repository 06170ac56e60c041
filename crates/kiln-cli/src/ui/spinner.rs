//! Spinner shown while packages build.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

use super::{colors_enabled, is_quiet};

/// Spinner for work of unknown duration.
///
/// Hidden when quiet or when stderr is not a terminal, so CI logs only get
/// the final status line.
pub struct Spinner {
    pb: ProgressBar,
}

impl Spinner {
    /// Create and start a new spinner.
    pub fn new(message: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        if is_quiet() || super::is_ci() || !console::user_attended_stderr() {
            pb.set_draw_target(ProgressDrawTarget::hidden());
        }
        let template = if colors_enabled() {
            "{spinner:.cyan} {msg}"
        } else {
            "{spinner} {msg}"
        };
        pb.set_style(
            ProgressStyle::default_spinner()
                .template(template)
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["◐", "◓", "◑", "◒"]),
        );
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));

        Self { pb }
    }

    /// Update spinner message while it's running.
    pub fn set_message(&self, message: &str) {
        self.pb.set_message(message.to_string());
    }

    /// Stop the spinner and print a success line.
    pub fn finish(&self, message: &str) {
        self.pb.finish_and_clear();
        super::success(message);
    }

    /// Stop the spinner and print an error line.
    pub fn fail(&self, message: &str) {
        self.pb.finish_and_clear();
        super::error(message);
    }

    /// Stop the spinner without printing anything.
    pub fn clear(&self) {
        self.pb.finish_and_clear();
    }

    /// Handle to the underlying bar, for hiding it while a question is asked.
    pub fn progress_bar(&self) -> ProgressBar {
        self.pb.clone()
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        if !self.pb.is_finished() {
            self.pb.finish_and_clear();
        }
    }
}
