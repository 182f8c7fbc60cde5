//! Progress bar utilities for long-running operations
//!
//! Provides visual feedback while the engine runs and while per-job
//! statistics are aggregated, using the indicatif crate.

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Progress bar for per-job statistics
pub struct JobProgress {
    pub progress: ProgressBar,
    failed: AtomicUsize,
}

impl JobProgress {
    /// Create a new job progress bar
    pub fn new(total_jobs: usize) -> Self {
        let progress = ProgressBar::new(total_jobs as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})\n{msg}")
        {
            progress.set_style(style.progress_chars("#>-"));
        }

        Self {
            progress,
            failed: AtomicUsize::new(0),
        }
    }

    /// Record one finished job; safe to call from worker threads
    pub fn record(&self, job_id: u64, summarized: bool) {
        if !summarized {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        self.progress.inc(1);
        self.progress.set_message(format!("📊 Job {} done", job_id));
    }

    pub fn skipped(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }

    /// Mark aggregation as complete
    pub fn finish(&self, rows: usize) {
        self.progress.finish_with_message(format!(
            "✅ Aggregated {} job(s), {} skipped",
            rows,
            self.skipped()
        ));
    }
}

/// Spinner for quick operations
pub struct Spinner {
    pub spinner: ProgressBar,
}

impl Spinner {
    /// Create a new spinner
    pub fn new(message: &str) -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            spinner.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
        }
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner.set_message(message.to_string());

        Self { spinner }
    }

    /// Update spinner message
    pub fn update(&self, message: &str) {
        self.spinner.set_message(message.to_string());
    }

    /// Finish spinner with success
    pub fn finish(&self, message: &str) {
        self.spinner.finish_with_message(format!("✅ {}", message));
    }

    /// Finish spinner with error
    pub fn finish_with_error(&self, message: &str) {
        self.spinner.finish_with_message(format!("❌ {}", message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_progress_counts_skips() {
        let progress = JobProgress::new(3);
        progress.record(0, true);
        progress.record(1, false);
        progress.record(2, true);
        assert_eq!(progress.skipped(), 1);
        assert_eq!(progress.progress.position(), 3);
        progress.finish(2);
    }

    #[test]
    fn test_spinner() {
        let spinner = Spinner::new("Loading...");
        std::thread::sleep(Duration::from_millis(100));
        spinner.finish("Loaded");
    }
}
