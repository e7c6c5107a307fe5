use indicatif::{ProgressBar, ProgressStyle};
use rt_archive_core::ProgressReporter;
use std::sync::Mutex;
use std::time::Duration;

const TICKS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// CLI progress reporter using indicatif spinners, one per phase.
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn spinner(message: String) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars(TICKS);
        pb.set_style(style);
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(80));
        pb
    }

    fn set_bar(&self, pb: ProgressBar) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(old) = guard.take() {
                old.finish_and_clear();
            }
            *guard = Some(pb);
        }
    }

    fn set_message(&self, message: String) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(pb) = guard.as_ref() {
                pb.set_message(message);
            }
        }
    }

    fn finish_bar(&self) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
    }
}

impl ProgressReporter for CliReporter {
    fn on_fetch_start(&self, source: &str) {
        self.set_bar(Self::spinner(format!("Fetching {}...", source)));
    }

    fn on_fetch_page(&self, source: &str, request: u32, items_so_far: usize) {
        self.set_message(format!(
            "Fetching {}... {} items after {} requests",
            source, items_so_far, request
        ));
    }

    fn on_fetch_complete(&self, source: &str, items: usize, requests: u32, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m {}: {} items across {} requests in {:.2}s",
            source, items, requests, duration_secs
        );
    }

    fn on_reconcile_complete(&self, entries: usize, duration_secs: f64) {
        eprintln!(
            "  \x1b[32m✓\x1b[0m Reconciled {} catalog items in {:.2}s",
            entries, duration_secs
        );
    }

    fn on_write_start(&self, artifacts: usize) {
        self.set_bar(Self::spinner(format!("Writing {} artifacts...", artifacts)));
    }

    fn on_write_complete(&self, artifacts: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Wrote {} artifacts in {:.2}s",
            artifacts, duration_secs
        );
    }

    fn on_local_scan_start(&self, items: usize) {
        self.set_bar(Self::spinner(format!("Checking {} items locally...", items)));
    }

    fn on_local_scan_complete(&self, missing: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Local check complete: {} items not fully present in {:.2}s",
            missing, duration_secs
        );
    }
}
