/// Trait for reporting pipeline progress.
///
/// The CLI implements it with indicatif spinners. All methods have default
/// no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_fetch_start(&self, _source: &str) {}
    fn on_fetch_page(&self, _source: &str, _request: u32, _items_so_far: usize) {}
    fn on_fetch_complete(
        &self,
        _source: &str,
        _items: usize,
        _requests: u32,
        _duration_secs: f64,
    ) {
    }
    fn on_reconcile_complete(&self, _entries: usize, _duration_secs: f64) {}
    fn on_write_start(&self, _artifacts: usize) {}
    fn on_write_complete(&self, _artifacts: usize, _duration_secs: f64) {}
    fn on_local_scan_start(&self, _items: usize) {}
    fn on_local_scan_complete(&self, _missing: usize, _duration_secs: f64) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
