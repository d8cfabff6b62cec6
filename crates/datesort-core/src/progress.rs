use std::path::Path;

use crate::engine::SortSummary;

/// Trait for reporting run progress.
///
/// The CLI implements it with indicatif progress bars. Notifications are
/// informational only and never influence what gets copied.
/// All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_index_start(&self, _root: &Path) {}
    fn on_index_progress(&self, _files_hashed: usize, _total_files: usize) {}
    fn on_index_complete(&self, _total_records: usize, _duration_secs: f64) {}
    fn on_sort_start(&self, _source: &Path, _total_files: usize) {}
    /// Called after every file decision with a 1-based index.
    fn on_file_processed(&self, _current: usize, _total: usize, _label: &str) {}
    fn on_sort_complete(&self, _summary: &SortSummary, _duration_secs: f64) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
