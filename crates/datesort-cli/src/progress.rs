use datesort_core::{ProgressReporter, SortSummary};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// CLI progress reporter using indicatif progress bars.
///
/// - Index phase: bar over the destination files being fingerprinted
/// - Sort phase: one bar per source, labelled `<source> -> <destination>`
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn guard(&self) -> MutexGuard<'_, Option<ProgressBar>> {
        self.bar.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_bar(&self, pb: ProgressBar) {
        let mut guard = self.guard();
        if let Some(old) = guard.take() {
            old.finish_and_clear();
        }
        *guard = Some(pb);
    }

    fn finish_bar(&self) {
        if let Some(pb) = self.guard().take() {
            pb.finish_and_clear();
        }
    }

    fn progress_bar(total: usize, template: &str) -> ProgressBar {
        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::with_template(template)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("━╸─")
                .tick_chars(TICK_CHARS),
        );
        pb.enable_steady_tick(Duration::from_millis(80));
        pb
    }
}

impl ProgressReporter for CliReporter {
    fn on_index_start(&self, root: &Path) {
        let pb = Self::progress_bar(
            0,
            "  {spinner:.cyan} Indexing [{bar:30.cyan/dim}] {pos}/{len} files {msg}",
        );
        pb.set_message(root.display().to_string());
        self.set_bar(pb);
    }

    fn on_index_progress(&self, files_hashed: usize, total_files: usize) {
        if let Some(pb) = self.guard().as_ref() {
            if pb.length() != Some(total_files as u64) {
                pb.set_length(total_files as u64);
            }
            pb.set_position(files_hashed as u64);
        }
    }

    fn on_index_complete(&self, total_records: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Index complete: {} files in {:.2}s",
            total_records, duration_secs
        );
    }

    fn on_sort_start(&self, _source: &Path, total_files: usize) {
        let pb = Self::progress_bar(
            total_files,
            "  {spinner:.cyan} [{bar:30.cyan/dim}] {pos}/{len} {msg}",
        );
        self.set_bar(pb);
    }

    fn on_file_processed(&self, current: usize, total: usize, label: &str) {
        if let Some(pb) = self.guard().as_ref() {
            if pb.length() != Some(total as u64) {
                pb.set_length(total as u64);
            }
            pb.set_position(current as u64);
            pb.set_message(label.to_string());
        }
    }

    fn on_sort_complete(&self, summary: &SortSummary, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Sort complete: {} files in {:.2}s",
            summary.processed, duration_secs
        );
    }
}
