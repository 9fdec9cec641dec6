//! Progress reporting

use crate::executor::{EntryResult, ExecutionStats};
use crate::types::{MappingEntry, SyncOutcome};
use console::style;
use indicatif::{HumanBytes, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Instant;

/// Progress reporter for sync runs
pub struct ProgressReporter {
    bar: ProgressBar,
    started_at: Option<Instant>,
    copied_bytes: u64,
}

impl ProgressReporter {
    /// Create a reporter drawing to stderr
    pub fn new() -> Self {
        Self::with_bar(ProgressBar::new(0))
    }

    /// Create a reporter that draws nothing (tests, non-interactive runs)
    pub fn hidden() -> Self {
        Self::with_bar(ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::hidden()))
    }

    fn with_bar(bar: ProgressBar) -> Self {
        if let Ok(style) = ProgressStyle::with_template("{bar:30.cyan/blue} {pos}/{len} mods | {msg}") {
            bar.set_style(style.progress_chars("=>-"));
        }

        Self {
            bar,
            started_at: None,
            copied_bytes: 0,
        }
    }

    /// Initialize progress for a run over `total` entries.
    pub fn start(&mut self, total: u64) {
        self.started_at = Some(Instant::now());
        self.copied_bytes = 0;
        self.bar.set_length(total);
        self.bar.set_position(0);
        self.bar.set_message("Comparing markers...".to_string());
    }

    /// Update current entry indicator.
    pub fn set_current(&self, entry: &MappingEntry) {
        self.bar.set_message(format!("Checking {}", entry));
    }

    /// Mark one entry finished and print a line for anything noteworthy.
    pub fn entry_finished(&mut self, result: &EntryResult) {
        self.copied_bytes = self.copied_bytes.saturating_add(result.copied.bytes_copied);
        self.bar.inc(1);

        match &result.outcome {
            SyncOutcome::Unchanged => {}
            SyncOutcome::Updated => self.bar.println(format!(
                "{} {} ({} files, {})",
                style("UPDATED").green().bold(),
                result.entry,
                result.copied.files_copied,
                HumanBytes(result.copied.bytes_copied)
            )),
            SyncOutcome::Failed(reason) => self.bar.println(format!(
                "{} {}: {}",
                style("FAILED ").red().bold(),
                result.entry,
                reason
            )),
        }

        self.bar.set_message(format!(
            "{} copied | {}/s",
            HumanBytes(self.copied_bytes),
            HumanBytes(self.current_throughput_bps())
        ));
    }

    /// Finalize the run.
    pub fn finish(&self, stats: &ExecutionStats) {
        self.bar.finish_with_message(format!(
            "Done: {} updated, {} unchanged, {} failed | {} copied",
            stats.updated,
            stats.unchanged,
            stats.failed,
            HumanBytes(stats.bytes_copied)
        ));
    }

    fn current_throughput_bps(&self) -> u64 {
        match self.started_at {
            Some(started) => {
                let secs = started.elapsed().as_secs_f64();
                if secs > 0.0 {
                    (self.copied_bytes as f64 / secs) as u64
                } else {
                    0
                }
            }
            None => 0,
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}
