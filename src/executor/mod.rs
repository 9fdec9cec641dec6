//! Sync execution - decide per entry, then merge-copy what changed

pub mod copy;
pub mod fs;
pub mod pool;

use crate::diff::{decide, generate_sync_plan, CopyReason, Decision, SyncPlan};
use crate::paths::PathDeriver;
use crate::types::{FailureReason, MappingEntry, SyncOutcome};
use crate::Config;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub use copy::{copy_file_atomic, copy_tree, CopyStats};
pub use fs::{Filesystem, LocalFs};
pub use pool::{EntryJob, ParallelExecutor, PoolStats};

/// Shared cancellation flag, checked before each entry starts
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; entries already running finish normally
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Result of processing one entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryResult {
    pub entry: MappingEntry,
    pub outcome: SyncOutcome,

    /// Why a copy was attempted, when one was
    pub copy_reason: Option<CopyReason>,

    /// Counters of the copy, zero when nothing was copied
    pub copied: CopyStats,
}

impl EntryResult {
    pub fn new(entry: MappingEntry, outcome: SyncOutcome) -> Self {
        Self {
            entry,
            outcome,
            copy_reason: None,
            copied: CopyStats::default(),
        }
    }

    pub fn failed(entry: MappingEntry, reason: FailureReason) -> Self {
        Self::new(entry, SyncOutcome::Failed(reason))
    }
}

/// Aggregate counters for a sync run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionStats {
    pub total_entries: usize,
    pub unchanged: usize,
    pub updated: usize,
    pub failed: usize,
    pub files_copied: u64,
    pub bytes_copied: u64,
}

impl ExecutionStats {
    fn record(&mut self, result: &EntryResult) {
        match result.outcome {
            SyncOutcome::Unchanged => self.unchanged += 1,
            SyncOutcome::Updated => self.updated += 1,
            SyncOutcome::Failed(_) => self.failed += 1,
        }
        self.files_copied += result.copied.files_copied;
        self.bytes_copied += result.copied.bytes_copied;
    }
}

/// Per-entry results of a run, in mapping order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub results: Vec<EntryResult>,
    pub stats: ExecutionStats,
}

impl SyncReport {
    fn from_results(results: Vec<EntryResult>) -> Self {
        let mut stats = ExecutionStats {
            total_entries: results.len(),
            ..Default::default()
        };
        for result in &results {
            stats.record(result);
        }
        Self { results, stats }
    }

    /// Outcomes only, index-aligned with the input entries
    pub fn outcomes(&self) -> Vec<SyncOutcome> {
        self.results.iter().map(|r| r.outcome.clone()).collect()
    }

    /// Results whose outcome is `Failed`
    pub fn failures(&self) -> impl Iterator<Item = &EntryResult> {
        self.results.iter().filter(|r| r.outcome.is_failed())
    }

    pub fn has_failures(&self) -> bool {
        self.stats.failed > 0
    }
}

/// Events emitted while syncing.
#[derive(Debug)]
pub enum ExecutionEvent {
    /// Entry processing started.
    EntryStart {
        index: usize,
        total: usize,
        entry: MappingEntry,
    },
    /// Entry processing finished, whatever the outcome.
    EntryFinished {
        index: usize,
        total: usize,
        result: EntryResult,
    },
    /// Every entry has an outcome.
    Complete { stats: ExecutionStats },
}

/// Optional callback used to receive execution events.
pub type ExecutionCallback = dyn Fn(&ExecutionEvent) + Send + Sync;

/// Sync engine for one source/destination pair
pub struct Syncer {
    config: Config,
    fs: Arc<dyn Filesystem>,
    cancel: CancelToken,
    on_event: Option<Arc<ExecutionCallback>>,
}

impl Syncer {
    /// Engine over the local filesystem
    pub fn new(config: Config) -> Self {
        Self {
            config,
            fs: Arc::new(LocalFs),
            cancel: CancelToken::new(),
            on_event: None,
        }
    }

    /// Use a different filesystem implementation
    pub fn with_filesystem(mut self, fs: Arc<dyn Filesystem>) -> Self {
        self.fs = fs;
        self
    }

    /// Share a cancellation token with the caller
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Receive execution events
    pub fn with_events(mut self, callback: Arc<ExecutionCallback>) -> Self {
        self.on_event = Some(callback);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Decide every entry without copying anything
    pub fn plan(&self, entries: &[MappingEntry]) -> SyncPlan {
        generate_sync_plan(entries, &self.config, self.fs.as_ref())
    }

    /// Sync every entry and report one result per entry, in input order.
    ///
    /// Filesystem errors never abort the run; they become `Failed` outcomes.
    pub fn run(&self, entries: &[MappingEntry]) -> SyncReport {
        let runner = Arc::new(EntryRunner {
            fs: Arc::clone(&self.fs),
            deriver: PathDeriver::new(self.config.marker_file.clone()),
            source_root: self.config.source_root.clone(),
            dest_root: self.config.destination_root.clone(),
            cancel: self.cancel.clone(),
            on_event: self.on_event.clone(),
            total: entries.len(),
        });

        let results = if self.config.threads > 1 && entries.len() > 1 {
            match run_parallel(&runner, entries, self.config.threads) {
                Ok(results) => results,
                Err(err) => {
                    warn!(error = %err, "worker pool unavailable, syncing sequentially");
                    run_sequential(&runner, entries)
                }
            }
        } else {
            run_sequential(&runner, entries)
        };

        let report = SyncReport::from_results(results);
        info!(
            total = report.stats.total_entries,
            unchanged = report.stats.unchanged,
            updated = report.stats.updated,
            failed = report.stats.failed,
            "sync complete"
        );
        runner.emit(ExecutionEvent::Complete {
            stats: report.stats,
        });
        report
    }
}

/// Sync `entries` from `source_root` to `destination_root` using the local
/// filesystem and the default marker file.
///
/// # Example
/// ```no_run
/// use modsync::{sync, MappingEntry, SyncOutcome};
/// use std::path::Path;
///
/// let outcomes = sync(
///     Path::new("C:\\mods"),
///     Path::new("D:\\srv\\mods"),
///     &[MappingEntry::new("@cba_a3", "@cba")],
/// );
/// assert_eq!(outcomes.len(), 1);
/// ```
pub fn sync(source_root: &Path, destination_root: &Path, entries: &[MappingEntry]) -> Vec<SyncOutcome> {
    Syncer::new(Config::new(source_root, destination_root))
        .run(entries)
        .outcomes()
}

fn run_sequential(runner: &EntryRunner, entries: &[MappingEntry]) -> Vec<EntryResult> {
    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| runner.process(index, entry))
        .collect()
}

fn run_parallel(
    runner: &Arc<EntryRunner>,
    entries: &[MappingEntry],
    threads: usize,
) -> crate::types::Result<Vec<EntryResult>> {
    let handler: pool::JobHandler = {
        let runner = Arc::clone(runner);
        Arc::new(move |job: &EntryJob| runner.process(job.index, &job.entry))
    };

    let workers = threads.min(entries.len());
    let pool = ParallelExecutor::new(workers, workers * 2, handler)?;
    for (index, entry) in entries.iter().enumerate() {
        pool.enqueue(EntryJob {
            index,
            entry: entry.clone(),
        })?;
    }

    let (results, stats) = pool.close_and_wait()?;
    debug!(
        workers = stats.workers,
        completed = stats.completed,
        "worker pool drained"
    );
    Ok(results)
}

/// Everything needed to process one entry, shareable across workers
struct EntryRunner {
    fs: Arc<dyn Filesystem>,
    deriver: PathDeriver,
    source_root: PathBuf,
    dest_root: PathBuf,
    cancel: CancelToken,
    on_event: Option<Arc<ExecutionCallback>>,
    total: usize,
}

impl EntryRunner {
    fn process(&self, index: usize, entry: &MappingEntry) -> EntryResult {
        if self.cancel.is_cancelled() {
            debug!(entry = %entry, "skipping entry after cancellation");
            let result = EntryResult::failed(entry.clone(), FailureReason::Cancelled);
            self.finish(index, &result);
            return result;
        }

        self.emit(ExecutionEvent::EntryStart {
            index,
            total: self.total,
            entry: entry.clone(),
        });

        let result = self.sync_entry(entry);
        self.finish(index, &result);
        result
    }

    fn sync_entry(&self, entry: &MappingEntry) -> EntryResult {
        let paths = self.deriver.derive(&self.source_root, &self.dest_root, entry);

        match decide(self.fs.as_ref(), &paths) {
            Decision::Skip => {
                debug!(entry = %entry, "unchanged");
                EntryResult::new(entry.clone(), SyncOutcome::Unchanged)
            }
            Decision::Fail(reason) => {
                warn!(entry = %entry, %reason, "entry failed");
                EntryResult::failed(entry.clone(), reason)
            }
            Decision::Copy(copy_reason) => {
                info!(
                    entry = %entry,
                    reason = %copy_reason,
                    src = %paths.source_dir.display(),
                    dest = %paths.dest_dir.display(),
                    "copying"
                );

                let mut result = match self.fs.copy_tree(
                    &paths.source_dir,
                    &paths.dest_dir,
                    Some(self.deriver.marker()),
                ) {
                    Ok(stats) => EntryResult {
                        copied: stats,
                        ..EntryResult::new(entry.clone(), SyncOutcome::Updated)
                    },
                    Err(err) => {
                        warn!(
                            entry = %entry,
                            error = %err,
                            permission_denied = err.is_permission_error(),
                            disk_full = err.is_disk_space_error(),
                            "copy failed"
                        );
                        EntryResult::failed(entry.clone(), FailureReason::from(&err))
                    }
                };
                result.copy_reason = Some(copy_reason);
                result
            }
        }
    }

    fn finish(&self, index: usize, result: &EntryResult) {
        self.emit(ExecutionEvent::EntryFinished {
            index,
            total: self.total,
            result: result.clone(),
        });
    }

    fn emit(&self, event: ExecutionEvent) {
        if let Some(callback) = &self.on_event {
            callback(&event);
        }
    }
}
