//! Main sync command

use crate::diff::{Decision, SyncPlan};
use crate::executor::{CancelToken, ExecutionEvent, SyncReport, Syncer};
use crate::mapping::MappingTable;
use crate::types::{FailureReason, Result};
use crate::ui::ProgressReporter;
use crate::Config;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// What a command run produced
#[derive(Debug)]
pub enum RunOutput {
    /// Dry run: decisions only
    Planned(SyncPlan),

    /// Real run: one outcome per entry
    Synced(SyncReport),
}

impl RunOutput {
    /// True when no entry failed
    pub fn is_success(&self) -> bool {
        match self {
            RunOutput::Planned(plan) => plan.stats.fail_count == 0,
            RunOutput::Synced(report) => !report.has_failures(),
        }
    }
}

/// Run the sync operation
///
/// The mapping definition is loaded and validated before any folder is
/// touched; a malformed definition aborts the run.
pub fn run(config: Config, cancel: CancelToken) -> Result<RunOutput> {
    let table = MappingTable::from_path(&config.mapping_file, config.strict)?;
    info!(
        entries = table.len(),
        source = %config.source_root.display(),
        destination = %config.destination_root.display(),
        "starting sync"
    );

    if table.is_empty() {
        println!("Mapping file lists no mods. Nothing to sync.");
    }

    let dry_run = config.dry_run;
    let syncer = Syncer::new(config).with_cancel_token(cancel);

    if dry_run {
        let plan = syncer.plan(table.entries());
        println!("{}", format_plan_preview(&plan));
        println!("{}", format_dry_run_plan(&plan));
        println!("Dry-run mode: no changes were made.");
        return Ok(RunOutput::Planned(plan));
    }

    let reporter = Arc::new(Mutex::new(ProgressReporter::new()));
    if let Ok(mut progress) = reporter.lock() {
        progress.start(table.len() as u64);
    }

    let error_records: Arc<Mutex<Vec<ErrorRecord>>> = Arc::new(Mutex::new(Vec::new()));
    let progress_cb = {
        let reporter = Arc::clone(&reporter);
        let error_records = Arc::clone(&error_records);
        move |event: &ExecutionEvent| match event {
            ExecutionEvent::EntryStart { entry, .. } => {
                if let Ok(progress) = reporter.lock() {
                    progress.set_current(entry);
                }
            }
            ExecutionEvent::EntryFinished { result, .. } => {
                if let Ok(mut progress) = reporter.lock() {
                    progress.entry_finished(result);
                }
                if let Some(reason) = result.outcome.failure() {
                    if let Ok(mut records) = error_records.lock() {
                        records.push(ErrorRecord::new(&result.entry.to_string(), reason));
                    }
                }
            }
            ExecutionEvent::Complete { stats } => {
                if let Ok(progress) = reporter.lock() {
                    progress.finish(stats);
                }
            }
        }
    };

    let report = syncer.with_events(Arc::new(progress_cb)).run(table.entries());

    if let Ok(records) = error_records.lock() {
        if !records.is_empty() {
            println!("{}", format_error_summary(&records));
        }
    }

    Ok(RunOutput::Synced(report))
}

/// Exit status used when a second Ctrl-C forces the process down
pub const FORCE_QUIT_EXIT_CODE: i32 = 130;

/// Cancel `token` when the process receives Ctrl-C.
///
/// Entries already being copied finish; the rest are reported as cancelled.
/// A second Ctrl-C exits immediately with [`FORCE_QUIT_EXIT_CODE`].
pub fn cancel_on_ctrl_c(token: CancelToken) {
    let spawned = std::thread::Builder::new()
        .name("modsync-signal".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(err) => {
                    warn!(error = %err, "cannot listen for Ctrl-C");
                    return;
                }
            };
            runtime.block_on(async {
                while tokio::signal::ctrl_c().await.is_ok() {
                    match on_interrupt(&token) {
                        Interrupt::Cancelled => {
                            eprintln!("Interrupt received, finishing current mod and stopping...");
                            eprintln!("Press Ctrl-C again to quit immediately.");
                        }
                        Interrupt::ForceQuit => {
                            eprintln!("Second interrupt, exiting now.");
                            std::process::exit(FORCE_QUIT_EXIT_CODE);
                        }
                    }
                }
            });
        });

    if let Err(err) = spawned {
        warn!(error = %err, "cannot spawn signal listener");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupt {
    Cancelled,
    ForceQuit,
}

/// First interrupt cancels the run, any later one forces an exit
fn on_interrupt(token: &CancelToken) -> Interrupt {
    if token.is_cancelled() {
        Interrupt::ForceQuit
    } else {
        token.cancel();
        Interrupt::Cancelled
    }
}

fn format_plan_preview(plan: &SyncPlan) -> String {
    format!(
        "Plan:\n  Copy: {}  Unchanged: {}  Failed: {}",
        plan.stats.copy_count, plan.stats.skip_count, plan.stats.fail_count
    )
}

fn format_dry_run_plan(plan: &SyncPlan) -> String {
    if plan.is_empty() {
        return "Dry-run actions:\n  (no mapped mods)".to_string();
    }

    let mut lines = Vec::with_capacity(plan.len() + 1);
    lines.push("Dry-run actions:".to_string());
    let mut skipped = 0usize;
    for planned in &plan.entries {
        match &planned.decision {
            Decision::Copy(reason) => {
                lines.push(format!(
                    "  COPY      {} -> {} ({})",
                    planned.paths.source_dir.display(),
                    planned.paths.dest_dir.display(),
                    reason
                ));
            }
            Decision::Fail(reason) => {
                lines.push(format!("  FAIL      {}: {}", planned.entry, reason));
            }
            Decision::Skip => skipped += 1,
        }
    }

    if skipped > 0 {
        lines.push(format!("  ({skipped} unchanged mod(s) omitted)"));
    }

    lines.join("\n")
}

#[derive(Debug)]
struct ErrorRecord {
    kind: &'static str,
    entry: String,
    path: Option<PathBuf>,
    message: String,
    suggestion: Option<String>,
}

impl ErrorRecord {
    fn new(entry: &str, reason: &FailureReason) -> Self {
        let (message, suggestion) = humanize_failure(reason);
        Self {
            kind: failure_kind_label(reason),
            entry: entry.to_string(),
            path: reason.path().cloned(),
            message,
            suggestion,
        }
    }
}

fn humanize_failure(reason: &FailureReason) -> (String, Option<String>) {
    match reason {
        FailureReason::SourceMissing { .. } => (
            "Source folder was not found".to_string(),
            Some("Check the mapping file and source root; folder names must match exactly.".to_string()),
        ),
        FailureReason::UnreadableFile { message, .. } => (
            format!("Marker file could not be read ({})", message),
            Some(
                "Check permissions on the marker file, or delete a corrupt destination marker to force a copy."
                    .to_string(),
            ),
        ),
        FailureReason::CopyFailed { message, .. } => (
            format!("Copying the folder failed ({})", message),
            Some("Check destination permissions and free disk space, then re-run.".to_string()),
        ),
        FailureReason::Cancelled => (
            "Sync was cancelled before this mod started".to_string(),
            Some("Re-run to sync the remaining mods.".to_string()),
        ),
        FailureReason::Other(msg) => (msg.clone(), None),
    }
}

fn failure_kind_label(reason: &FailureReason) -> &'static str {
    match reason {
        FailureReason::SourceMissing { .. } => "Source missing",
        FailureReason::UnreadableFile { .. } => "Unreadable marker",
        FailureReason::CopyFailed { .. } => "Copy failed",
        FailureReason::Cancelled => "Cancelled",
        FailureReason::Other(_) => "Other",
    }
}

fn format_error_summary(records: &[ErrorRecord]) -> String {
    let mut groups: BTreeMap<&'static str, Vec<&ErrorRecord>> = BTreeMap::new();
    for record in records {
        groups.entry(record.kind).or_default().push(record);
    }

    let mut lines = Vec::new();
    lines.push("Error summary:".to_string());
    for (kind, items) in groups {
        lines.push(format!("  {} ({}):", kind, items.len()));
        for record in items.iter().take(3) {
            lines.push(format!("    - {}: {}", record.entry, record.message));
            if let Some(path) = &record.path {
                lines.push(format!("      Path: {}", path.display()));
            }
            if let Some(suggestion) = &record.suggestion {
                lines.push(format!("      Try: {}", suggestion));
            }
        }
        if items.len() > 3 {
            lines.push(format!("    - ... {} more", items.len() - 3));
        }
    }
    lines.join("\n")
}
