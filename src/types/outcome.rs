//! SyncOutcome - per-entry result of a sync run

use super::ModSyncError;
use std::path::PathBuf;
use thiserror::Error;

/// Result of processing one mapping entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Marker fingerprints matched, nothing was written
    Unchanged,

    /// Source directory was merge-copied onto the destination
    Updated,

    /// Entry could not be synced; the run continued with the next entry
    Failed(FailureReason),
}

impl SyncOutcome {
    pub fn is_unchanged(&self) -> bool {
        matches!(self, SyncOutcome::Unchanged)
    }

    pub fn is_updated(&self) -> bool {
        matches!(self, SyncOutcome::Updated)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, SyncOutcome::Failed(_))
    }

    /// Short label used in progress and summary output
    pub fn label(&self) -> &'static str {
        match self {
            SyncOutcome::Unchanged => "Unchanged",
            SyncOutcome::Updated => "Updated",
            SyncOutcome::Failed(_) => "Failed",
        }
    }

    /// Failure reason, if this entry failed
    pub fn failure(&self) -> Option<&FailureReason> {
        match self {
            SyncOutcome::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}

/// Why an entry failed.
///
/// A cloneable snapshot of the entry-scoped [`ModSyncError`] variants so that
/// outcome lists can be compared, stored and passed to event callbacks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailureReason {
    #[error("source directory missing: {}", path.display())]
    SourceMissing { path: PathBuf },

    #[error("cannot read {}: {message}", path.display())]
    UnreadableFile { path: PathBuf, message: String },

    #[error("copy failed at {}: {message}", path.display())]
    CopyFailed { path: PathBuf, message: String },

    #[error("cancelled before start")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

impl FailureReason {
    /// Path involved in the failure, if any
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            FailureReason::SourceMissing { path }
            | FailureReason::UnreadableFile { path, .. }
            | FailureReason::CopyFailed { path, .. } => Some(path),
            FailureReason::Cancelled | FailureReason::Other(_) => None,
        }
    }
}

impl From<&ModSyncError> for FailureReason {
    fn from(error: &ModSyncError) -> Self {
        match error {
            ModSyncError::SourceMissing { path } => FailureReason::SourceMissing { path: path.clone() },
            ModSyncError::UnreadableFile { path, source } => FailureReason::UnreadableFile {
                path: path.clone(),
                message: source.to_string(),
            },
            ModSyncError::CopyFailed { path, source } => FailureReason::CopyFailed {
                path: path.clone(),
                message: source.to_string(),
            },
            ModSyncError::Cancelled => FailureReason::Cancelled,
            other => FailureReason::Other(other.to_string()),
        }
    }
}

impl From<ModSyncError> for FailureReason {
    fn from(error: ModSyncError) -> Self {
        FailureReason::from(&error)
    }
}
