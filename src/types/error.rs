//! Error types for modsync

use std::io::ErrorKind;
use std::path::PathBuf;
use thiserror::Error;

/// Error types for modsync operations
#[derive(Debug, Error)]
pub enum ModSyncError {
    /// Standard IO error (automatically converted via #[from])
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Mapping definition line that is not `source,destination`
    #[error("Malformed mapping definition at line {line}: {content:?}")]
    MalformedDefinition { line: usize, content: String },

    /// Source name listed twice while duplicates are rejected
    #[error("Duplicate source name at line {line}: {name}")]
    DuplicateSource { line: usize, name: String },

    /// Marker (or definition) file missing or unreadable
    #[error("Cannot read {}: {source}", path.display())]
    UnreadableFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Source directory for an entry does not exist
    #[error("Source directory missing: {}", path.display())]
    SourceMissing { path: PathBuf },

    /// Underlying copy primitive failed
    #[error("Copy failed at {}: {source}", path.display())]
    CopyFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Run was cancelled before this entry started
    #[error("Sync cancelled")]
    Cancelled,

    /// Worker pool failure
    #[error("Worker error: {0}")]
    Worker(String),
}

impl ModSyncError {
    /// Check if this error aborts the whole run (raised before any entry I/O)
    pub fn is_run_fatal(&self) -> bool {
        matches!(
            self,
            ModSyncError::Config(_)
                | ModSyncError::MalformedDefinition { .. }
                | ModSyncError::DuplicateSource { .. }
        )
    }

    /// Check if this error only affects a single mapping entry
    pub fn is_entry_scoped(&self) -> bool {
        matches!(
            self,
            ModSyncError::UnreadableFile { .. }
                | ModSyncError::SourceMissing { .. }
                | ModSyncError::CopyFailed { .. }
                | ModSyncError::Cancelled
        )
    }

    /// Check if this error is related to permissions
    pub fn is_permission_error(&self) -> bool {
        self.io_kind() == Some(ErrorKind::PermissionDenied)
    }

    /// Check if this error is related to disk space
    pub fn is_disk_space_error(&self) -> bool {
        match self.io_source() {
            Some(e) => {
                e.kind() == ErrorKind::StorageFull || matches!(e.raw_os_error(), Some(28 | 112))
            }
            None => false,
        }
    }

    /// Kind of the wrapped IO error, if any
    pub fn io_kind(&self) -> Option<ErrorKind> {
        self.io_source().map(|e| e.kind())
    }

    fn io_source(&self) -> Option<&std::io::Error> {
        match self {
            ModSyncError::Io(e)
            | ModSyncError::UnreadableFile { source: e, .. }
            | ModSyncError::CopyFailed { source: e, .. } => Some(e),
            _ => None,
        }
    }
}

/// Result alias used throughout the crate
pub type Result<T, E = ModSyncError> = std::result::Result<T, E>;
