//! Core type definitions for modsync

mod error;
mod mapping;
mod outcome;

pub use error::{ModSyncError, Result};
pub use mapping::MappingEntry;
pub use outcome::{FailureReason, SyncOutcome};
