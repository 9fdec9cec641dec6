//! # modsync - Marker-driven mod folder synchronization
//!
//! Copies each mapped mod folder from a source root into a destination root,
//! but only when the folder's marker file (`meta.cpp` by default) differs
//! between the two sides.
//!
//! ```no_run
//! use modsync::{sync, MappingTable, SyncOutcome};
//! use std::path::Path;
//!
//! let table = MappingTable::build("@cba_a3,@cba\n@ace,@ace\n")?;
//! let outcomes = sync(Path::new("/mods"), Path::new("/srv/mods"), table.entries());
//! for (entry, outcome) in table.iter().zip(&outcomes) {
//!     if let SyncOutcome::Failed(reason) = outcome {
//!         eprintln!("{entry}: {reason}");
//!     }
//! }
//! # Ok::<(), modsync::ModSyncError>(())
//! ```

// Module declarations
pub mod commands;
pub mod config;
pub mod diff;
pub mod executor;
pub mod hash;
pub mod logging;
pub mod mapping;
pub mod paths;
pub mod types;
pub mod ui;

// Re-export commonly used types
pub use config::Config;
pub use executor::{sync, CancelToken, SyncReport, Syncer};
pub use hash::Fingerprint;
pub use mapping::MappingTable;
pub use paths::{DerivedPathSet, PathDeriver, MARKER_FILE_NAME};
pub use types::{FailureReason, MappingEntry, ModSyncError, SyncOutcome};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
