//! Per-entry sync decisions

use super::compare::{compare_markers, MarkerComparison};
use crate::executor::Filesystem;
use crate::paths::{DerivedPathSet, PathDeriver};
use crate::types::{FailureReason, MappingEntry};
use crate::Config;
use std::fmt;
use tracing::debug;

/// Why a folder needs copying
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyReason {
    /// Source and destination markers differ
    MarkerChanged,

    /// Destination has no marker yet
    MarkerMissing,
}

impl fmt::Display for CopyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CopyReason::MarkerChanged => f.write_str("marker changed"),
            CopyReason::MarkerMissing => f.write_str("not on destination"),
        }
    }
}

/// What to do with one entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Markers match, leave the destination alone
    Skip,

    /// Merge-copy the source folder onto the destination
    Copy(CopyReason),

    /// Entry cannot be processed
    Fail(FailureReason),
}

impl Decision {
    pub fn is_skip(&self) -> bool {
        matches!(self, Decision::Skip)
    }

    pub fn is_copy(&self) -> bool {
        matches!(self, Decision::Copy(_))
    }
}

/// Decide what to do for one entry's derived paths
///
/// Reads at most the two marker files; never writes.
pub fn decide(fs: &dyn Filesystem, paths: &DerivedPathSet) -> Decision {
    if !fs.is_dir(&paths.source_dir) {
        return Decision::Fail(FailureReason::SourceMissing {
            path: paths.source_dir.clone(),
        });
    }

    match compare_markers(fs, &paths.source_marker, &paths.dest_marker) {
        Ok(MarkerComparison::Match(fp)) => {
            debug!(marker = %paths.source_marker.display(), fingerprint = %fp, "markers match");
            Decision::Skip
        }
        Ok(MarkerComparison::Differ {
            source,
            destination,
        }) => {
            debug!(
                marker = %paths.source_marker.display(),
                %source,
                %destination,
                "markers differ"
            );
            Decision::Copy(CopyReason::MarkerChanged)
        }
        Ok(MarkerComparison::DestinationMissing) => {
            debug!(marker = %paths.dest_marker.display(), "destination marker missing");
            Decision::Copy(CopyReason::MarkerMissing)
        }
        Err(err) => Decision::Fail(FailureReason::from(&err)),
    }
}

/// One mapping entry with its paths and decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedEntry {
    pub entry: MappingEntry,
    pub paths: DerivedPathSet,
    pub decision: Decision,
}

/// Decisions for every entry, in mapping order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPlan {
    pub entries: Vec<PlannedEntry>,
    pub stats: PlanStats,
}

/// Statistics about a sync plan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanStats {
    pub skip_count: usize,
    pub copy_count: usize,
    pub fail_count: usize,
}

impl SyncPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry and update statistics
    pub fn add(&mut self, planned: PlannedEntry) {
        match &planned.decision {
            Decision::Skip => self.stats.skip_count += 1,
            Decision::Copy(_) => self.stats.copy_count += 1,
            Decision::Fail(_) => self.stats.fail_count += 1,
        }
        self.entries.push(planned);
    }

    /// Check if any entry would be copied
    pub fn has_copies(&self) -> bool {
        self.stats.copy_count > 0
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Generate a sync plan without touching the destination
///
/// # Example
/// ```
/// use modsync::diff::generate_sync_plan;
/// use modsync::executor::LocalFs;
/// use modsync::{Config, MappingEntry};
///
/// let config = Config::new("/nonexistent/src", "/nonexistent/dst");
/// let plan = generate_sync_plan(&[MappingEntry::new("alpha", "alpha")], &config, &LocalFs);
/// assert_eq!(plan.stats.fail_count, 1);
/// ```
pub fn generate_sync_plan(entries: &[MappingEntry], config: &Config, fs: &dyn Filesystem) -> SyncPlan {
    let deriver = PathDeriver::new(config.marker_file.clone());
    let mut plan = SyncPlan::new();

    for entry in entries {
        let paths = deriver.derive(&config.source_root, &config.destination_root, entry);
        let decision = decide(fs, &paths);
        plan.add(PlannedEntry {
            entry: entry.clone(),
            paths,
            decision,
        });
    }

    plan
}
