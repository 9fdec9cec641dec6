//! Change detection - marker comparison and per-entry decisions

mod compare;
mod plan;

pub use compare::{compare_markers, MarkerComparison};
pub use plan::{decide, generate_sync_plan, CopyReason, Decision, PlanStats, PlannedEntry, SyncPlan};
