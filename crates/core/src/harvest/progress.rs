//! Run progress, reports and cancellation

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use harvester_domain::HarvestMode;
use serde::Serialize;

/// Counters of one observation pass (harvest, retry or recompute)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HarvestProgress {
    /// Batches fetched
    pub batches: usize,
    /// Candidate records considered
    pub found: usize,
    /// Records written to the destination (or that would be, in a dry run)
    pub written: usize,
    /// Records whose checksum matched the destination copy
    pub unchanged: usize,
    /// Records that failed and were quarantined
    pub failed: usize,
    /// Skip entries cleared after a success or a source-side removal
    pub resolved: usize,
}

impl HarvestProgress {
    /// Whether every considered record was handled without a failure
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Counters of the deletion pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeletionProgress {
    /// Deletions read from the feed
    pub found: usize,
    /// Destination observations removed
    pub deleted: usize,
    /// Deletions ignored because the destination copy was absent or newer
    pub retained: usize,
}

/// Outcome of a single pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport<P> {
    pub progress: P,
    pub interrupted: bool,
}

/// Outcome of a complete run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub mode: HarvestMode,
    pub dry_run: bool,
    pub deletions: DeletionProgress,
    pub observations: HarvestProgress,
    /// The run stopped early on a termination request
    pub interrupted: bool,
}

impl RunReport {
    pub fn new(mode: HarvestMode, dry_run: bool) -> Self {
        Self {
            mode,
            dry_run,
            deletions: DeletionProgress::default(),
            observations: HarvestProgress::default(),
            interrupted: false,
        }
    }
}

/// Shared flag set when the process is asked to stop
///
/// Checked between records; the record in flight always completes.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request the run to stop at the next record boundary
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
