//! Per-record processing: transform, diff against the destination, write

use std::sync::Arc;

use harvester_domain::{CandidateRecord, HarvestError, Result};
use tracing::debug;

use super::ports::{ObservationDestination, RecordTransform};

/// What happened to a single record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Committed to the destination
    Written,
    /// Destination already holds the same content
    Unchanged,
    /// Would have been written, but the run is a dry run
    Simulated,
}

/// Transforms a candidate and writes it when its content changed
pub struct RecordProcessor {
    transform: Arc<dyn RecordTransform>,
    destination: Arc<dyn ObservationDestination>,
    dry_run: bool,
}

impl RecordProcessor {
    pub fn new(
        transform: Arc<dyn RecordTransform>,
        destination: Arc<dyn ObservationDestination>,
        dry_run: bool,
    ) -> Self {
        Self { transform, destination, dry_run }
    }

    /// Process one candidate
    ///
    /// Transform failures and destination write failures are returned as
    /// record-level errors; an unreachable destination is returned unchanged
    /// so the caller aborts the run.
    pub fn process(&self, record: &CandidateRecord) -> Result<RecordOutcome> {
        let transformed = self.transform.transform(record)?;

        let stored = self.destination.stored_checksum(record.id())?;
        if stored.as_deref() == Some(transformed.checksum.as_str()) {
            let refreshed = !self.dry_run
                && self.destination.refresh_last_modified(record.id(), record.last_modified())?;
            debug!(obs_id = %record.id(), refreshed, "Record unchanged");
            return Ok(RecordOutcome::Unchanged);
        }

        if self.dry_run {
            return Ok(RecordOutcome::Simulated);
        }

        self.destination.put(&transformed).map_err(|e| match e {
            HarvestError::Database(reason) => HarvestError::record(record.id(), reason),
            other => other,
        })?;
        debug!(obs_id = %record.id(), planes = transformed.planes.len(), "Record written");
        Ok(RecordOutcome::Written)
    }
}
