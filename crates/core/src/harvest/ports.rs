//! Port interfaces for the harvest engine
//!
//! The engine is synchronous: a run is a single sequential thread of control,
//! so the ports are plain blocking traits. Infrastructure provides SQLite
//! implementations; tests provide in-memory ones.

use chrono::{DateTime, Utc};
use harvester_domain::{
    CandidateRecord, CheckpointCursor, DeletionRecord, ObservationRow, PlaneRow, Result, SkipEntry,
    TransformedRecord,
};
use uuid::Uuid;

/// Persistent cursor per (source, entity class) pair
pub trait CheckpointStore: Send + Sync {
    /// Get the cursor, if one was ever recorded
    fn get(&self, source: &str, entity_class: &str) -> Result<Option<CheckpointCursor>>;

    /// Move the cursor forward to `cursor`
    ///
    /// Fails with `OrderingViolation` when `cursor` is lower than the stored
    /// cursor. Advancing to an equal cursor succeeds without a write.
    fn advance(&self, source: &str, entity_class: &str, cursor: CheckpointCursor) -> Result<()>;

    /// Remove the cursor so the next harvest starts from the epoch
    fn reset(&self, source: &str, entity_class: &str) -> Result<()>;
}

/// Persistent quarantine of records that failed to harvest
pub trait SkipRegistry: Send + Sync {
    /// Look up the entry for one failing record
    fn get(&self, source: &str, entity_class: &str, skip_id: Uuid) -> Result<Option<SkipEntry>>;

    /// List entries in ascending write order, starting at `since` (inclusive)
    fn list(
        &self,
        source: &str,
        entity_class: &str,
        since: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<SkipEntry>>;

    /// Insert the entry (no id yet) or update the row with its id
    ///
    /// Stamps `last_modified` with the write time and returns the stored entry.
    fn put(&self, entry: &SkipEntry) -> Result<SkipEntry>;

    /// Delete the entry by its surrogate id
    ///
    /// Fails with `InvalidArgument` when the entry was never stored.
    fn delete(&self, entry: &SkipEntry) -> Result<()>;
}

/// Read access to a store holding observations, planes and a deletion feed
pub trait ObservationSource: Send + Sync {
    /// Observations strictly after `after`, ascending by `(last_modified, id)`
    fn fetch_observations(
        &self,
        after: Option<&CheckpointCursor>,
        limit: usize,
        max_date: Option<DateTime<Utc>>,
    ) -> Result<Vec<ObservationRow>>;

    /// Planes of the given observations, ordered by observation then plane id
    ///
    /// `limit` bounds the total number of rows returned; `None` reads all.
    fn fetch_planes(&self, obs_ids: &[Uuid], limit: Option<usize>) -> Result<Vec<PlaneRow>>;

    /// A single observation by id
    fn get_observation(&self, id: Uuid) -> Result<Option<ObservationRow>>;

    /// Deletions strictly after `after`, ascending by `(last_modified, id)`
    fn fetch_deletions(
        &self,
        after: Option<&CheckpointCursor>,
        limit: usize,
        max_date: Option<DateTime<Utc>>,
    ) -> Result<Vec<DeletionRecord>>;

    /// The most recent deletion at or before `max_date`
    fn latest_deletion(&self, max_date: Option<DateTime<Utc>>) -> Result<Option<DeletionRecord>>;
}

/// Write access to the destination store
pub trait ObservationDestination: Send + Sync {
    /// Checksum of the stored copy of an observation
    fn stored_checksum(&self, id: Uuid) -> Result<Option<String>>;

    /// Modification time of the stored copy of an observation
    fn stored_last_modified(&self, id: Uuid) -> Result<Option<DateTime<Utc>>>;

    /// Replace the observation and all of its planes in one transaction
    fn put(&self, record: &TransformedRecord) -> Result<()>;

    /// Delete an observation and its planes unless the stored copy was
    /// modified after `deleted_at`
    ///
    /// Returns whether a row was deleted.
    fn delete(&self, id: Uuid, deleted_at: DateTime<Utc>) -> Result<bool>;

    /// Overwrite the stored checksum of an observation
    fn update_checksum(&self, id: Uuid, checksum: &str) -> Result<()>;

    /// Move the stored modification time of an observation forward to
    /// `last_modified`, leaving newer or equal copies alone
    ///
    /// Returns whether a row changed.
    fn refresh_last_modified(&self, id: Uuid, last_modified: DateTime<Utc>) -> Result<bool>;
}

/// Per-record transformation applied between source and destination
pub trait RecordTransform: Send + Sync {
    /// Transform a candidate and compute its checksum
    ///
    /// Failures concerning only this record are reported as
    /// `HarvestError::Record`.
    fn transform(&self, record: &CandidateRecord) -> Result<TransformedRecord>;
}
