//! Opening the stores of one harvest run
//!
//! The source store is opened as it is: it must already exist and is only
//! read. The destination store is created and migrated on demand, and holds
//! the checkpoint and skip tables next to the harvested observations.
//!
//! A dry run never creates or migrates anything. An existing destination is
//! opened as it is; a missing one is read as an empty store.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use harvester_core::{
    CheckpointStore, ChecksumTransform, HarvestPorts, ObservationDestination, ObservationSource,
    SkipRegistry,
};
use harvester_domain::{
    CheckpointCursor, DataSourceCoords, DeletionRecord, HarvestError, HarvesterConfig,
    ObservationRow, PlaneRow, Result, SkipEntry, TransformedRecord,
};
use tracing::info;
use uuid::Uuid;

use crate::database::{
    DbManager, SqliteHarvestSkipRepository, SqliteHarvestStateRepository,
    SqliteObservationRepository,
};

/// Source and destination stores of one run
pub struct HarvestStores {
    source_key: String,
    source: Option<Arc<DbManager>>,
    /// `None` when a dry run targets a destination that does not exist yet
    destination: Option<Arc<DbManager>>,
    destination_coords: DataSourceCoords,
}

impl HarvestStores {
    /// Open `source` for reading and `destination` for writing
    ///
    /// # Errors
    /// Returns `StoreUnavailable` if the source does not exist or either
    /// store cannot be attached, `Database` if the destination schema
    /// cannot be created.
    pub fn open(
        source: &DataSourceCoords,
        destination: &DataSourceCoords,
        config: &HarvesterConfig,
        dry_run: bool,
    ) -> Result<Self> {
        let source_db = Arc::new(DbManager::open(source, config)?);
        let destination_db = Self::open_destination_db(destination, config, dry_run)?;
        info!(%source, %destination, dry_run, "Harvest stores opened");

        Ok(Self {
            source_key: source.to_string(),
            source: Some(source_db),
            destination: destination_db,
            destination_coords: destination.clone(),
        })
    }

    /// Open only `destination`, which then also serves as the source
    ///
    /// Used by the checksum recompute, which never reads another store.
    pub fn open_destination(
        destination: &DataSourceCoords,
        config: &HarvesterConfig,
        dry_run: bool,
    ) -> Result<Self> {
        let destination_db = Self::open_destination_db(destination, config, dry_run)?;
        info!(%destination, dry_run, "Destination store opened");

        Ok(Self {
            source_key: destination.to_string(),
            source: destination_db.clone(),
            destination: destination_db,
            destination_coords: destination.clone(),
        })
    }

    fn open_destination_db(
        destination: &DataSourceCoords,
        config: &HarvesterConfig,
        dry_run: bool,
    ) -> Result<Option<Arc<DbManager>>> {
        if dry_run {
            if !config.database_path(destination).is_file() {
                info!(%destination, "Destination does not exist, dry run reads it as empty");
                return Ok(None);
            }
            return Ok(Some(Arc::new(DbManager::open(destination, config)?)));
        }

        let db = DbManager::open_or_create(destination, config)?;
        db.run_migrations()?;
        Ok(Some(Arc::new(db)))
    }

    /// Key under which checkpoints and skip entries of this run are stored
    pub fn source_key(&self) -> &str {
        &self.source_key
    }

    /// Whether the destination store exists on disk
    pub fn has_destination(&self) -> bool {
        self.destination.is_some()
    }

    /// Ports of the harvest engine backed by these stores
    pub fn ports(&self) -> HarvestPorts {
        let empty = || Arc::new(EmptyDestination { coords: self.destination_coords.clone() });

        let source: Arc<dyn ObservationSource> = match &self.source {
            Some(db) => Arc::new(SqliteObservationRepository::new(Arc::clone(db))),
            None => empty(),
        };

        match &self.destination {
            Some(db) => HarvestPorts {
                source,
                destination: Arc::new(SqliteObservationRepository::new(Arc::clone(db))),
                checkpoints: Arc::new(SqliteHarvestStateRepository::new(Arc::clone(db))),
                skips: Arc::new(SqliteHarvestSkipRepository::new(Arc::clone(db))),
                transform: Arc::new(ChecksumTransform::new()),
            },
            None => HarvestPorts {
                source,
                destination: empty(),
                checkpoints: empty(),
                skips: empty(),
                transform: Arc::new(ChecksumTransform::new()),
            },
        }
    }

    /// Log connection pool usage of both stores
    pub fn log_metrics(&self) {
        match (&self.source, &self.destination) {
            (Some(source), Some(destination)) if Arc::ptr_eq(source, destination) => {
                destination.log_metrics();
            }
            (source, destination) => {
                source.iter().chain(destination.iter()).for_each(|db| db.log_metrics());
            }
        }
    }
}

/// Destination that has not been created yet, seen by a dry run
///
/// Every read finds nothing. Writes are refused: a dry run never issues
/// them, so reaching one is an engine bug.
struct EmptyDestination {
    coords: DataSourceCoords,
}

impl EmptyDestination {
    fn refuse<T>(&self, operation: &str) -> Result<T> {
        Err(HarvestError::Internal(format!(
            "{operation} on {}, which a dry run does not create",
            self.coords
        )))
    }
}

impl ObservationSource for EmptyDestination {
    fn fetch_observations(
        &self,
        _after: Option<&CheckpointCursor>,
        _limit: usize,
        _max_date: Option<DateTime<Utc>>,
    ) -> Result<Vec<ObservationRow>> {
        Ok(Vec::new())
    }

    fn fetch_planes(&self, _obs_ids: &[Uuid], _limit: Option<usize>) -> Result<Vec<PlaneRow>> {
        Ok(Vec::new())
    }

    fn get_observation(&self, _id: Uuid) -> Result<Option<ObservationRow>> {
        Ok(None)
    }

    fn fetch_deletions(
        &self,
        _after: Option<&CheckpointCursor>,
        _limit: usize,
        _max_date: Option<DateTime<Utc>>,
    ) -> Result<Vec<DeletionRecord>> {
        Ok(Vec::new())
    }

    fn latest_deletion(&self, _max_date: Option<DateTime<Utc>>) -> Result<Option<DeletionRecord>> {
        Ok(None)
    }
}

impl ObservationDestination for EmptyDestination {
    fn stored_checksum(&self, _id: Uuid) -> Result<Option<String>> {
        Ok(None)
    }

    fn stored_last_modified(&self, _id: Uuid) -> Result<Option<DateTime<Utc>>> {
        Ok(None)
    }

    fn put(&self, _record: &TransformedRecord) -> Result<()> {
        self.refuse("observation write")
    }

    fn delete(&self, _id: Uuid, _deleted_at: DateTime<Utc>) -> Result<bool> {
        self.refuse("observation delete")
    }

    fn update_checksum(&self, _id: Uuid, _checksum: &str) -> Result<()> {
        self.refuse("checksum update")
    }

    fn refresh_last_modified(&self, _id: Uuid, _last_modified: DateTime<Utc>) -> Result<bool> {
        self.refuse("modification time refresh")
    }
}

impl CheckpointStore for EmptyDestination {
    fn get(&self, _source: &str, _entity_class: &str) -> Result<Option<CheckpointCursor>> {
        Ok(None)
    }

    fn advance(&self, _source: &str, _entity_class: &str, _cursor: CheckpointCursor) -> Result<()> {
        self.refuse("checkpoint advance")
    }

    fn reset(&self, _source: &str, _entity_class: &str) -> Result<()> {
        self.refuse("checkpoint reset")
    }
}

impl SkipRegistry for EmptyDestination {
    fn get(&self, _source: &str, _entity_class: &str, _skip_id: Uuid) -> Result<Option<SkipEntry>> {
        Ok(None)
    }

    fn list(
        &self,
        _source: &str,
        _entity_class: &str,
        _since: Option<DateTime<Utc>>,
        _limit: usize,
    ) -> Result<Vec<SkipEntry>> {
        Ok(Vec::new())
    }

    fn put(&self, _entry: &SkipEntry) -> Result<SkipEntry> {
        self.refuse("skip entry write")
    }

    fn delete(&self, _entry: &SkipEntry) -> Result<()> {
        self.refuse("skip entry delete")
    }
}
