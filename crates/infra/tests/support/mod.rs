//! Shared helpers for `harvester-infra` integration tests.
//!
//! An [`Archive`] is a temporary data directory holding a source store and a
//! destination store, both addressed by coordinates the way the binary
//! addresses them.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use harvester_core::{
    CancellationFlag, CheckpointStore, HarvestService, ObservationDestination, ObservationSource,
    RunReport, SkipRegistry,
};
use harvester_domain::constants::{DELETED_OBSERVATION_CLASS, OBSERVATION_CLASS};
use harvester_domain::{
    CheckpointCursor, DataSourceCoords, HarvesterConfig, ObservationRow, PlaneRow, Result,
    RunOptions, SkipEntry, TransformedRecord,
};
use harvester_infra::{
    DbManager, HarvestStores, SqliteHarvestSkipRepository, SqliteHarvestStateRepository,
    SqliteObservationRepository,
};
use tempfile::TempDir;
use uuid::Uuid;

pub const SOURCE: &str = "archive.caom.caom2";
pub const DESTINATION: &str = "mirror.caom.caom2";

pub fn id(n: u128) -> Uuid {
    Uuid::from_u128(n)
}

pub fn at(seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(seconds, 0).unwrap()
}

pub fn cursor(n: u128) -> CheckpointCursor {
    CheckpointCursor::new(at(i64::try_from(n).unwrap()), id(n))
}

/// Observation `n`, modified `n` seconds after the epoch, with `planes` planes
pub fn observation(n: u128, planes: u128) -> TransformedRecord {
    let modified = at(i64::try_from(n).unwrap());
    TransformedRecord {
        observation: ObservationRow {
            obs_id: id(n),
            collection: "TEST".to_string(),
            observation_id: format!("obs-{n}"),
            last_modified: modified,
            meta_checksum: None,
            payload: format!(r#"{{"sequence":{n}}}"#),
        },
        planes: (1..=planes)
            .map(|p| PlaneRow {
                plane_id: id(n * 1000 + p),
                obs_id: id(n),
                product_id: format!("product-{n}-{p}"),
                last_modified: modified,
                payload: format!(r#"{{"plane":{p}}}"#),
            })
            .collect(),
        checksum: format!("source-{n}"),
    }
}

/// Temporary data directory with a populated source store
pub struct Archive {
    _dir: TempDir,
    pub config: HarvesterConfig,
    pub source_coords: DataSourceCoords,
    pub destination_coords: DataSourceCoords,
    source_db: Arc<DbManager>,
}

impl Archive {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("temp dir created");
        let config =
            HarvesterConfig { data_dir: dir.path().to_path_buf(), ..HarvesterConfig::default() };
        let source_coords: DataSourceCoords = SOURCE.parse().unwrap();
        let destination_coords: DataSourceCoords = DESTINATION.parse().unwrap();

        let source_db = DbManager::open_or_create(&source_coords, &config).unwrap();
        source_db.run_migrations().unwrap();

        Self {
            _dir: dir,
            config,
            source_coords,
            destination_coords,
            source_db: Arc::new(source_db),
        }
    }

    pub fn data_dir(&self) -> PathBuf {
        self.config.data_dir.clone()
    }

    /// Source store, written directly to stage test data
    pub fn source(&self) -> SqliteObservationRepository {
        SqliteObservationRepository::new(Arc::clone(&self.source_db))
    }

    pub fn publish(&self, n: u128, planes: u128) {
        self.source().put(&observation(n, planes)).unwrap();
    }

    pub fn publish_record(&self, record: &TransformedRecord) {
        self.source().put(record).unwrap();
    }

    /// Delete observation `n` at the source, recording it in the deletion feed
    pub fn retract(&self, n: u128, seconds: i64) {
        assert!(self.source().delete(id(n), at(seconds)).unwrap());
    }

    pub fn stores(&self, dry_run: bool) -> HarvestStores {
        HarvestStores::open(&self.source_coords, &self.destination_coords, &self.config, dry_run)
            .unwrap()
    }

    /// Whether the destination database file has been created
    pub fn destination_exists(&self) -> bool {
        self.config.database_path(&self.destination_coords).is_file()
    }

    pub fn run(&self, options: RunOptions) -> Result<RunReport> {
        let stores = self.stores(options.dry_run);
        HarvestService::new(stores.source_key(), stores.ports(), options, CancellationFlag::new())
            .run()
    }

    pub fn run_recompute(&self, options: RunOptions) -> Result<RunReport> {
        let stores =
            HarvestStores::open_destination(&self.destination_coords, &self.config, options.dry_run)
                .unwrap();
        HarvestService::new(stores.source_key(), stores.ports(), options, CancellationFlag::new())
            .run()
    }

    fn destination_db(&self) -> Arc<DbManager> {
        Arc::new(DbManager::open(&self.destination_coords, &self.config).unwrap())
    }

    pub fn destination(&self) -> SqliteObservationRepository {
        SqliteObservationRepository::new(self.destination_db())
    }

    pub fn destination_ids(&self) -> Vec<Uuid> {
        self.destination()
            .fetch_observations(None, 10_000, None)
            .unwrap()
            .into_iter()
            .map(|o| o.obs_id)
            .collect()
    }

    pub fn destination_plane_count(&self, n: u128) -> usize {
        self.destination().fetch_planes(&[id(n)], None).unwrap().len()
    }

    pub fn observation_checkpoint(&self) -> Option<CheckpointCursor> {
        SqliteHarvestStateRepository::new(self.destination_db())
            .get(SOURCE, OBSERVATION_CLASS)
            .unwrap()
    }

    pub fn deletion_checkpoint(&self) -> Option<CheckpointCursor> {
        SqliteHarvestStateRepository::new(self.destination_db())
            .get(SOURCE, DELETED_OBSERVATION_CLASS)
            .unwrap()
    }

    pub fn skip_entries(&self) -> Vec<SkipEntry> {
        SqliteHarvestSkipRepository::new(self.destination_db())
            .list(SOURCE, OBSERVATION_CLASS, None, 1000)
            .unwrap()
    }
}
