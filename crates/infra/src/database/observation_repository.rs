//! Observation, plane and deletion-feed access
//!
//! The same repository serves as harvest source and harvest destination:
//! sources are read with keyset scans over `(lastModified, id)`, destinations
//! are written one observation (with all of its planes) per transaction.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use harvester_core::{ObservationDestination, ObservationSource};
use harvester_domain::{
    CheckpointCursor, DeletionRecord, ObservationRow, PlaneRow, Result as DomainResult,
    TransformedRecord,
};
use rusqlite::{params, Row, ToSql, TransactionBehavior};
use tracing::debug;
use uuid::Uuid;

use super::columns::{
    cursor_params, limit_param, max_date_param, millis, optional_row, qualify, read_timestamp,
    read_uuid, usize_to_i64, uuid_text,
};
use super::manager::DbManager;
use crate::errors::{map_sql_error, map_storage_error};

const OBSERVATION_COLUMNS: &str =
    "obsID, collection, observationID, lastModified, metaChecksum, payload";
const PLANE_COLUMNS: &str = "planeID, obsID, productID, lastModified, payload";
const DELETION_COLUMNS: &str = "id, lastModified";

/// Bound on the number of ids bound into one `IN (...)` list
const PLANE_QUERY_CHUNK: usize = 500;

/// SQLite-backed observation store
pub struct SqliteObservationRepository {
    db: Arc<DbManager>,
}

impl SqliteObservationRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    fn sql(&self, template: &str) -> String {
        qualify(template, self.db.schema())
    }

    fn fetch_plane_chunk(
        &self,
        obs_ids: &[Uuid],
        limit: Option<usize>,
    ) -> DomainResult<Vec<PlaneRow>> {
        let placeholders =
            (1..=obs_ids.len()).map(|n| format!("?{n}")).collect::<Vec<_>>().join(", ");
        let sql = self.sql(&format!(
            "SELECT {PLANE_COLUMNS} FROM {{schema}}.Plane WHERE obsID IN ({placeholders}) \
             ORDER BY obsID, planeID LIMIT ?{}",
            obs_ids.len() + 1
        ));

        let ids: Vec<String> = obs_ids.iter().copied().map(uuid_text).collect();
        let limit = limit_param(limit);
        let mut bound: Vec<&dyn ToSql> = ids.iter().map(|id| id as &dyn ToSql).collect();
        bound.push(&limit);

        let conn = self.db.get_connection()?;
        let mut stmt = conn.prepare(&sql).map_err(map_storage_error)?;
        stmt.query_map(&bound, map_plane_row).map_err(map_storage_error)
    }
}

impl ObservationSource for SqliteObservationRepository {
    fn fetch_observations(
        &self,
        after: Option<&CheckpointCursor>,
        limit: usize,
        max_date: Option<DateTime<Utc>>,
    ) -> DomainResult<Vec<ObservationRow>> {
        let (after_millis, after_id) = cursor_params(after.map(|c| (c.last_modified, c.last_id)));
        let conn = self.db.get_connection()?;
        let mut stmt = conn
            .prepare(&self.sql(&format!(
                "SELECT {OBSERVATION_COLUMNS} FROM {{schema}}.Observation \
                 WHERE (lastModified > ?1 OR (lastModified = ?1 AND obsID > ?2)) \
                   AND lastModified <= ?3 \
                 ORDER BY lastModified, obsID LIMIT ?4"
            )))
            .map_err(map_storage_error)?;

        stmt.query_map(
            &[&after_millis, &after_id, &max_date_param(max_date), &usize_to_i64(limit)],
            map_observation_row,
        )
        .map_err(map_storage_error)
    }

    fn fetch_planes(&self, obs_ids: &[Uuid], limit: Option<usize>) -> DomainResult<Vec<PlaneRow>> {
        let mut sorted = obs_ids.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        let mut planes = Vec::new();
        for chunk in sorted.chunks(PLANE_QUERY_CHUNK) {
            let remaining = limit.map(|limit| limit.saturating_sub(planes.len()));
            if remaining == Some(0) {
                break;
            }
            planes.extend(self.fetch_plane_chunk(chunk, remaining)?);
        }
        Ok(planes)
    }

    fn get_observation(&self, id: Uuid) -> DomainResult<Option<ObservationRow>> {
        let conn = self.db.get_connection()?;
        optional_row(conn.query_row(
            &self.sql(&format!(
                "SELECT {OBSERVATION_COLUMNS} FROM {{schema}}.Observation WHERE obsID = ?1"
            )),
            &[&uuid_text(id)],
            map_observation_row,
        ))
    }

    fn fetch_deletions(
        &self,
        after: Option<&CheckpointCursor>,
        limit: usize,
        max_date: Option<DateTime<Utc>>,
    ) -> DomainResult<Vec<DeletionRecord>> {
        let (after_millis, after_id) = cursor_params(after.map(|c| (c.last_modified, c.last_id)));
        let conn = self.db.get_connection()?;
        let mut stmt = conn
            .prepare(&self.sql(&format!(
                "SELECT {DELETION_COLUMNS} FROM {{schema}}.DeletedObservation \
                 WHERE (lastModified > ?1 OR (lastModified = ?1 AND id > ?2)) \
                   AND lastModified <= ?3 \
                 ORDER BY lastModified, id LIMIT ?4"
            )))
            .map_err(map_storage_error)?;

        stmt.query_map(
            &[&after_millis, &after_id, &max_date_param(max_date), &usize_to_i64(limit)],
            map_deletion_row,
        )
        .map_err(map_storage_error)
    }

    fn latest_deletion(
        &self,
        max_date: Option<DateTime<Utc>>,
    ) -> DomainResult<Option<DeletionRecord>> {
        let conn = self.db.get_connection()?;
        optional_row(conn.query_row(
            &self.sql(&format!(
                "SELECT {DELETION_COLUMNS} FROM {{schema}}.DeletedObservation \
                 WHERE lastModified <= ?1 ORDER BY lastModified DESC, id DESC LIMIT 1"
            )),
            &[&max_date_param(max_date)],
            map_deletion_row,
        ))
    }
}

impl ObservationDestination for SqliteObservationRepository {
    fn stored_checksum(&self, id: Uuid) -> DomainResult<Option<String>> {
        let conn = self.db.get_connection()?;
        let checksum: Option<Option<String>> = optional_row(conn.query_row(
            &self.sql("SELECT metaChecksum FROM {schema}.Observation WHERE obsID = ?1"),
            &[&uuid_text(id)],
            |row| row.get(0),
        ))?;
        Ok(checksum.flatten())
    }

    fn stored_last_modified(&self, id: Uuid) -> DomainResult<Option<DateTime<Utc>>> {
        let conn = self.db.get_connection()?;
        optional_row(conn.query_row(
            &self.sql("SELECT lastModified FROM {schema}.Observation WHERE obsID = ?1"),
            &[&uuid_text(id)],
            |row| read_timestamp(row, 0),
        ))
    }

    fn put(&self, record: &TransformedRecord) -> DomainResult<()> {
        let observation = &record.observation;
        let obs_id = uuid_text(observation.obs_id);

        let mut conn = self.db.get_connection()?;
        let tx =
            conn.transaction_with_behavior(TransactionBehavior::Immediate).map_err(map_sql_error)?;

        tx.execute(&self.sql("DELETE FROM {schema}.Plane WHERE obsID = ?1"), params![obs_id])
            .map_err(map_sql_error)?;
        tx.execute(
            &self.sql(&format!(
                "INSERT OR REPLACE INTO {{schema}}.Observation ({OBSERVATION_COLUMNS}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
            )),
            params![
                obs_id,
                observation.collection,
                observation.observation_id,
                millis(observation.last_modified),
                record.checksum,
                observation.payload,
            ],
        )
        .map_err(map_sql_error)?;
        {
            let mut insert_plane = tx
                .prepare(&self.sql(&format!(
                    "INSERT INTO {{schema}}.Plane ({PLANE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5)"
                )))
                .map_err(map_sql_error)?;
            for plane in &record.planes {
                insert_plane
                    .execute(params![
                        uuid_text(plane.plane_id),
                        obs_id,
                        plane.product_id,
                        millis(plane.last_modified),
                        plane.payload,
                    ])
                    .map_err(map_sql_error)?;
            }
        }
        tx.commit().map_err(map_sql_error)?;

        debug!(obs_id = %observation.obs_id, planes = record.planes.len(), "Observation stored");
        Ok(())
    }

    fn delete(&self, id: Uuid, deleted_at: DateTime<Utc>) -> DomainResult<bool> {
        let obs_id = uuid_text(id);
        let deleted_millis = millis(deleted_at);

        let mut conn = self.db.get_connection()?;
        let tx =
            conn.transaction_with_behavior(TransactionBehavior::Immediate).map_err(map_sql_error)?;

        let removed = tx
            .execute(
                &self.sql("DELETE FROM {schema}.Observation WHERE obsID = ?1 AND lastModified <= ?2"),
                params![obs_id, deleted_millis],
            )
            .map_err(map_sql_error)?;
        if removed > 0 {
            tx.execute(&self.sql("DELETE FROM {schema}.Plane WHERE obsID = ?1"), params![obs_id])
                .map_err(map_sql_error)?;
            tx.execute(
                &self.sql(&format!(
                    "INSERT OR REPLACE INTO {{schema}}.DeletedObservation ({DELETION_COLUMNS}) \
                     VALUES (?1, ?2)"
                )),
                params![obs_id, deleted_millis],
            )
            .map_err(map_sql_error)?;
        }
        tx.commit().map_err(map_sql_error)?;

        debug!(obs_id = %id, deleted = removed > 0, "Observation delete applied");
        Ok(removed > 0)
    }

    fn update_checksum(&self, id: Uuid, checksum: &str) -> DomainResult<()> {
        let conn = self.db.get_connection()?;
        conn.execute(
            &self.sql("UPDATE {schema}.Observation SET metaChecksum = ?2 WHERE obsID = ?1"),
            &[&uuid_text(id), &checksum],
        )
        .map_err(map_storage_error)?;
        Ok(())
    }

    fn refresh_last_modified(&self, id: Uuid, last_modified: DateTime<Utc>) -> DomainResult<bool> {
        let conn = self.db.get_connection()?;
        let updated = conn
            .execute(
                &self.sql(
                    "UPDATE {schema}.Observation SET lastModified = ?2 \
                     WHERE obsID = ?1 AND lastModified < ?2",
                ),
                &[&uuid_text(id), &millis(last_modified)],
            )
            .map_err(map_storage_error)?;
        Ok(updated > 0)
    }
}

/// Map an `OBSERVATION_COLUMNS` row
fn map_observation_row(row: &Row<'_>) -> rusqlite::Result<ObservationRow> {
    Ok(ObservationRow {
        obs_id: read_uuid(row, 0)?,
        collection: row.get(1)?,
        observation_id: row.get(2)?,
        last_modified: read_timestamp(row, 3)?,
        meta_checksum: row.get(4)?,
        payload: row.get(5)?,
    })
}

/// Map a `PLANE_COLUMNS` row
fn map_plane_row(row: &Row<'_>) -> rusqlite::Result<PlaneRow> {
    Ok(PlaneRow {
        plane_id: read_uuid(row, 0)?,
        obs_id: read_uuid(row, 1)?,
        product_id: row.get(2)?,
        last_modified: read_timestamp(row, 3)?,
        payload: row.get(4)?,
    })
}

/// Map a `DELETION_COLUMNS` row
fn map_deletion_row(row: &Row<'_>) -> rusqlite::Result<DeletionRecord> {
    Ok(DeletionRecord { id: read_uuid(row, 0)?, last_modified: read_timestamp(row, 1)? })
}
