//! Skip registry persistence in the `HarvestSkip` table
//!
//! Rows are keyed by a UUIDv7 surrogate assigned on first insert. Uniqueness
//! of `(source, cname, skipID)` is kept by the harvester, which always reuses
//! the id of an existing entry.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use harvester_core::SkipRegistry;
use harvester_domain::utils::from_epoch_millis;
use harvester_domain::{HarvestError, Result as DomainResult, SkipEntry};
use rusqlite::{params, Row};
use tracing::debug;
use uuid::Uuid;

use super::columns::{millis, optional_row, qualify, read_timestamp, read_uuid, usize_to_i64, uuid_text};
use super::manager::DbManager;
use crate::errors::map_storage_error;

/// Column list shared by every statement touching `HarvestSkip`
const SKIP_COLUMNS: &str = "id, source, cname, skipID, errorMessage, lastModified";

/// SQLite-backed implementation of [`SkipRegistry`]
pub struct SqliteHarvestSkipRepository {
    db: Arc<DbManager>,
}

impl SqliteHarvestSkipRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    fn sql(&self, template: &str) -> String {
        qualify(&template.replace("{columns}", SKIP_COLUMNS), self.db.schema())
    }
}

impl SkipRegistry for SqliteHarvestSkipRepository {
    fn get(
        &self,
        source: &str,
        entity_class: &str,
        skip_id: Uuid,
    ) -> DomainResult<Option<SkipEntry>> {
        let conn = self.db.get_connection()?;
        optional_row(conn.query_row(
            &self.sql(
                "SELECT {columns} FROM {schema}.HarvestSkip \
                 WHERE source = ?1 AND cname = ?2 AND skipID = ?3 \
                 ORDER BY lastModified, id LIMIT 1",
            ),
            &[&source, &entity_class, &uuid_text(skip_id)],
            map_skip_row,
        ))
    }

    fn list(
        &self,
        source: &str,
        entity_class: &str,
        since: Option<DateTime<Utc>>,
        limit: usize,
    ) -> DomainResult<Vec<SkipEntry>> {
        let conn = self.db.get_connection()?;
        let since = since.map_or(i64::MIN, millis);
        let mut stmt = conn
            .prepare(&self.sql(
                "SELECT {columns} FROM {schema}.HarvestSkip \
                 WHERE source = ?1 AND cname = ?2 AND lastModified >= ?3 \
                 ORDER BY lastModified, id LIMIT ?4",
            ))
            .map_err(map_storage_error)?;

        stmt.query_map(&[&source, &entity_class, &since, &usize_to_i64(limit)], map_skip_row)
            .map_err(map_storage_error)
    }

    fn put(&self, entry: &SkipEntry) -> DomainResult<SkipEntry> {
        let now = Utc::now();
        let stamped = from_epoch_millis(millis(now)).unwrap_or(now);
        let id = entry.id.unwrap_or_else(Uuid::now_v7);
        let stored = SkipEntry { id: Some(id), last_modified: Some(stamped), ..entry.clone() };

        let conn = self.db.get_connection()?;
        conn.execute(
            &self.sql(
                "INSERT INTO {schema}.HarvestSkip ({columns}) VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
                 ON CONFLICT (id) DO UPDATE SET \
                     errorMessage = excluded.errorMessage, \
                     lastModified = excluded.lastModified",
            ),
            params![
                uuid_text(id),
                stored.source,
                stored.entity_class,
                uuid_text(stored.skip_id),
                stored.error_message,
                millis(stamped),
            ],
        )
        .map_err(map_storage_error)?;

        debug!(skip_id = %stored.skip_id, %id, inserted = entry.id.is_none(), "Skip entry stored");
        Ok(stored)
    }

    fn delete(&self, entry: &SkipEntry) -> DomainResult<()> {
        let Some(id) = entry.id else {
            return Err(HarvestError::InvalidArgument(format!(
                "cannot delete skip entry for {} without an id",
                entry.skip_id
            )));
        };

        let conn = self.db.get_connection()?;
        let removed = conn
            .execute(
                &self.sql("DELETE FROM {schema}.HarvestSkip WHERE id = ?1"),
                params![uuid_text(id)],
            )
            .map_err(map_storage_error)?;
        debug!(skip_id = %entry.skip_id, %id, removed, "Skip entry deleted");
        Ok(())
    }
}

/// Map a `SKIP_COLUMNS` row to a [`SkipEntry`]
fn map_skip_row(row: &Row<'_>) -> rusqlite::Result<SkipEntry> {
    Ok(SkipEntry {
        id: Some(read_uuid(row, 0)?),
        source: row.get(1)?,
        entity_class: row.get(2)?,
        skip_id: read_uuid(row, 3)?,
        error_message: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        last_modified: Some(read_timestamp(row, 5)?),
    })
}
