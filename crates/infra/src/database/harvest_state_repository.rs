//! Checkpoint persistence in the `HarvestState` table
//!
//! One row per `(source, cname)` pair. `advance` reads, compares and writes
//! inside a single `IMMEDIATE` transaction so a cursor can never be moved
//! backwards by an interleaved writer.

use std::sync::Arc;

use chrono::Utc;
use harvester_core::CheckpointStore;
use harvester_domain::{CheckpointCursor, HarvestError, Result as DomainResult};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use tracing::debug;
use uuid::Uuid;

use super::columns::{millis, qualify, read_timestamp, read_uuid, uuid_text};
use super::manager::DbManager;
use crate::errors::{map_sql_error, map_storage_error};

const SELECT_CURSOR_SQL: &str = "SELECT curLastModified, curID FROM {schema}.HarvestState \
     WHERE source = ?1 AND cname = ?2";

const UPSERT_CURSOR_SQL: &str = "INSERT INTO {schema}.HarvestState \
     (stateID, source, cname, curLastModified, curID, lastModified) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
     ON CONFLICT (source, cname) DO UPDATE SET \
         curLastModified = excluded.curLastModified, \
         curID = excluded.curID, \
         lastModified = excluded.lastModified";

const DELETE_CURSOR_SQL: &str = "DELETE FROM {schema}.HarvestState WHERE source = ?1 AND cname = ?2";

/// SQLite-backed implementation of [`CheckpointStore`]
pub struct SqliteHarvestStateRepository {
    db: Arc<DbManager>,
}

impl SqliteHarvestStateRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

impl CheckpointStore for SqliteHarvestStateRepository {
    fn get(&self, source: &str, entity_class: &str) -> DomainResult<Option<CheckpointCursor>> {
        let conn = self.db.get_connection()?;
        select_cursor(&conn, self.db.schema(), source, entity_class)
    }

    fn advance(
        &self,
        source: &str,
        entity_class: &str,
        cursor: CheckpointCursor,
    ) -> DomainResult<()> {
        let schema = self.db.schema().to_string();
        let mut conn = self.db.get_connection()?;
        let tx =
            conn.transaction_with_behavior(TransactionBehavior::Immediate).map_err(map_sql_error)?;

        match select_cursor(&tx, &schema, source, entity_class)? {
            Some(current) if current > cursor => {
                return Err(HarvestError::OrderingViolation {
                    source_key: source.to_string(),
                    entity_class: entity_class.to_string(),
                    current,
                    proposed: cursor,
                });
            }
            Some(current) if current == cursor => return Ok(()),
            _ => {}
        }

        tx.execute(
            &qualify(UPSERT_CURSOR_SQL, &schema),
            params![
                uuid_text(Uuid::now_v7()),
                source,
                entity_class,
                millis(cursor.last_modified),
                uuid_text(cursor.last_id),
                millis(Utc::now()),
            ],
        )
        .map_err(map_sql_error)?;
        tx.commit().map_err(map_sql_error)?;

        debug!(source, entity_class, cursor = %cursor, "Checkpoint advanced");
        Ok(())
    }

    fn reset(&self, source: &str, entity_class: &str) -> DomainResult<()> {
        let conn = self.db.get_connection()?;
        let removed = conn
            .execute(&qualify(DELETE_CURSOR_SQL, self.db.schema()), &[&source, &entity_class])
            .map_err(map_storage_error)?;
        debug!(source, entity_class, removed, "Checkpoint reset");
        Ok(())
    }
}

fn select_cursor(
    conn: &Connection,
    schema: &str,
    source: &str,
    entity_class: &str,
) -> DomainResult<Option<CheckpointCursor>> {
    conn.query_row(&qualify(SELECT_CURSOR_SQL, schema), params![source, entity_class], |row| {
        Ok(CheckpointCursor::new(read_timestamp(row, 0)?, read_uuid(row, 1)?))
    })
    .optional()
    .map_err(map_sql_error)
}
