//! Column encodings shared by the harvest repositories
//!
//! Timestamps are stored as INTEGER milliseconds since the Unix epoch and
//! UUIDs as lowercase hyphenated TEXT, whose text order matches UUID order.

use chrono::{DateTime, Utc};
use harvester_common::storage::{StorageError, StorageResult};
use harvester_domain::utils::{from_epoch_millis, to_epoch_millis};
use harvester_domain::Result as DomainResult;
use rusqlite::types::Type;
use rusqlite::Row;
use uuid::Uuid;

use crate::errors::map_storage_error;

/// Replace the `{schema}` token of a statement template with the quoted name
///
/// Only ever called with a schema name validated when the pool was created.
pub fn qualify(template: &str, schema: &str) -> String {
    template.replace("{schema}", &format!("\"{schema}\""))
}

pub fn uuid_text(id: Uuid) -> String {
    id.hyphenated().to_string()
}

pub fn millis(timestamp: DateTime<Utc>) -> i64 {
    to_epoch_millis(timestamp)
}

pub fn usize_to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// `LIMIT` value for an optional bound; SQLite treats a negative limit as none
pub fn limit_param(limit: Option<usize>) -> i64 {
    limit.map_or(-1, usize_to_i64)
}

/// Lower bound of a keyset scan starting at `after`
pub fn cursor_params(after: Option<(DateTime<Utc>, Uuid)>) -> (i64, String) {
    after.map_or((i64::MIN, String::new()), |(timestamp, id)| (millis(timestamp), uuid_text(id)))
}

/// Upper bound of a scan limited to `max_date`
pub fn max_date_param(max_date: Option<DateTime<Utc>>) -> i64 {
    max_date.map_or(i64::MAX, millis)
}

pub fn read_uuid(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let text: String = row.get(idx)?;
    Uuid::parse_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub fn read_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let value: i64 = row.get(idx)?;
    from_epoch_millis(value).ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, value))
}

/// Treat "no rows" from a single-row query as absence
pub fn optional_row<T>(result: StorageResult<T>) -> DomainResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(StorageError::Rusqlite(rusqlite::Error::QueryReturnedNoRows)) => Ok(None),
        Err(err) => Err(map_storage_error(err)),
    }
}
