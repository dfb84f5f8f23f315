//! SQLite pragma management
//!
//! Applies per-connection pragmas to the attached schema.

use rusqlite::Connection;

use super::config::SqlitePoolConfig;
use crate::storage::error::{StorageError, StorageResult};

/// Apply connection-level pragmas
///
/// These pragmas are applied to each connection in the pool:
/// - WAL mode on the attached schema so source reads do not block writers
/// - NORMAL synchronous mode for balanced safety/performance
/// - Busy timeout for handling lock contention
///
/// `schema` must already have passed [`super::validate_schema_name`].
pub fn apply_connection_pragmas(
    conn: &Connection,
    schema: &str,
    config: &SqlitePoolConfig,
) -> StorageResult<()> {
    let mut pragma_sql = String::new();

    if config.enable_wal {
        pragma_sql.push_str(&format!("PRAGMA \"{schema}\".journal_mode=WAL;\n"));
    }
    pragma_sql.push_str(&format!("PRAGMA \"{schema}\".synchronous=NORMAL;\n"));

    conn.execute_batch(&pragma_sql)
        .map_err(|e| StorageError::Query(format!("Failed to apply pragmas: {e}")))?;

    // Set busy timeout (separate call as it takes a parameter)
    conn.busy_timeout(config.busy_timeout)
        .map_err(|e| StorageError::Query(format!("Failed to set busy timeout: {e}")))?;

    Ok(())
}
