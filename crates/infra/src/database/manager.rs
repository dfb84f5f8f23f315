//! Database connection manager backed by the shared SQLite pool.
//!
//! One manager per data source: it attaches `<server dir>/<database>.db`
//! under the coordinates' schema name and hands out pooled connections.

use std::path::Path;
use std::sync::Arc;

use harvester_common::storage::sqlite::{SqliteConnection, SqlitePool, SqlitePoolConfig};
use harvester_common::storage::{StorageConfig, StorageError, StorageMetrics};
use harvester_domain::{DataSourceCoords, DatabaseConfig, HarvestError, HarvesterConfig, Result};
use tracing::{info, warn};

use super::columns::qualify;
use crate::errors::{map_sql_error, map_storage_error};

const SCHEMA_VERSION: i32 = 1;
const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Database manager that wraps an [`SqlitePool`].
pub struct DbManager {
    pool: Arc<SqlitePool>,
    coords: DataSourceCoords,
}

impl DbManager {
    /// Open an existing harvest store.
    ///
    /// # Errors
    /// Returns `StoreUnavailable` when the database file does not exist or
    /// cannot be attached.
    pub fn open(coords: &DataSourceCoords, config: &HarvesterConfig) -> Result<Self> {
        let path = config.database_path(coords);
        if !path.is_file() {
            return Err(HarvestError::StoreUnavailable(format!(
                "database for {coords} not found at {}",
                path.display()
            )));
        }
        Self::attach(coords, &path, &config.database)
    }

    /// Open a harvest store, creating the database file if needed.
    ///
    /// # Errors
    /// Returns `StoreUnavailable` when the directory or file cannot be
    /// created or attached.
    pub fn open_or_create(coords: &DataSourceCoords, config: &HarvesterConfig) -> Result<Self> {
        let path = config.database_path(coords);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(StorageError::from)
                .map_err(map_storage_error)?;
        }
        Self::attach(coords, &path, &config.database)
    }

    fn attach(coords: &DataSourceCoords, path: &Path, database: &DatabaseConfig) -> Result<Self> {
        let storage_config = StorageConfig {
            pool_size: database.pool_size,
            connection_timeout_secs: database.connection_timeout_secs,
            busy_timeout_ms: database.busy_timeout_ms,
            enable_wal: database.enable_wal,
        };
        storage_config.validate().map_err(map_storage_error)?;

        let pool = SqlitePool::attach(path, &coords.schema, SqlitePoolConfig::from(&storage_config))
            .map_err(map_storage_error)?;

        info!(
            source = %coords,
            db_path = %path.display(),
            max_connections = pool.metrics().max_pool_size(),
            "sqlite pool initialised"
        );

        Ok(Self { pool: Arc::new(pool), coords: coords.clone() })
    }

    /// Borrow the underlying SQLite pool.
    pub fn pool(&self) -> &Arc<SqlitePool> {
        &self.pool
    }

    /// Acquire a connection from the pool.
    pub fn get_connection(&self) -> Result<SqliteConnection> {
        self.pool.get_connection().map_err(map_storage_error)
    }

    /// Ensure the full schema exists in the attached database.
    pub fn run_migrations(&self) -> Result<()> {
        let conn = self.get_connection()?;
        create_schema(&conn, self.schema())
    }

    /// Coordinates this manager was opened for.
    pub fn coords(&self) -> &DataSourceCoords {
        &self.coords
    }

    /// Schema name the database is attached under.
    pub fn schema(&self) -> &str {
        self.pool.schema()
    }

    /// Return the attached database path.
    pub fn path(&self) -> &Path {
        self.pool.path()
    }

    /// Connection pool counters.
    pub fn metrics(&self) -> &Arc<StorageMetrics> {
        self.pool.metrics()
    }

    /// Perform a health check to verify database connectivity.
    pub fn health_check(&self) -> Result<()> {
        self.pool.health_check().map_err(map_storage_error)
    }

    /// Log pool usage for this store.
    pub fn log_metrics(&self) {
        let usage = self.metrics().snapshot();
        if usage.is_degraded() {
            warn!(
                source = %self.coords,
                acquired = usage.acquired,
                timeouts = usage.timeouts,
                errors = usage.errors,
                slowest_wait_ms = usage.slowest_wait_ms,
                "connection pool failed to hand out connections"
            );
        } else {
            info!(
                source = %self.coords,
                acquired = usage.acquired,
                avg_wait_ms = usage.avg_wait_ms,
                slowest_wait_ms = usage.slowest_wait_ms,
                "connection pool usage"
            );
        }
    }
}

fn create_schema(conn: &SqliteConnection, schema: &str) -> Result<()> {
    conn.execute_batch(&qualify(SCHEMA_SQL, schema)).map_err(map_sql_error)?;

    let found: Option<i32> = conn
        .query_row(&qualify("SELECT MAX(version) FROM {schema}.schema_version", schema), &[], |row| {
            row.get(0)
        })
        .map_err(map_storage_error)?;
    if let Some(found) = found.filter(|found| *found > SCHEMA_VERSION) {
        return Err(map_storage_error(StorageError::SchemaVersionMismatch {
            expected: SCHEMA_VERSION,
            found,
        }));
    }

    conn.execute(
        &qualify(
            "INSERT OR IGNORE INTO {schema}.schema_version (version, applied_at) \
             VALUES (?1, CAST(strftime('%s','now') AS INTEGER))",
            schema,
        ),
        &[&SCHEMA_VERSION],
    )
    .map_err(map_storage_error)?;
    Ok(())
}
