//! SQLite connection pool
//!
//! Provides r2d2-based connection pooling. Every pooled connection is an
//! in-memory main database with the harvest database file attached under the
//! configured schema name.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use tracing::{debug, info, instrument, warn};

use super::config::SqlitePoolConfig;
use super::connection::SqliteConnection;
use super::pragmas::apply_connection_pragmas;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::metrics::StorageMetrics;

/// Schema names SQLite reserves for its own databases
const RESERVED_SCHEMAS: [&str; 2] = ["main", "temp"];

/// Check that `schema` can be used as an unquoted SQL identifier
///
/// Schema names cannot be bound as statement parameters, so they are the only
/// values ever formatted into SQL text; this check is what makes that safe.
///
/// # Errors
/// Returns [`StorageError::InvalidConfig`] for empty, reserved or non
/// identifier names.
pub fn validate_schema_name(schema: &str) -> StorageResult<()> {
    let mut chars = schema.chars();
    let valid_start = chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if !valid_start || !valid_rest {
        return Err(StorageError::InvalidConfig(format!(
            "schema name must be a plain identifier, found: {schema:?}"
        )));
    }
    if RESERVED_SCHEMAS.iter().any(|reserved| reserved.eq_ignore_ascii_case(schema)) {
        return Err(StorageError::InvalidConfig(format!("schema name {schema:?} is reserved")));
    }
    Ok(())
}

/// SQLite connection pool
pub struct SqlitePool {
    pool: Pool<SqliteConnectionManager>,
    path: PathBuf,
    schema: String,
    config: SqlitePoolConfig,
    metrics: Arc<StorageMetrics>,
}

impl fmt::Debug for SqlitePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlitePool")
            .field("path", &self.path)
            .field("schema", &self.schema)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SqlitePool {
    /// Create a pool whose connections attach `path` as `schema`
    ///
    /// # Process
    /// 1. Validate the schema name
    /// 2. Create a connection manager that attaches the file and applies
    ///    pragmas on every new connection
    /// 3. Build the r2d2 pool and check out one connection to surface attach
    ///    failures immediately
    ///
    /// # Errors
    /// Returns an error if the schema name is invalid, the file cannot be
    /// attached, or the pool cannot be built.
    #[instrument(skip_all, fields(db_path = ?path, schema = %schema, pool_size = config.max_size))]
    pub fn attach(path: &Path, schema: &str, config: SqlitePoolConfig) -> StorageResult<Self> {
        validate_schema_name(schema)?;
        info!("Creating SQLite connection pool");

        let metrics = Arc::new(StorageMetrics::new(config.max_size));

        let attach_sql = format!("ATTACH DATABASE ?1 AS \"{schema}\"");
        let attach_path = path.to_string_lossy().into_owned();
        let schema_name = schema.to_string();
        let pool_config = config.clone();

        let manager = SqliteConnectionManager::memory().with_init(move |conn| {
            conn.execute(&attach_sql, [&attach_path])?;

            apply_connection_pragmas(conn, &schema_name, &pool_config)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

            Ok(())
        });

        let pool = Pool::builder()
            .max_size(config.max_size)
            .connection_timeout(config.connection_timeout)
            .build(manager)
            .map_err(|e| {
                warn!("Failed to create connection pool: {}", e);
                StorageError::Connection(format!("Failed to create pool: {e}"))
            })?;

        {
            let _conn = pool.get().map_err(|e| {
                warn!("Failed to get test connection: {}", e);
                StorageError::Connection(format!("Failed to attach {}: {e}", path.display()))
            })?;
            debug!("Database attached successfully");
        }

        info!("SQLite pool created successfully with {} connections", config.max_size);

        Ok(Self {
            pool,
            path: path.to_path_buf(),
            schema: schema.to_string(),
            config,
            metrics,
        })
    }

    /// Get a connection from the pool
    #[instrument(skip(self), fields(schema = %self.schema))]
    pub fn get_connection(&self) -> StorageResult<SqliteConnection> {
        let start = Instant::now();

        match self.pool.get() {
            Ok(conn) => {
                let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
                self.metrics.record_acquired(duration_ms);

                debug!("Connection acquired in {}ms", duration_ms);
                Ok(SqliteConnection::new(conn))
            }
            Err(e) => {
                let err_str = e.to_string().to_lowercase();

                if err_str.contains("timed out") || err_str.contains("timeout") {
                    self.metrics.record_timeout();
                    warn!("Connection timeout after {:?}", self.config.connection_timeout);
                    Err(StorageError::Timeout(self.config.connection_timeout.as_secs()))
                } else {
                    self.metrics.record_error();
                    warn!("Connection error: {}", e);
                    Err(StorageError::Connection(format!("Failed to get connection: {e}")))
                }
            }
        }
    }

    /// Verify the attached database answers a trivial query
    pub fn health_check(&self) -> StorageResult<()> {
        let conn = self.get_connection()?;
        conn.query_row("SELECT 1", &[], |row| row.get::<_, i32>(0))?;
        Ok(())
    }

    /// Schema name the database file is attached under
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Path of the attached database file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the pool metrics
    pub fn metrics(&self) -> &Arc<StorageMetrics> {
        &self.metrics
    }
}
