//! Storage primitives for SQLite-backed harvest stores
//!
//! This module provides the pooled connection infrastructure shared by the
//! source and destination stores: an r2d2 pool whose connections attach one
//! database file under a schema name, per-connection pragmas, and pool
//! metrics.

pub mod config;
pub mod error;
pub mod metrics;
pub mod sqlite;

// Re-export commonly used types
pub use config::StorageConfig;
pub use error::{StorageError, StorageResult};
pub use metrics::{PoolUsage, StorageMetrics};
pub use sqlite::{
    apply_connection_pragmas, validate_schema_name, SqliteConnection, SqlitePool,
    SqlitePoolConfig, SqliteStatement,
};
