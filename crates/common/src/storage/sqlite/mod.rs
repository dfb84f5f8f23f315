//! SQLite backend implementation
//!
//! Provides an r2d2-based connection pool whose connections attach a single
//! database file under a schema name, so every statement can qualify its
//! tables as `schema.Table`.

pub mod config;
pub mod connection;
pub mod pool;
pub mod pragmas;

pub use config::SqlitePoolConfig;
pub use connection::{SqliteConnection, SqliteStatement};
pub use pool::{validate_schema_name, SqlitePool};
pub use pragmas::apply_connection_pragmas;
