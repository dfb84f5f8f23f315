//! Storage error types
//!
//! Defines error types for the storage layer, integrating with the common
//! error classification.

use thiserror::Error;

use crate::error::{ErrorClassification, ErrorSeverity};

/// Storage error type
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("Database query error: {0}")]
    Query(String),

    #[error("Database migration error: {0}")]
    Migration(String),

    #[error("Database pool exhausted")]
    PoolExhausted,

    #[error("Connection timeout after {0}s")]
    Timeout(u64),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Schema version mismatch: expected {expected}, found {found}")]
    SchemaVersionMismatch { expected: i32, found: i32 },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Rusqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    R2d2(#[from] r2d2::Error),
}

/// Storage result type
pub type StorageResult<T> = Result<T, StorageError>;

impl StorageError {
    /// Whether the error means the store itself cannot be reached
    ///
    /// Covers pool and connection failures as well as SQLite conditions that
    /// prevent any statement from running (file cannot be opened, disk I/O,
    /// not a database). Everything else is a failure of one statement.
    pub fn is_connection_failure(&self) -> bool {
        match self {
            Self::Connection(_) | Self::PoolExhausted | Self::Timeout(_) | Self::R2d2(_) => true,
            Self::Io(_) => true,
            Self::Rusqlite(err) => matches!(
                err.sqlite_error_code(),
                Some(
                    rusqlite::ErrorCode::CannotOpen
                        | rusqlite::ErrorCode::SystemIoFailure
                        | rusqlite::ErrorCode::NotADatabase
                        | rusqlite::ErrorCode::DatabaseBusy
                        | rusqlite::ErrorCode::DatabaseLocked
                        | rusqlite::ErrorCode::DiskFull
                )
            ),
            _ => false,
        }
    }
}

impl ErrorClassification for StorageError {
    /// Check if this error is retryable
    ///
    /// Retryable errors include:
    /// - Connection timeouts
    /// - Pool exhaustion
    /// - Transient database locks
    fn is_retryable(&self) -> bool {
        match self {
            Self::PoolExhausted | Self::Timeout(_) | Self::Connection(_) => true,
            Self::Rusqlite(err) => matches!(
                err.sqlite_error_code(),
                Some(rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked)
            ),
            _ => false,
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::PoolExhausted | Self::Timeout(_) => ErrorSeverity::Warning,
            Self::Migration(_) | Self::SchemaVersionMismatch { .. } => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }

    fn is_critical(&self) -> bool {
        matches!(self, Self::Migration(_) | Self::SchemaVersionMismatch { .. })
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for storage::error.
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StorageError::Connection("Failed to connect".to_string());
        assert_eq!(err.to_string(), "Database connection error: Failed to connect");

        let err = StorageError::Timeout(5);
        assert_eq!(err.to_string(), "Connection timeout after 5s");
    }

    #[test]
    fn test_error_retryability() {
        assert!(StorageError::PoolExhausted.is_retryable());
        assert!(StorageError::Timeout(5).is_retryable());
        assert!(StorageError::Connection("test".to_string()).is_retryable());
        assert!(!StorageError::InvalidConfig("test".to_string()).is_retryable());
        assert!(!StorageError::Query("bad sql".to_string()).is_retryable());
    }

    #[test]
    fn test_connection_failure_classification() {
        assert!(StorageError::Connection("gone".to_string()).is_connection_failure());
        assert!(StorageError::Timeout(1).is_connection_failure());
        assert!(!StorageError::Query("syntax".to_string()).is_connection_failure());
        assert!(!StorageError::Rusqlite(rusqlite::Error::QueryReturnedNoRows)
            .is_connection_failure());
    }

    #[test]
    fn test_error_severity() {
        assert_eq!(StorageError::Timeout(5).severity(), ErrorSeverity::Warning);
        assert_eq!(
            StorageError::Migration("test".to_string()).severity(),
            ErrorSeverity::Critical
        );
        assert!(StorageError::SchemaVersionMismatch { expected: 2, found: 1 }.is_critical());
        assert!(!StorageError::PoolExhausted.is_critical());
    }
}
