//! Storage configuration
//!
//! Connection pool settings shared by every harvest store.

use std::time::Duration;

use super::error::StorageError;

/// Storage configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Connection pool size (default: 4)
    pub pool_size: u32,

    /// Connection timeout in seconds (default: 5)
    pub connection_timeout_secs: u64,

    /// Busy timeout in milliseconds (default: 5000)
    pub busy_timeout_ms: u64,

    /// Enable WAL mode (default: true)
    pub enable_wal: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { pool_size: 4, connection_timeout_secs: 5, busy_timeout_ms: 5000, enable_wal: true }
    }
}

impl StorageConfig {
    /// Validate the configuration
    ///
    /// # Errors
    /// Returns an error if any configuration value is out of range.
    pub fn validate(&self) -> Result<(), StorageError> {
        if self.pool_size == 0 {
            return Err(StorageError::InvalidConfig(
                "pool_size must be greater than 0".to_string(),
            ));
        }
        if self.pool_size > 100 {
            return Err(StorageError::InvalidConfig("pool_size too large (max: 100)".to_string()));
        }
        if self.connection_timeout_secs == 0 {
            return Err(StorageError::InvalidConfig(
                "connection_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.busy_timeout_ms == 0 {
            return Err(StorageError::InvalidConfig(
                "busy_timeout_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Set the connection pool size
    pub fn with_pool_size(mut self, size: u32) -> Self {
        self.pool_size = size;
        self
    }

    /// Set the busy timeout
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Disable WAL mode
    pub fn without_wal(mut self) -> Self {
        self.enable_wal = false;
        self
    }
}
