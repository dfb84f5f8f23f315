//! Error types used throughout the harvester

use thiserror::Error;
use uuid::Uuid;

use crate::types::CheckpointCursor;

/// Main error type for a harvest run
#[derive(Error, Debug)]
pub enum HarvestError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error(
        "Checkpoint ordering violation for {source_key}/{entity_class}: \
         {proposed} is before {current}"
    )]
    OrderingViolation {
        source_key: String,
        entity_class: String,
        current: CheckpointCursor,
        proposed: CheckpointCursor,
    },

    #[error("Record {id} failed: {reason}")]
    Record { id: Uuid, reason: String },

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl HarvestError {
    /// Build a record-level failure for the record `id`
    pub fn record(id: Uuid, reason: impl Into<String>) -> Self {
        Self::Record { id, reason: reason.into() }
    }

    /// Whether the failure only concerns a single record
    ///
    /// Record failures go to the skip registry and the run continues; every
    /// other variant aborts the run.
    pub fn is_record_level(&self) -> bool {
        matches!(self, Self::Record { .. })
    }

    /// Whether the error was caused by bad user input
    pub fn is_argument_error(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }
}

/// Result type alias for harvester operations
pub type Result<T> = std::result::Result<T, HarvestError>;
