//! Skip registry entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::MAX_ERROR_MESSAGE_LENGTH;

/// A record that failed to harvest and is quarantined for a later retry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipEntry {
    /// Key of the store the record came from
    pub source: String,
    pub entity_class: String,
    /// Identity of the failing record
    pub skip_id: Uuid,
    pub error_message: String,
    /// Time of the last registry write, unset until the entry is stored
    pub last_modified: Option<DateTime<Utc>>,
    /// Surrogate key assigned by the registry on first insert
    pub id: Option<Uuid>,
}

impl SkipEntry {
    /// Create an entry that has not been stored yet
    pub fn new(
        source: impl Into<String>,
        entity_class: impl Into<String>,
        skip_id: Uuid,
        error_message: impl AsRef<str>,
    ) -> Self {
        Self {
            source: source.into(),
            entity_class: entity_class.into(),
            skip_id,
            error_message: truncate_message(error_message.as_ref()),
            last_modified: None,
            id: None,
        }
    }

    /// Replace the error message, keeping the surrogate key
    #[must_use]
    pub fn with_error(mut self, error_message: impl AsRef<str>) -> Self {
        self.error_message = truncate_message(error_message.as_ref());
        self
    }
}

/// Cut `message` to the stored length on a character boundary
pub fn truncate_message(message: &str) -> String {
    message.chars().take(MAX_ERROR_MESSAGE_LENGTH).collect()
}
