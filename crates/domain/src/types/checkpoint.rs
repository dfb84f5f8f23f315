//! Checkpoint cursor

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Position of the most recently processed record of one entity class
///
/// Cursors are totally ordered by `(last_modified, last_id)`; the field order
/// below is what the derived `Ord` compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CheckpointCursor {
    pub last_modified: DateTime<Utc>,
    pub last_id: Uuid,
}

impl CheckpointCursor {
    pub fn new(last_modified: DateTime<Utc>, last_id: Uuid) -> Self {
        Self { last_modified, last_id }
    }

    /// Whether a record at `(last_modified, id)` lies strictly after this cursor
    pub fn precedes(&self, last_modified: DateTime<Utc>, id: Uuid) -> bool {
        *self < Self::new(last_modified, id)
    }
}

impl fmt::Display for CheckpointCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}",
            self.last_modified.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.last_id
        )
    }
}
