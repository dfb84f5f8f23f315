//! Observation records moved by a harvest
//!
//! Payloads are opaque JSON documents; the engine only looks at identity,
//! timestamps and checksums.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::checkpoint::CheckpointCursor;

/// One row of the `Observation` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationRow {
    pub obs_id: Uuid,
    pub collection: String,
    pub observation_id: String,
    pub last_modified: DateTime<Utc>,
    pub meta_checksum: Option<String>,
    pub payload: String,
}

/// One row of the `Plane` table, a child of an observation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaneRow {
    pub plane_id: Uuid,
    pub obs_id: Uuid,
    pub product_id: String,
    pub last_modified: DateTime<Utc>,
    pub payload: String,
}

/// A source observation together with all of its planes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub observation: ObservationRow,
    pub planes: Vec<PlaneRow>,
}

impl CandidateRecord {
    pub fn new(observation: ObservationRow, planes: Vec<PlaneRow>) -> Self {
        Self { observation, planes }
    }

    pub fn id(&self) -> Uuid {
        self.observation.obs_id
    }

    pub fn last_modified(&self) -> DateTime<Utc> {
        self.observation.last_modified
    }

    /// Cursor the checkpoint moves to once this record is committed
    pub fn cursor(&self) -> CheckpointCursor {
        CheckpointCursor::new(self.observation.last_modified, self.observation.obs_id)
    }
}

/// Entry of the source's deletion feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionRecord {
    /// Identity of the deleted observation
    pub id: Uuid,
    /// When the observation was deleted
    pub last_modified: DateTime<Utc>,
}

impl DeletionRecord {
    pub fn cursor(&self) -> CheckpointCursor {
        CheckpointCursor::new(self.last_modified, self.id)
    }
}

/// Output of the transform step, ready to be written to the destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformedRecord {
    /// Observation row with `meta_checksum` set to `checksum`
    pub observation: ObservationRow,
    pub planes: Vec<PlaneRow>,
    pub checksum: String,
}

impl TransformedRecord {
    pub fn id(&self) -> Uuid {
        self.observation.obs_id
    }
}
