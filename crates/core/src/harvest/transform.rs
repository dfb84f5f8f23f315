//! Default record transform
//!
//! Validates that every payload is a JSON document and derives the content
//! checksum. Timestamps are left out of the checksum, so a record re-stamped
//! at the source without a content change is reported as unchanged and only
//! its stored modification time moves forward.

use harvester_domain::{CandidateRecord, HarvestError, PlaneRow, Result, TransformedRecord};
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use super::ports::RecordTransform;

/// Transform that passes records through and computes a blake3 checksum
#[derive(Debug, Clone, Copy, Default)]
pub struct ChecksumTransform;

impl ChecksumTransform {
    pub fn new() -> Self {
        Self
    }
}

fn parse_payload(record_id: Uuid, what: &str, payload: &str) -> Result<Value> {
    serde_json::from_str(payload)
        .map_err(|e| HarvestError::record(record_id, format!("malformed {what} payload: {e}")))
}

/// Canonical JSON of the record content
///
/// `serde_json` maps keep their keys sorted, so serialising a parsed value is
/// stable regardless of the key order in the stored payload.
fn canonical_document(record: &CandidateRecord, planes: &[&PlaneRow]) -> Result<Value> {
    let id = record.id();
    let observation = &record.observation;

    let mut plane_docs = Vec::with_capacity(planes.len());
    for plane in planes {
        if plane.obs_id != id {
            return Err(HarvestError::record(
                id,
                format!("plane {} belongs to observation {}", plane.plane_id, plane.obs_id),
            ));
        }
        plane_docs.push(json!({
            "planeID": plane.plane_id,
            "productID": plane.product_id,
            "payload": parse_payload(id, "plane", &plane.payload)?,
        }));
    }

    Ok(json!({
        "obsID": id,
        "collection": observation.collection,
        "observationID": observation.observation_id,
        "payload": parse_payload(id, "observation", &observation.payload)?,
        "planes": plane_docs,
    }))
}

impl RecordTransform for ChecksumTransform {
    fn transform(&self, record: &CandidateRecord) -> Result<TransformedRecord> {
        let mut planes: Vec<&PlaneRow> = record.planes.iter().collect();
        planes.sort_by_key(|plane| plane.plane_id);

        let document = canonical_document(record, &planes)?;
        let canonical = serde_json::to_vec(&document)
            .map_err(|e| HarvestError::record(record.id(), format!("serialisation failed: {e}")))?;
        let checksum = blake3::hash(&canonical).to_hex().to_string();

        debug!(obs_id = %record.id(), planes = planes.len(), %checksum, "Computed record checksum");

        let mut observation = record.observation.clone();
        observation.meta_checksum = Some(checksum.clone());

        Ok(TransformedRecord {
            observation,
            planes: planes.into_iter().cloned().collect(),
            checksum,
        })
    }
}
