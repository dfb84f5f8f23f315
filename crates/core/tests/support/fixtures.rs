//! Record fixtures
//!
//! Record `n` has id `n` and is modified at `n` seconds after the epoch, so
//! harvest order equals numeric order.

use chrono::{DateTime, TimeZone, Utc};
use harvester_domain::{CheckpointCursor, DeletionRecord, ObservationRow, PlaneRow};
use uuid::Uuid;

pub fn id(n: u128) -> Uuid {
    Uuid::from_u128(n)
}

pub fn at(seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(seconds * 1000).unwrap()
}

pub fn observation(n: u128) -> ObservationRow {
    ObservationRow {
        obs_id: id(n),
        collection: "TEST".to_string(),
        observation_id: format!("obs-{n}"),
        last_modified: at(i64::try_from(n).unwrap()),
        meta_checksum: None,
        payload: format!(r#"{{"sequence":{n}}}"#),
    }
}

pub fn plane(obs: u128, n: u128) -> PlaneRow {
    PlaneRow {
        plane_id: id(obs * 1000 + n),
        obs_id: id(obs),
        product_id: format!("product-{obs}-{n}"),
        last_modified: at(i64::try_from(obs).unwrap()),
        payload: format!(r#"{{"plane":{n}}}"#),
    }
}

pub fn cursor(n: u128) -> CheckpointCursor {
    CheckpointCursor::new(at(i64::try_from(n).unwrap()), id(n))
}

pub fn deletion(n: u128, seconds: i64) -> DeletionRecord {
    DeletionRecord { id: id(n), last_modified: at(seconds) }
}
