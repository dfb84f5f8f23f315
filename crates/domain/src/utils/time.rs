//! Timestamp parsing and storage conversions
//!
//! Timestamps are always UTC. The command line accepts the IVOA form
//! `yyyy-MM-ddTHH:mm:ss[.SSS]`, the same with a space separator, a bare date
//! (midnight) or RFC 3339 with an explicit offset. Stores keep milliseconds
//! since the Unix epoch.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::errors::{HarvestError, Result};

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse a UTC timestamp given on the command line
///
/// # Errors
/// Returns [`HarvestError::InvalidArgument`] when no supported format matches.
pub fn parse_utc_timestamp(value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }

    Err(HarvestError::InvalidArgument(format!(
        "invalid UTC timestamp {value:?}, expected yyyy-MM-ddTHH:mm:ss[.SSS]"
    )))
}

/// Milliseconds since the Unix epoch, as stored in the database
pub fn to_epoch_millis(timestamp: DateTime<Utc>) -> i64 {
    timestamp.timestamp_millis()
}

/// Inverse of [`to_epoch_millis`]; `None` when out of chrono's range
pub fn from_epoch_millis(millis: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
}
