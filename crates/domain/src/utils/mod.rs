//! Domain utilities

pub mod time;

pub use time::{from_epoch_millis, parse_utc_timestamp, to_epoch_millis};
