//! Domain types and models
//!
//! Checkpoint cursors, skip entries, candidate records and the options that
//! select how a harvest run behaves.

pub mod checkpoint;
pub mod coords;
pub mod record;
pub mod run;
pub mod skip;

pub use checkpoint::CheckpointCursor;
pub use coords::DataSourceCoords;
pub use record::{CandidateRecord, DeletionRecord, ObservationRow, PlaneRow, TransformedRecord};
pub use run::{HarvestMode, ModeFlags, RunOptions};
pub use skip::SkipEntry;
