//! Incremental observation harvest
//!
//! Ports for the checkpoint store, skip registry, source, destination and
//! transform, plus the engine that drives them: batch fetching, per-record
//! processing, the observation, deletion and retry passes, and the mode
//! controller.

pub mod deletion;
pub mod fetcher;
pub mod observation;
pub mod ports;
pub mod processor;
pub mod progress;
pub mod recompute;
pub mod service;
pub mod transform;

pub use deletion::DeletionHarvester;
pub use fetcher::BatchFetcher;
pub use observation::ObservationHarvester;
pub use ports::{
    CheckpointStore, ObservationDestination, ObservationSource, RecordTransform, SkipRegistry,
};
pub use processor::{RecordOutcome, RecordProcessor};
pub use progress::{CancellationFlag, DeletionProgress, HarvestProgress, PassReport, RunReport};
pub use recompute::MetadataRecomputer;
pub use service::{HarvestPorts, HarvestService};
pub use transform::ChecksumTransform;
