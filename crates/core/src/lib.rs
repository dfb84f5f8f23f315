//! # Harvester Core
//!
//! Pure harvest logic - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port/adapter interfaces (traits) for the harvest stores
//! - The synchronization engine and its operating modes
//!
//! ## Architecture Principles
//! - Only depends on `harvester-domain`
//! - No database or platform code
//! - All external dependencies via traits
//! - Pure, testable business logic

pub mod harvest;

// Re-export specific items to avoid ambiguity
pub use harvest::ports::{
    CheckpointStore, ObservationDestination, ObservationSource, RecordTransform, SkipRegistry,
};
pub use harvest::{CancellationFlag, ChecksumTransform, HarvestPorts, HarvestService, RunReport};
