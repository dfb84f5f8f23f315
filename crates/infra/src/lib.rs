//! # Harvester Infrastructure
//!
//! Infrastructure implementations of the harvest engine's ports.
//!
//! This crate contains:
//! - SQLite repositories for observations, checkpoints and skip entries
//! - The per-store connection manager and schema
//! - Configuration loading
//! - Wiring of a source and a destination into [`HarvestPorts`]
//!
//! ## Architecture
//! - Implements traits defined in `harvester-core`
//! - Depends on `harvester-common` and `harvester-domain`
//! - Contains all "impure" code (file system, SQLite)

pub mod config;
pub mod database;
pub mod errors;
pub mod stores;

// Re-export commonly used items
pub use database::*;
pub use errors::*;
pub use stores::*;

#[doc(no_inline)]
pub use harvester_core::HarvestPorts;
