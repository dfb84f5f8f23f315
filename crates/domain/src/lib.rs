//! # Harvester Domain
//!
//! Business domain types and models for the observation harvester.
//!
//! This crate contains:
//! - Harvest data types (checkpoint cursors, skip entries, candidate records)
//! - Run options and operating modes
//! - Domain error types and Result definitions
//! - Configuration structures and constants
//!
//! ## Architecture
//! - No dependencies on other harvester crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;
pub mod utils;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
