//! Database implementations

pub mod columns;
pub mod harvest_skip_repository;
pub mod harvest_state_repository;
pub mod manager;
pub mod observation_repository;

pub use harvest_skip_repository::*;
pub use harvest_state_repository::*;
pub use manager::*;
pub use observation_repository::*;
