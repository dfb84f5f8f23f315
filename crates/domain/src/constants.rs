//! Harvest constants
//!
//! Centralized location for the domain-level constants shared by the engine,
//! the stores and the command line.

// Batch sizing
pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_BATCH_FACTOR: usize = 2500;

// Entity classes tracked by checkpoints and skip entries
pub const OBSERVATION_CLASS: &str = "Observation";
pub const DELETED_OBSERVATION_CLASS: &str = "DeletedObservation";

// Skip registry
pub const MAX_ERROR_MESSAGE_LENGTH: usize = 1024;
pub const SKIP_LIST_PAGE_SIZE: usize = 100;

// Configuration discovery
pub const CONFIG_ENV_VAR: &str = "HARVESTER_CONFIG";
pub const DATA_DIR_ENV_VAR: &str = "HARVESTER_DATA_DIR";
pub const POOL_SIZE_ENV_VAR: &str = "HARVESTER_DB_POOL_SIZE";
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DATABASE_FILE_EXTENSION: &str = "db";
