//! Configuration management

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants::{DATABASE_FILE_EXTENSION, DEFAULT_DATA_DIR};
use crate::types::DataSourceCoords;

/// Harvester configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvesterConfig {
    /// Directory holding one sub-directory per server not listed in `servers`
    pub data_dir: PathBuf,
    /// Explicit server locations, keyed by server name
    pub servers: BTreeMap<String, ServerConfig>,
    pub database: DatabaseConfig,
}

/// Location of one server's database files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub path: PathBuf,
}

/// Database connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub pool_size: u32,
    pub connection_timeout_secs: u64,
    pub busy_timeout_ms: u64,
    pub enable_wal: bool,
}

impl Default for HarvesterConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            servers: BTreeMap::new(),
            database: DatabaseConfig::default(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { pool_size: 4, connection_timeout_secs: 5, busy_timeout_ms: 5000, enable_wal: true }
    }
}

impl HarvesterConfig {
    /// Directory holding the databases of `server`
    pub fn server_dir(&self, server: &str) -> PathBuf {
        self.servers
            .get(server)
            .map_or_else(|| self.data_dir.join(server), |configured| configured.path.clone())
    }

    /// Database file addressed by `coords`
    pub fn database_path(&self, coords: &DataSourceCoords) -> PathBuf {
        self.server_dir(&coords.server)
            .join(&coords.database)
            .with_extension(DATABASE_FILE_EXTENSION)
    }
}
