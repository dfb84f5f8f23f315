//! Configuration loader
//!
//! Loads the harvester configuration from a file, then applies environment
//! overrides.
//!
//! ## Loading Strategy
//! 1. An explicit path (the `--config` flag)
//! 2. The path named by `HARVESTER_CONFIG`
//! 3. The first existing probe path in the working directory
//! 4. Built-in defaults when no file is found
//!
//! ## Environment Variables
//! - `HARVESTER_CONFIG`: Configuration file path
//! - `HARVESTER_DATA_DIR`: Directory holding one sub-directory per server
//! - `HARVESTER_DB_POOL_SIZE`: Connection pool size per store
//!
//! ## File Locations
//! The loader probes `./harvester.toml`, `./harvester.json`, `./config.toml`
//! and `./config.json`, in that order.

use std::path::{Path, PathBuf};

use harvester_domain::constants::{CONFIG_ENV_VAR, DATA_DIR_ENV_VAR, POOL_SIZE_ENV_VAR};
use harvester_domain::{HarvestError, HarvesterConfig, Result};

use crate::errors::InfraError;

const PROBE_FILE_NAMES: [&str; 4] =
    ["harvester.toml", "harvester.json", "config.toml", "config.json"];

/// Load configuration with the fallback strategy described above
///
/// # Errors
/// Returns `HarvestError::Config` if:
/// - An explicitly named file does not exist
/// - File format is invalid
/// - An environment override has an invalid value
pub fn load(explicit: Option<&Path>) -> Result<HarvesterConfig> {
    let named = explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from));

    let config = match named {
        Some(path) => load_from_file(&path)?,
        None => match std::env::current_dir().ok().and_then(|cwd| probe_config_paths(&cwd)) {
            Some(path) => load_from_file(&path)?,
            None => {
                tracing::debug!("No configuration file found, using defaults");
                HarvesterConfig::default()
            }
        },
    };

    apply_env_overrides(config)
}

/// Load configuration from a file
///
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `HarvestError::Config` if the file is missing, unreadable or
/// malformed.
pub fn load_from_file(path: &Path) -> Result<HarvesterConfig> {
    if !path.exists() {
        return Err(HarvestError::Config(format!("Config file not found: {}", path.display())));
    }

    tracing::info!(path = %path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(path)
        .map_err(|e| HarvestError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<HarvesterConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => Ok(toml::from_str(contents).map_err(InfraError::from)?),
        "json" => Ok(serde_json::from_str(contents).map_err(InfraError::from)?),
        _ => Err(HarvestError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// First existing configuration file in `dir`
pub fn probe_config_paths(dir: &Path) -> Option<PathBuf> {
    PROBE_FILE_NAMES.iter().map(|name| dir.join(name)).find(|path| path.is_file())
}

fn apply_env_overrides(mut config: HarvesterConfig) -> Result<HarvesterConfig> {
    if let Some(data_dir) = std::env::var_os(DATA_DIR_ENV_VAR).filter(|v| !v.is_empty()) {
        config.data_dir = PathBuf::from(data_dir);
    }

    if let Ok(pool_size) = std::env::var(POOL_SIZE_ENV_VAR) {
        config.database.pool_size = pool_size.trim().parse::<u32>().map_err(|e| {
            HarvestError::Config(format!("Invalid {POOL_SIZE_ENV_VAR} {pool_size:?}: {e}"))
        })?;
    }

    Ok(config)
}
