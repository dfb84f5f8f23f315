//! Command line interface
//!
//! Flags keep the camel-case spelling the harvester has always accepted
//! (`--batchSize`, `--maxDate`, ...). Parsing never touches a store: every
//! argument problem surfaces as [`HarvestError::InvalidArgument`] before the
//! run opens anything.

use std::path::PathBuf;

use clap::{CommandFactory, Parser};
use harvester_domain::constants::{DEFAULT_BATCH_FACTOR, DEFAULT_BATCH_SIZE};
use harvester_domain::utils::parse_utc_timestamp;
use harvester_domain::{DataSourceCoords, HarvestError, HarvestMode, ModeFlags, Result, RunOptions};

/// Incremental observation harvester.
///
/// Copies observations from a source store to a destination store,
/// resuming from the checkpoint left by the previous run.
#[derive(Debug, Parser)]
#[command(name = "harvester", version)]
pub struct Cli {
    /// Source store
    #[arg(long, value_name = "server.database.schema")]
    pub source: Option<String>,

    /// Destination store
    #[arg(long, value_name = "server.database.schema")]
    pub destination: Option<String>,

    /// Harvest everything from the beginning, ignoring the checkpoint
    #[arg(long)]
    pub full: bool,

    /// Retry the records in the skip registry instead of harvesting new ones
    #[arg(long)]
    pub skip: bool,

    /// Recompute stored checksums in the destination; needs no source
    #[arg(long)]
    pub recompute: bool,

    /// Destination is new: move past existing deletions without replaying them
    #[arg(long)]
    pub init: bool,

    /// Report what would change without writing anything
    #[arg(long = "dryrun")]
    pub dry_run: bool,

    /// Observations per batch
    #[arg(long = "batchSize", value_name = "N", default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Child rows fetched per observation in one batch
    #[arg(long = "batchFactor", value_name = "N", default_value_t = DEFAULT_BATCH_FACTOR)]
    pub batch_factor: usize,

    /// Ignore source records modified after this UTC time
    #[arg(long = "maxDate", value_name = "yyyy-MM-ddTHH:mm:ss.SSS")]
    pub max_date: Option<String>,

    /// Harvester configuration file (TOML or JSON)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log progress
    #[arg(short, long)]
    pub verbose: bool,

    /// Log every record
    #[arg(short, long)]
    pub debug: bool,
}

/// Logging detail requested on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Verbose,
    Debug,
}

/// A validated harvest request
#[derive(Debug, Clone)]
pub struct HarvestRequest {
    /// `None` in recompute mode, which reads the destination only
    pub source: Option<DataSourceCoords>,
    pub destination: DataSourceCoords,
    pub options: RunOptions,
    pub config: Option<PathBuf>,
}

impl Cli {
    pub fn verbosity(&self) -> Verbosity {
        if self.debug {
            Verbosity::Debug
        } else if self.verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Quiet
        }
    }

    /// Validate the arguments into a request
    ///
    /// # Errors
    /// Returns `InvalidArgument` for conflicting modes, missing or malformed
    /// coordinates, a malformed `--maxDate` and batch sizes below one.
    pub fn into_request(self) -> Result<HarvestRequest> {
        let mode =
            ModeFlags { full: self.full, skip: self.skip, recompute: self.recompute }.resolve()?;

        let destination = parse_coords("--destination", self.destination.as_deref())?;
        let source = if mode == HarvestMode::Recompute {
            if self.source.is_some() {
                tracing::warn!("--source is ignored by --recompute");
            }
            None
        } else {
            Some(parse_coords("--source", self.source.as_deref())?)
        };

        let max_date = self.max_date.as_deref().map(parse_utc_timestamp).transpose()?;
        let options = RunOptions::new(mode)
            .with_dry_run(self.dry_run)
            .with_init(self.init)
            .with_batch_size(self.batch_size)
            .with_batch_factor(self.batch_factor)
            .with_max_date(max_date);
        options.validate()?;

        Ok(HarvestRequest { source, destination, options, config: self.config })
    }

    /// One-line usage summary, printed after argument errors
    pub fn usage() -> String {
        Self::command().render_usage().to_string()
    }
}

fn parse_coords(flag: &str, value: Option<&str>) -> Result<DataSourceCoords> {
    let value = value.ok_or_else(|| HarvestError::InvalidArgument(format!("{flag} is required")))?;
    value.parse().map_err(|err| match err {
        HarvestError::InvalidArgument(reason) => {
            HarvestError::InvalidArgument(format!("{flag}: {reason}"))
        }
        other => other,
    })
}
