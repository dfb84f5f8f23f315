//! # Harvester App
//!
//! Command line application layer - argument handling and the main entry
//! point.
//!
//! This crate contains:
//! - The `harvester` command line interface
//! - Application context (dependency injection)
//! - Logging setup and exit status mapping
//!
//! ## Architecture
//! - Depends on `domain`, `core`, and `infra`
//! - Wires the SQLite stores into the harvest service

pub mod cli;
pub mod context;
pub mod utils;

use anyhow::Context;
use harvester_core::{CancellationFlag, RunReport};

// Re-export for convenience
pub use cli::{Cli, HarvestRequest, Verbosity};
pub use context::AppContext;

/// Run completed (also used for `--help`)
pub const EXIT_SUCCESS: u8 = 0;
/// Invalid or missing arguments
pub const EXIT_USAGE: u8 = 1;
/// Run stopped by a termination signal
pub const EXIT_INTERRUPTED: u8 = 2;
/// Any other failure
pub const EXIT_FAILURE: u8 = 255;

/// Open the stores of `request` and run the harvest
///
/// # Errors
/// Fails when the configuration or a store cannot be opened, or when the
/// run hits a store-level error.
pub fn run_harvest(request: HarvestRequest, cancel: CancellationFlag) -> anyhow::Result<RunReport> {
    let destination = request.destination.to_string();
    let context = AppContext::new(request)
        .with_context(|| format!("failed to initialise harvest into {destination}"))?;

    let result = context.service(cancel).run();
    context.stores.log_metrics();

    let report = result.with_context(|| format!("harvest into {destination} failed"))?;
    utils::logging::log_run_report(&report);
    Ok(report)
}

/// Exit status of a run that returned a report
pub fn exit_status(report: &RunReport) -> u8 {
    if report.interrupted {
        EXIT_INTERRUPTED
    } else {
        EXIT_SUCCESS
    }
}
