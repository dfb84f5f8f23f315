//! Harvester - incremental observation harvester
//!
//! Main entry point for the command line binary.

use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::Parser;
use harvester_app::utils::logging::{error_label, init_tracing};
use harvester_app::{exit_status, run_harvest, Cli, EXIT_FAILURE, EXIT_SUCCESS, EXIT_USAGE};
use harvester_core::CancellationFlag;
use harvester_domain::HarvestError;
use tracing::{debug, info, warn};

fn main() -> ExitCode {
    let dotenv = dotenvy::dotenv();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::from(EXIT_SUCCESS),
                _ => ExitCode::from(EXIT_USAGE),
            };
        }
    };

    init_tracing(cli.verbosity());
    match dotenv {
        Ok(path) => debug!(path = %path.display(), "Loaded .env"),
        Err(e) => debug!("No .env loaded: {e}"),
    }

    let request = match cli.into_request() {
        Ok(request) => request,
        Err(err) => {
            eprintln!("harvester: {err}");
            eprintln!("{}", Cli::usage());
            return ExitCode::from(EXIT_USAGE);
        }
    };

    let cancel = CancellationFlag::new();
    let signalled = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || signalled.cancel()) {
        warn!("Could not install termination handler: {e}");
    }

    match run_harvest(request, cancel) {
        Ok(report) => {
            if report.interrupted {
                info!("Harvest interrupted, checkpoint kept at the last committed record");
            }
            ExitCode::from(exit_status(&report))
        }
        Err(err) => {
            let kind = err.downcast_ref::<HarvestError>().map_or("unknown", error_label);
            debug!(kind, "Harvest failed");
            eprintln!("harvester: {err:#}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}
