//! Tracing setup and structured run logging

use harvester_core::RunReport;
use harvester_domain::HarvestError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::Verbosity;

/// Crates whose level follows `-v` and `-d`
const HARVESTER_TARGETS: [&str; 4] =
    ["harvester_app", "harvester_core", "harvester_infra", "harvester_common"];

/// Filter directive for the requested verbosity
///
/// Everything logs at `warn`; the harvester crates are raised to `info`
/// with `-v` and to `debug` with `-d`.
pub fn filter_directive(verbosity: Verbosity) -> String {
    let level = match verbosity {
        Verbosity::Quiet => return "warn".to_string(),
        Verbosity::Verbose => "info",
        Verbosity::Debug => "debug",
    };
    let targets: Vec<String> =
        HARVESTER_TARGETS.iter().map(|target| format!("{target}={level}")).collect();
    format!("warn,{}", targets.join(","))
}

/// Install the global subscriber, writing to stderr
///
/// `RUST_LOG` overrides the command line verbosity when set.
pub fn init_tracing(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(verbosity)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbosity == Verbosity::Debug)
        .try_init();
}

/// Stable label of an error, used in the final log line
pub fn error_label(error: &HarvestError) -> &'static str {
    match error {
        HarvestError::InvalidArgument(_) => "invalid_argument",
        HarvestError::OrderingViolation { .. } => "ordering_violation",
        HarvestError::Record { .. } => "record",
        HarvestError::StoreUnavailable(_) => "store_unavailable",
        HarvestError::Database(_) => "database",
        HarvestError::Config(_) => "config",
        HarvestError::Internal(_) => "internal",
    }
}

/// Log the counters of a finished run
pub fn log_run_report(report: &RunReport) {
    let summary = serde_json::to_string(report).unwrap_or_default();
    if report.observations.is_clean() {
        info!(mode = %report.mode, %summary, "Harvest finished");
    } else {
        warn!(
            mode = %report.mode,
            failed = report.observations.failed,
            %summary,
            "Harvest finished with quarantined records"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_logs_warnings_only() {
        assert_eq!(filter_directive(Verbosity::Quiet), "warn");
    }

    #[test]
    fn verbose_raises_harvester_crates_only() {
        let directive = filter_directive(Verbosity::Verbose);
        assert!(directive.starts_with("warn,"));
        assert!(directive.contains("harvester_core=info"));
        assert!(directive.contains("harvester_infra=info"));
        assert!(EnvFilter::try_new(&directive).is_ok());
    }

    #[test]
    fn debug_directive_parses() {
        let directive = filter_directive(Verbosity::Debug);
        assert!(directive.contains("harvester_app=debug"));
        assert!(EnvFilter::try_new(&directive).is_ok());
    }

    #[test]
    fn error_labels_are_stable() {
        assert_eq!(error_label(&HarvestError::StoreUnavailable("x".into())), "store_unavailable");
        assert_eq!(error_label(&HarvestError::Config("x".into())), "config");
    }
}
