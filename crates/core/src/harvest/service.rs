//! Harvest service - selects and runs the passes of one harvest

use std::sync::Arc;

use harvester_domain::{HarvestMode, Result, RunOptions};
use tracing::{info, instrument};

use super::deletion::DeletionHarvester;
use super::fetcher::BatchFetcher;
use super::observation::ObservationHarvester;
use super::ports::{
    CheckpointStore, ObservationDestination, ObservationSource, RecordTransform, SkipRegistry,
};
use super::processor::RecordProcessor;
use super::progress::{CancellationFlag, RunReport};
use super::recompute::MetadataRecomputer;

/// Stores and collaborators a harvest runs against
///
/// In recompute mode `source` must read the destination store.
#[derive(Clone)]
pub struct HarvestPorts {
    pub source: Arc<dyn ObservationSource>,
    pub destination: Arc<dyn ObservationDestination>,
    pub checkpoints: Arc<dyn CheckpointStore>,
    pub skips: Arc<dyn SkipRegistry>,
    pub transform: Arc<dyn RecordTransform>,
}

/// Mode controller for a single harvest run
pub struct HarvestService {
    source_key: String,
    ports: HarvestPorts,
    options: RunOptions,
    cancel: CancellationFlag,
}

impl HarvestService {
    /// Create a service harvesting the store identified by `source_key`
    pub fn new(
        source_key: impl Into<String>,
        ports: HarvestPorts,
        options: RunOptions,
        cancel: CancellationFlag,
    ) -> Self {
        Self { source_key: source_key.into(), ports, options, cancel }
    }

    /// Run every pass the mode calls for
    ///
    /// | mode | passes |
    /// |---|---|
    /// | incremental, full | deletions, then observations |
    /// | skip | retry of the skip registry |
    /// | recompute | destination checksum recompute |
    ///
    /// # Errors
    /// Returns `InvalidArgument` for invalid options and any store-level
    /// failure of a pass. Record failures are reported in the
    /// [`RunReport`], not as errors.
    #[instrument(skip(self), fields(source = %self.source_key, mode = %self.options.mode))]
    pub fn run(&self) -> Result<RunReport> {
        self.options.validate()?;
        let mut report = RunReport::new(self.options.mode, self.options.dry_run);
        info!(
            dry_run = self.options.dry_run,
            init = self.options.init,
            batch_size = self.options.batch_size,
            batch_factor = self.options.batch_factor,
            max_date = ?self.options.max_date,
            "Harvest starting"
        );

        match self.options.mode {
            HarvestMode::Recompute => {
                let pass = self.recomputer().run()?;
                report.observations = pass.progress;
                report.interrupted = pass.interrupted;
            }
            HarvestMode::SkipRetry => {
                let pass = self.observation_harvester().retry_skipped()?;
                report.observations = pass.progress;
                report.interrupted = pass.interrupted;
            }
            HarvestMode::Incremental | HarvestMode::Full => {
                let deletions = self.deletion_harvester().run()?;
                report.deletions = deletions.progress;
                report.interrupted = deletions.interrupted;

                if !report.interrupted {
                    let pass = self.observation_harvester().harvest()?;
                    report.observations = pass.progress;
                    report.interrupted = pass.interrupted;
                }
            }
        }

        info!(interrupted = report.interrupted, "Harvest finished");
        Ok(report)
    }

    fn observation_harvester(&self) -> ObservationHarvester {
        ObservationHarvester::new(
            self.source_key.clone(),
            BatchFetcher::new(Arc::clone(&self.ports.source), &self.options),
            RecordProcessor::new(
                Arc::clone(&self.ports.transform),
                Arc::clone(&self.ports.destination),
                self.options.dry_run,
            ),
            Arc::clone(&self.ports.checkpoints),
            Arc::clone(&self.ports.skips),
            self.options.clone(),
            self.cancel.clone(),
        )
    }

    fn deletion_harvester(&self) -> DeletionHarvester {
        DeletionHarvester::new(
            self.source_key.clone(),
            Arc::clone(&self.ports.source),
            Arc::clone(&self.ports.destination),
            Arc::clone(&self.ports.checkpoints),
            Arc::clone(&self.ports.skips),
            self.options.clone(),
            self.cancel.clone(),
        )
    }

    fn recomputer(&self) -> MetadataRecomputer {
        MetadataRecomputer::new(
            BatchFetcher::new(Arc::clone(&self.ports.source), &self.options),
            Arc::clone(&self.ports.transform),
            Arc::clone(&self.ports.destination),
            &self.options,
            self.cancel.clone(),
        )
    }
}
