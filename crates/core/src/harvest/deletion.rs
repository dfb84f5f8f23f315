//! Deletion feed replay
//!
//! Applies the source's `DeletedObservation` feed to the destination before
//! observations are harvested, tracking its own checkpoint.

use std::sync::Arc;

use harvester_domain::constants::{DELETED_OBSERVATION_CLASS, OBSERVATION_CLASS};
use harvester_domain::{DeletionRecord, Result, RunOptions};
use tracing::{debug, info};

use super::fetcher::BatchFetcher;
use super::ports::{CheckpointStore, ObservationDestination, ObservationSource, SkipRegistry};
use super::progress::{CancellationFlag, DeletionProgress, PassReport};

/// Replays source deletions into the destination
pub struct DeletionHarvester {
    source_key: String,
    source: Arc<dyn ObservationSource>,
    fetcher: BatchFetcher,
    destination: Arc<dyn ObservationDestination>,
    checkpoints: Arc<dyn CheckpointStore>,
    skips: Arc<dyn SkipRegistry>,
    options: RunOptions,
    cancel: CancellationFlag,
}

impl DeletionHarvester {
    pub fn new(
        source_key: impl Into<String>,
        source: Arc<dyn ObservationSource>,
        destination: Arc<dyn ObservationDestination>,
        checkpoints: Arc<dyn CheckpointStore>,
        skips: Arc<dyn SkipRegistry>,
        options: RunOptions,
        cancel: CancellationFlag,
    ) -> Self {
        let fetcher = BatchFetcher::new(Arc::clone(&source), &options);
        Self {
            source_key: source_key.into(),
            source,
            fetcher,
            destination,
            checkpoints,
            skips,
            options,
            cancel,
        }
    }

    /// Run the deletion pass
    ///
    /// With `init` set the destination is assumed to be empty: past deletions
    /// are not replayed and the checkpoint moves straight to the newest one.
    ///
    /// # Errors
    /// Every failure here is store-level and aborts the run.
    pub fn run(&self) -> Result<PassReport<DeletionProgress>> {
        if self.options.init {
            return self.initialise();
        }

        let mut report = PassReport::<DeletionProgress>::default();
        let mut after = self.checkpoints.get(&self.source_key, DELETED_OBSERVATION_CLASS)?;
        info!(
            source = %self.source_key,
            checkpoint = ?after.map(|c| c.to_string()),
            "Replaying deletions"
        );

        loop {
            let batch = self.fetcher.fetch_deletions(after.as_ref())?;
            report.progress.found += batch.len();

            for deletion in &batch {
                if self.cancel.is_cancelled() {
                    report.interrupted = true;
                    break;
                }
                self.apply(deletion, &mut report.progress)?;
                after = Some(deletion.cursor());
            }

            if report.interrupted || batch.len() < self.fetcher.deletion_batch_size() {
                break;
            }
        }

        info!(
            source = %self.source_key,
            found = report.progress.found,
            deleted = report.progress.deleted,
            retained = report.progress.retained,
            interrupted = report.interrupted,
            dry_run = self.options.dry_run,
            "Deletion replay finished"
        );
        Ok(report)
    }

    fn initialise(&self) -> Result<PassReport<DeletionProgress>> {
        let latest = self.source.latest_deletion(self.options.max_date)?;
        let Some(latest) = latest else {
            info!(source = %self.source_key, "No deletions at source, nothing to initialise");
            return Ok(PassReport::default());
        };

        let current = self.checkpoints.get(&self.source_key, DELETED_OBSERVATION_CLASS)?;
        if current.is_some_and(|c| c >= latest.cursor()) {
            debug!("Deletion checkpoint already at or past the newest deletion");
        } else if !self.options.dry_run {
            self.checkpoints.advance(&self.source_key, DELETED_OBSERVATION_CLASS, latest.cursor())?;
        }
        info!(checkpoint = %latest.cursor(), "Deletion checkpoint initialised");
        Ok(PassReport::default())
    }

    fn apply(&self, deletion: &DeletionRecord, progress: &mut DeletionProgress) -> Result<()> {
        if self.options.dry_run {
            let stored = self.destination.stored_last_modified(deletion.id)?;
            if stored.is_some_and(|modified| modified <= deletion.last_modified) {
                progress.deleted += 1;
            } else {
                progress.retained += 1;
            }
            return Ok(());
        }

        if self.destination.delete(deletion.id, deletion.last_modified)? {
            debug!(obs_id = %deletion.id, "Observation deleted");
            progress.deleted += 1;
        } else {
            debug!(obs_id = %deletion.id, "Deletion ignored, destination copy absent or newer");
            progress.retained += 1;
        }

        if let Some(entry) = self.skips.get(&self.source_key, OBSERVATION_CLASS, deletion.id)? {
            self.skips.delete(&entry)?;
        }
        self.checkpoints.advance(&self.source_key, DELETED_OBSERVATION_CLASS, deletion.cursor())
    }
}
