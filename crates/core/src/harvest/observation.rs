//! Observation harvest loop and the skip-retry pass
//!
//! Records are committed in ascending `(last_modified, id)` order and the
//! checkpoint follows each commit. After the first record-level failure of a
//! run the checkpoint is held: later records are still committed, but the
//! checkpoint stays at the last record committed in strict order, so the
//! failed record is read again by the next incremental run.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use harvester_domain::constants::{OBSERVATION_CLASS, SKIP_LIST_PAGE_SIZE};
use harvester_domain::{
    CandidateRecord, CheckpointCursor, HarvestError, HarvestMode, Result, RunOptions, SkipEntry,
};
use tracing::{debug, info, warn};

use super::fetcher::BatchFetcher;
use super::ports::{CheckpointStore, SkipRegistry};
use super::processor::{RecordOutcome, RecordProcessor};
use super::progress::{CancellationFlag, HarvestProgress, PassReport};

/// Harvests observations from a source into the destination
pub struct ObservationHarvester {
    source_key: String,
    fetcher: BatchFetcher,
    processor: RecordProcessor,
    checkpoints: Arc<dyn CheckpointStore>,
    skips: Arc<dyn SkipRegistry>,
    options: RunOptions,
    cancel: CancellationFlag,
}

/// Checkpoint bookkeeping of one harvest pass
struct CheckpointTracker {
    /// Cursor of the last record read, used to page through the source
    read: Option<CheckpointCursor>,
    /// Set once a record failed; the stored checkpoint no longer moves
    held: bool,
}

impl ObservationHarvester {
    pub fn new(
        source_key: impl Into<String>,
        fetcher: BatchFetcher,
        processor: RecordProcessor,
        checkpoints: Arc<dyn CheckpointStore>,
        skips: Arc<dyn SkipRegistry>,
        options: RunOptions,
        cancel: CancellationFlag,
    ) -> Self {
        Self {
            source_key: source_key.into(),
            fetcher,
            processor,
            checkpoints,
            skips,
            options,
            cancel,
        }
    }

    /// Run the observation pass in incremental or full mode
    ///
    /// # Errors
    /// Any store-level failure aborts the pass; record failures do not.
    pub fn harvest(&self) -> Result<PassReport<HarvestProgress>> {
        let start = self.starting_cursor()?;
        info!(
            source = %self.source_key,
            checkpoint = ?start.map(|c| c.to_string()),
            "Starting observation harvest"
        );

        let mut report = PassReport::<HarvestProgress>::default();
        let mut tracker = CheckpointTracker { read: start, held: false };

        loop {
            if self.options.max_batches.is_some_and(|max| report.progress.batches >= max) {
                debug!(batches = report.progress.batches, "Batch limit reached");
                break;
            }
            if self.cancel.is_cancelled() {
                report.interrupted = true;
                break;
            }

            let batch = self.fetcher.fetch(tracker.read.as_ref())?;
            report.progress.batches += 1;
            report.progress.found += batch.len();
            debug!(batch = report.progress.batches, records = batch.len(), "Processing batch");

            for record in &batch {
                if self.cancel.is_cancelled() {
                    report.interrupted = true;
                    break;
                }
                self.harvest_record(record, &mut tracker, &mut report.progress)?;
            }

            if report.interrupted || batch.len() < self.fetcher.batch_size() {
                break;
            }
        }

        self.log_summary("Observation harvest", &report);
        Ok(report)
    }

    /// Retry every quarantined record of this source once
    ///
    /// Entries re-stamped during the pass are not retried again. The
    /// checkpoint advances to a retried record only when that record is the
    /// first source record after the current checkpoint.
    ///
    /// Pages restart at the stamp of the last entry seen, so entries that
    /// stay in the registry (dry runs, shared stamps) come back; a full page
    /// with nothing new widens the next page instead of ending the pass.
    ///
    /// # Errors
    /// Any store-level failure aborts the pass.
    pub fn retry_skipped(&self) -> Result<PassReport<HarvestProgress>> {
        let started = Utc::now();
        let mut limit = self.fetcher.batch_size().min(SKIP_LIST_PAGE_SIZE).max(1);
        info!(source = %self.source_key, "Retrying skipped records");

        let mut report = PassReport::<HarvestProgress>::default();
        let mut seen = HashSet::new();
        let mut since = None;

        'pages: loop {
            let page = self.skips.list(&self.source_key, OBSERVATION_CLASS, since, limit)?;
            report.progress.batches += 1;
            let mut fresh = 0;

            for entry in &page {
                if entry.last_modified.is_some_and(|stamped| stamped > started) {
                    break 'pages;
                }
                since = entry.last_modified.or(since);
                if !entry.id.is_some_and(|id| seen.insert(id)) {
                    continue;
                }
                if self.cancel.is_cancelled() {
                    report.interrupted = true;
                    break 'pages;
                }
                fresh += 1;
                report.progress.found += 1;
                self.retry_entry(entry, &mut report.progress)?;
            }

            if page.len() < limit {
                break;
            }
            if fresh == 0 {
                limit = limit.saturating_mul(2);
                debug!(limit, "Skip page held only retried entries, widening");
            }
        }

        self.log_summary("Skip retry", &report);
        Ok(report)
    }

    fn starting_cursor(&self) -> Result<Option<CheckpointCursor>> {
        if self.options.mode == HarvestMode::Full {
            if !self.options.dry_run {
                self.checkpoints.reset(&self.source_key, OBSERVATION_CLASS)?;
                info!(source = %self.source_key, "Observation checkpoint reset for full harvest");
            }
            return Ok(None);
        }
        self.checkpoints.get(&self.source_key, OBSERVATION_CLASS)
    }

    fn harvest_record(
        &self,
        record: &CandidateRecord,
        tracker: &mut CheckpointTracker,
        progress: &mut HarvestProgress,
    ) -> Result<()> {
        let existing = self.skips.get(&self.source_key, OBSERVATION_CLASS, record.id())?;

        match self.processor.process(record) {
            Ok(outcome) => {
                count_outcome(outcome, progress);
                if !self.options.dry_run {
                    if !tracker.held {
                        self.checkpoints.advance(
                            &self.source_key,
                            OBSERVATION_CLASS,
                            record.cursor(),
                        )?;
                    }
                    if let Some(entry) = existing {
                        self.skips.delete(&entry)?;
                        progress.resolved += 1;
                    }
                }
            }
            Err(err) if err.is_record_level() => {
                progress.failed += 1;
                warn!(obs_id = %record.id(), error = %err, "Record failed, adding to skip registry");
                if !tracker.held {
                    tracker.held = true;
                    info!(
                        held_at = ?tracker.read.map(|c| c.to_string()),
                        "Checkpoint held below failed record"
                    );
                }
                if !self.options.dry_run {
                    self.quarantine(record, existing, &err)?;
                }
            }
            Err(err) => return Err(err),
        }

        tracker.read = Some(record.cursor());
        Ok(())
    }

    fn retry_entry(&self, entry: &SkipEntry, progress: &mut HarvestProgress) -> Result<()> {
        let Some(record) = self.fetcher.fetch_one(entry.skip_id)? else {
            info!(obs_id = %entry.skip_id, "Skipped record no longer at source, clearing entry");
            if !self.options.dry_run {
                self.skips.delete(entry)?;
            }
            progress.resolved += 1;
            return Ok(());
        };

        let checkpoint = self.checkpoints.get(&self.source_key, OBSERVATION_CLASS)?;
        let successor = self.fetcher.next_after(checkpoint.as_ref())?;

        match self.processor.process(&record) {
            Ok(outcome) => {
                count_outcome(outcome, progress);
                progress.resolved += 1;
                if self.options.dry_run {
                    return Ok(());
                }
                self.skips.delete(entry)?;
                if successor.is_some_and(|next| next.obs_id == record.id()) {
                    self.checkpoints.advance(&self.source_key, OBSERVATION_CLASS, record.cursor())?;
                    info!(checkpoint = %record.cursor(), "Checkpoint released by retried record");
                }
            }
            Err(err) if err.is_record_level() => {
                progress.failed += 1;
                warn!(obs_id = %record.id(), error = %err, "Skipped record failed again");
                if !self.options.dry_run {
                    self.skips.put(&entry.clone().with_error(err.to_string()))?;
                }
            }
            Err(err) => return Err(err),
        }
        Ok(())
    }

    fn quarantine(
        &self,
        record: &CandidateRecord,
        existing: Option<SkipEntry>,
        err: &HarvestError,
    ) -> Result<()> {
        let entry = match existing {
            Some(entry) => entry.with_error(err.to_string()),
            None => SkipEntry::new(&self.source_key, OBSERVATION_CLASS, record.id(), err.to_string()),
        };
        self.skips.put(&entry)?;
        Ok(())
    }

    fn log_summary(&self, pass: &str, report: &PassReport<HarvestProgress>) {
        let progress = &report.progress;
        info!(
            source = %self.source_key,
            found = progress.found,
            written = progress.written,
            unchanged = progress.unchanged,
            failed = progress.failed,
            resolved = progress.resolved,
            interrupted = report.interrupted,
            dry_run = self.options.dry_run,
            "{pass} finished"
        );
    }
}

fn count_outcome(outcome: RecordOutcome, progress: &mut HarvestProgress) {
    match outcome {
        RecordOutcome::Written | RecordOutcome::Simulated => progress.written += 1,
        RecordOutcome::Unchanged => progress.unchanged += 1,
    }
}
