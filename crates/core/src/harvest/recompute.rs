//! Destination-only metadata recomputation

use std::sync::Arc;

use harvester_domain::{CheckpointCursor, Result, RunOptions};
use tracing::{debug, info, warn};

use super::fetcher::BatchFetcher;
use super::ports::{ObservationDestination, RecordTransform};
use super::progress::{CancellationFlag, HarvestProgress, PassReport};

/// Re-derives the checksum of every destination observation
///
/// Pages through the destination with its own keyset cursor; no checkpoint
/// or skip entry is read or written.
pub struct MetadataRecomputer {
    fetcher: BatchFetcher,
    transform: Arc<dyn RecordTransform>,
    destination: Arc<dyn ObservationDestination>,
    dry_run: bool,
    max_batches: Option<usize>,
    cancel: CancellationFlag,
}

impl MetadataRecomputer {
    /// `fetcher` must read from the same store `destination` writes to
    pub fn new(
        fetcher: BatchFetcher,
        transform: Arc<dyn RecordTransform>,
        destination: Arc<dyn ObservationDestination>,
        options: &RunOptions,
        cancel: CancellationFlag,
    ) -> Self {
        Self {
            fetcher,
            transform,
            destination,
            dry_run: options.dry_run,
            max_batches: options.max_batches,
            cancel,
        }
    }

    /// Recompute checksums page by page
    ///
    /// # Errors
    /// Store-level failures abort the pass; transform failures are counted.
    pub fn run(&self) -> Result<PassReport<HarvestProgress>> {
        let mut report = PassReport::<HarvestProgress>::default();
        let mut after: Option<CheckpointCursor> = None;
        info!(dry_run = self.dry_run, "Recomputing destination metadata");

        loop {
            if self.max_batches.is_some_and(|max| report.progress.batches >= max) {
                break;
            }
            let page = self.fetcher.fetch(after.as_ref())?;
            report.progress.batches += 1;
            report.progress.found += page.len();

            for record in &page {
                if self.cancel.is_cancelled() {
                    report.interrupted = true;
                    break;
                }
                after = Some(record.cursor());

                let transformed = match self.transform.transform(record) {
                    Ok(transformed) => transformed,
                    Err(err) if err.is_record_level() => {
                        warn!(obs_id = %record.id(), error = %err, "Cannot recompute metadata");
                        report.progress.failed += 1;
                        continue;
                    }
                    Err(err) => return Err(err),
                };

                if record.observation.meta_checksum.as_deref() == Some(transformed.checksum.as_str())
                {
                    report.progress.unchanged += 1;
                    continue;
                }
                if !self.dry_run {
                    self.destination.update_checksum(record.id(), &transformed.checksum)?;
                }
                debug!(obs_id = %record.id(), checksum = %transformed.checksum, "Checksum updated");
                report.progress.written += 1;
            }

            if report.interrupted || page.len() < self.fetcher.batch_size() {
                break;
            }
        }

        info!(
            found = report.progress.found,
            updated = report.progress.written,
            unchanged = report.progress.unchanged,
            failed = report.progress.failed,
            interrupted = report.interrupted,
            "Metadata recompute finished"
        );
        Ok(report)
    }
}
