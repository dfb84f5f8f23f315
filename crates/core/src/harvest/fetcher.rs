//! Batch fetcher
//!
//! Reads candidate records from a source in ascending `(last_modified, id)`
//! order. Planes of a batch are read with one bounded query; when that query
//! fills its budget the planes are re-read per observation without a bound,
//! so the batch factor sizes reads but never truncates a record.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use harvester_domain::{
    CandidateRecord, CheckpointCursor, DeletionRecord, ObservationRow, PlaneRow, Result,
    RunOptions,
};
use tracing::{debug, warn};
use uuid::Uuid;

use super::ports::ObservationSource;

/// Fetches bounded, ordered batches of candidates from a source
pub struct BatchFetcher {
    source: Arc<dyn ObservationSource>,
    batch_size: usize,
    batch_factor: usize,
    max_date: Option<DateTime<Utc>>,
}

impl BatchFetcher {
    pub fn new(source: Arc<dyn ObservationSource>, options: &RunOptions) -> Self {
        Self {
            source,
            batch_size: options.batch_size,
            batch_factor: options.batch_factor,
            max_date: options.max_date,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Row budget of one deletion batch
    pub fn deletion_batch_size(&self) -> usize {
        self.batch_size.saturating_mul(self.batch_factor)
    }

    /// Next batch of candidates strictly after `after`
    pub fn fetch(&self, after: Option<&CheckpointCursor>) -> Result<Vec<CandidateRecord>> {
        let observations = self.source.fetch_observations(after, self.batch_size, self.max_date)?;
        if observations.is_empty() {
            return Ok(Vec::new());
        }

        let planes = self.fetch_planes_for(&observations)?;
        debug!(
            observations = observations.len(),
            planes = planes.values().map(Vec::len).sum::<usize>(),
            "Fetched batch"
        );

        Ok(assemble(observations, planes))
    }

    /// A single candidate with all of its planes
    pub fn fetch_one(&self, id: Uuid) -> Result<Option<CandidateRecord>> {
        let Some(observation) = self.source.get_observation(id)? else {
            return Ok(None);
        };
        let planes = self.source.fetch_planes(&[id], None)?;
        Ok(Some(CandidateRecord::new(observation, planes)))
    }

    /// The first source observation strictly after `after`, without planes
    pub fn next_after(&self, after: Option<&CheckpointCursor>) -> Result<Option<ObservationRow>> {
        Ok(self.source.fetch_observations(after, 1, self.max_date)?.into_iter().next())
    }

    /// Next batch of the deletion feed strictly after `after`
    pub fn fetch_deletions(&self, after: Option<&CheckpointCursor>) -> Result<Vec<DeletionRecord>> {
        self.source.fetch_deletions(after, self.deletion_batch_size(), self.max_date)
    }

    fn fetch_planes_for(
        &self,
        observations: &[ObservationRow],
    ) -> Result<HashMap<Uuid, Vec<PlaneRow>>> {
        let ids: Vec<Uuid> = observations.iter().map(|o| o.obs_id).collect();
        let budget = ids.len().saturating_mul(self.batch_factor);

        let planes = self.source.fetch_planes(&ids, Some(budget))?;
        if planes.len() < budget {
            return Ok(group_by_observation(planes));
        }

        warn!(
            budget,
            batch_factor = self.batch_factor,
            "Plane budget exhausted, reading planes per observation"
        );
        let mut grouped = HashMap::with_capacity(ids.len());
        for id in ids {
            grouped.insert(id, self.source.fetch_planes(&[id], None)?);
        }
        Ok(grouped)
    }
}

fn group_by_observation(planes: Vec<PlaneRow>) -> HashMap<Uuid, Vec<PlaneRow>> {
    let mut grouped: HashMap<Uuid, Vec<PlaneRow>> = HashMap::new();
    for plane in planes {
        grouped.entry(plane.obs_id).or_default().push(plane);
    }
    grouped
}

fn assemble(
    observations: Vec<ObservationRow>,
    mut planes: HashMap<Uuid, Vec<PlaneRow>>,
) -> Vec<CandidateRecord> {
    observations
        .into_iter()
        .map(|observation| {
            let children = planes.remove(&observation.obs_id).unwrap_or_default();
            CandidateRecord::new(observation, children)
        })
        .collect()
}
