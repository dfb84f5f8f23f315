//! In-memory implementations of the harvest ports
//!
//! Each store mirrors the contract of its SQLite counterpart: ordered reads,
//! checkpoint ordering checks, surrogate keys for skip entries.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use harvester_core::{CheckpointStore, ObservationDestination, ObservationSource, SkipRegistry};
use harvester_domain::{
    CheckpointCursor, DeletionRecord, HarvestError, ObservationRow, PlaneRow, Result, SkipEntry,
    TransformedRecord,
};
use parking_lot::Mutex;
use uuid::Uuid;

/// Checkpoint store keyed by `(source, entity class)`
#[derive(Default)]
pub struct MemoryCheckpoints {
    cursors: Mutex<HashMap<(String, String), CheckpointCursor>>,
    writes: AtomicUsize,
    unavailable: Mutex<bool>,
    stale_reads: Mutex<bool>,
}

impl MemoryCheckpoints {
    pub fn current(&self, source: &str, entity_class: &str) -> Option<CheckpointCursor> {
        self.cursors.lock().get(&(source.to_string(), entity_class.to_string())).copied()
    }

    pub fn set(&self, source: &str, entity_class: &str, cursor: CheckpointCursor) {
        self.cursors.lock().insert((source.to_string(), entity_class.to_string()), cursor);
    }

    /// Number of writes (advances and resets) seen so far
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Make every subsequent advance fail as if the store went away
    pub fn go_offline(&self) {
        *self.unavailable.lock() = true;
    }

    /// Answer reads as if no cursor existed, as a reader racing another
    /// writer would see it
    pub fn serve_stale_reads(&self) {
        *self.stale_reads.lock() = true;
    }
}

impl CheckpointStore for MemoryCheckpoints {
    fn get(&self, source: &str, entity_class: &str) -> Result<Option<CheckpointCursor>> {
        if *self.stale_reads.lock() {
            return Ok(None);
        }
        Ok(self.current(source, entity_class))
    }

    fn advance(&self, source: &str, entity_class: &str, cursor: CheckpointCursor) -> Result<()> {
        if *self.unavailable.lock() {
            return Err(HarvestError::StoreUnavailable("checkpoint store offline".to_string()));
        }

        let mut cursors = self.cursors.lock();
        let key = (source.to_string(), entity_class.to_string());
        match cursors.get(&key) {
            Some(current) if *current > cursor => {
                return Err(HarvestError::OrderingViolation {
                    source_key: source.to_string(),
                    entity_class: entity_class.to_string(),
                    current: *current,
                    proposed: cursor,
                });
            }
            Some(current) if *current == cursor => return Ok(()),
            _ => {}
        }
        cursors.insert(key, cursor);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn reset(&self, source: &str, entity_class: &str) -> Result<()> {
        self.cursors.lock().remove(&(source.to_string(), entity_class.to_string()));
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Skip registry holding entries in insertion order
#[derive(Default)]
pub struct MemorySkips {
    entries: Mutex<Vec<SkipEntry>>,
    writes: AtomicUsize,
}

impl MemorySkips {
    pub fn all(&self) -> Vec<SkipEntry> {
        self.entries.lock().clone()
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl SkipRegistry for MemorySkips {
    fn get(&self, source: &str, entity_class: &str, skip_id: Uuid) -> Result<Option<SkipEntry>> {
        Ok(self
            .entries
            .lock()
            .iter()
            .find(|e| e.source == source && e.entity_class == entity_class && e.skip_id == skip_id)
            .cloned())
    }

    fn list(
        &self,
        source: &str,
        entity_class: &str,
        since: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<SkipEntry>> {
        let mut matching: Vec<SkipEntry> = self
            .entries
            .lock()
            .iter()
            .filter(|e| e.source == source && e.entity_class == entity_class)
            .filter(|e| since.map_or(true, |since| e.last_modified.is_some_and(|lm| lm >= since)))
            .cloned()
            .collect();
        matching.sort_by_key(|e| (e.last_modified, e.id));
        matching.truncate(limit);
        Ok(matching)
    }

    fn put(&self, entry: &SkipEntry) -> Result<SkipEntry> {
        let mut stored = entry.clone();
        stored.last_modified = Some(Utc::now());
        let mut entries = self.entries.lock();

        match entry.id {
            None => {
                stored.id = Some(Uuid::now_v7());
                entries.push(stored.clone());
            }
            Some(id) => {
                let slot = entries
                    .iter_mut()
                    .find(|e| e.id == Some(id))
                    .ok_or_else(|| HarvestError::Database(format!("no skip entry {id}")))?;
                *slot = stored.clone();
            }
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(stored)
    }

    fn delete(&self, entry: &SkipEntry) -> Result<()> {
        let Some(id) = entry.id else {
            return Err(HarvestError::InvalidArgument("skip entry has no id".to_string()));
        };
        self.entries.lock().retain(|e| e.id != Some(id));
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Observation store usable as source and destination
#[derive(Default)]
pub struct MemoryStore {
    observations: Mutex<BTreeMap<Uuid, ObservationRow>>,
    planes: Mutex<Vec<PlaneRow>>,
    deletions: Mutex<Vec<DeletionRecord>>,
    failing_writes: Mutex<HashSet<Uuid>>,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn insert(&self, observation: ObservationRow, planes: Vec<PlaneRow>) {
        let id = observation.obs_id;
        self.observations.lock().insert(id, observation);
        let mut stored = self.planes.lock();
        stored.retain(|p| p.obs_id != id);
        stored.extend(planes);
    }

    pub fn remove(&self, id: Uuid) {
        self.observations.lock().remove(&id);
        self.planes.lock().retain(|p| p.obs_id != id);
    }

    pub fn record_deletion(&self, deletion: DeletionRecord) {
        self.deletions.lock().push(deletion);
    }

    pub fn fail_writes_for(&self, id: Uuid) {
        self.failing_writes.lock().insert(id);
    }

    pub fn heal(&self) {
        self.failing_writes.lock().clear();
    }

    pub fn observation(&self, id: Uuid) -> Option<ObservationRow> {
        self.observations.lock().get(&id).cloned()
    }

    pub fn ids(&self) -> Vec<Uuid> {
        self.observations.lock().keys().copied().collect()
    }

    pub fn plane_count(&self, obs_id: Uuid) -> usize {
        self.planes.lock().iter().filter(|p| p.obs_id == obs_id).count()
    }

    /// Number of successful writes (puts, deletes, checksum updates)
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl ObservationSource for MemoryStore {
    fn fetch_observations(
        &self,
        after: Option<&CheckpointCursor>,
        limit: usize,
        max_date: Option<DateTime<Utc>>,
    ) -> Result<Vec<ObservationRow>> {
        let mut rows: Vec<ObservationRow> = self
            .observations
            .lock()
            .values()
            .filter(|o| after.map_or(true, |c| c.precedes(o.last_modified, o.obs_id)))
            .filter(|o| max_date.map_or(true, |max| o.last_modified <= max))
            .cloned()
            .collect();
        rows.sort_by_key(|o| (o.last_modified, o.obs_id));
        rows.truncate(limit);
        Ok(rows)
    }

    fn fetch_planes(&self, obs_ids: &[Uuid], limit: Option<usize>) -> Result<Vec<PlaneRow>> {
        let mut rows: Vec<PlaneRow> =
            self.planes.lock().iter().filter(|p| obs_ids.contains(&p.obs_id)).cloned().collect();
        rows.sort_by_key(|p| (p.obs_id, p.plane_id));
        rows.truncate(limit.unwrap_or(usize::MAX));
        Ok(rows)
    }

    fn get_observation(&self, id: Uuid) -> Result<Option<ObservationRow>> {
        Ok(self.observation(id))
    }

    fn fetch_deletions(
        &self,
        after: Option<&CheckpointCursor>,
        limit: usize,
        max_date: Option<DateTime<Utc>>,
    ) -> Result<Vec<DeletionRecord>> {
        let mut rows: Vec<DeletionRecord> = self
            .deletions
            .lock()
            .iter()
            .filter(|d| after.map_or(true, |c| c.precedes(d.last_modified, d.id)))
            .filter(|d| max_date.map_or(true, |max| d.last_modified <= max))
            .copied()
            .collect();
        rows.sort_by_key(DeletionRecord::cursor);
        rows.truncate(limit);
        Ok(rows)
    }

    fn latest_deletion(&self, max_date: Option<DateTime<Utc>>) -> Result<Option<DeletionRecord>> {
        Ok(self
            .deletions
            .lock()
            .iter()
            .filter(|d| max_date.map_or(true, |max| d.last_modified <= max))
            .max_by_key(|d| d.cursor())
            .copied())
    }
}

impl ObservationDestination for MemoryStore {
    fn stored_checksum(&self, id: Uuid) -> Result<Option<String>> {
        Ok(self.observations.lock().get(&id).and_then(|o| o.meta_checksum.clone()))
    }

    fn stored_last_modified(&self, id: Uuid) -> Result<Option<DateTime<Utc>>> {
        Ok(self.observations.lock().get(&id).map(|o| o.last_modified))
    }

    fn put(&self, record: &TransformedRecord) -> Result<()> {
        if self.failing_writes.lock().contains(&record.id()) {
            return Err(HarvestError::Database("constraint failed: Observation.obsID".to_string()));
        }
        self.insert(record.observation.clone(), record.planes.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn delete(&self, id: Uuid, deleted_at: DateTime<Utc>) -> Result<bool> {
        let deletable =
            self.observations.lock().get(&id).is_some_and(|o| o.last_modified <= deleted_at);
        if deletable {
            self.remove(id);
            self.writes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(deletable)
    }

    fn update_checksum(&self, id: Uuid, checksum: &str) -> Result<()> {
        if let Some(observation) = self.observations.lock().get_mut(&id) {
            observation.meta_checksum = Some(checksum.to_string());
            self.writes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn refresh_last_modified(&self, id: Uuid, last_modified: DateTime<Utc>) -> Result<bool> {
        let mut observations = self.observations.lock();
        match observations.get_mut(&id) {
            Some(observation) if observation.last_modified < last_modified => {
                observation.last_modified = last_modified;
                self.writes.fetch_add(1, Ordering::SeqCst);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
