//! Shared test helpers for `harvester-core` integration tests.
//!
//! These helpers provide in-memory stores and record fixtures so that the
//! harvest scenarios can focus on behaviour instead of boilerplate.

#![allow(dead_code)]

pub mod fixtures;
pub mod stores;

use std::sync::Arc;

use harvester_core::{
    CancellationFlag, ChecksumTransform, HarvestPorts, HarvestService, RunReport,
};
use harvester_domain::constants::{DELETED_OBSERVATION_CLASS, OBSERVATION_CLASS};
use harvester_domain::{CheckpointCursor, Result, RunOptions};

pub use fixtures::*;
pub use stores::{MemoryCheckpoints, MemorySkips, MemoryStore};

/// Checkpoint key used by every scenario
pub const SOURCE_KEY: &str = "archive.caom.caom2";

/// Source, destination and bookkeeping stores wired together
pub struct Harness {
    pub source: Arc<MemoryStore>,
    pub destination: Arc<MemoryStore>,
    pub checkpoints: Arc<MemoryCheckpoints>,
    pub skips: Arc<MemorySkips>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            source: Arc::new(MemoryStore::default()),
            destination: Arc::new(MemoryStore::default()),
            checkpoints: Arc::new(MemoryCheckpoints::default()),
            skips: Arc::new(MemorySkips::default()),
        }
    }

    /// Ports harvesting `source` into `destination`
    pub fn ports(&self) -> HarvestPorts {
        HarvestPorts {
            source: self.source.clone(),
            destination: self.destination.clone(),
            checkpoints: self.checkpoints.clone(),
            skips: self.skips.clone(),
            transform: Arc::new(ChecksumTransform::new()),
        }
    }

    /// Ports for a recompute run, reading and writing the destination only
    pub fn recompute_ports(&self) -> HarvestPorts {
        HarvestPorts { source: self.destination.clone(), ..self.ports() }
    }

    pub fn run(&self, options: RunOptions) -> Result<RunReport> {
        HarvestService::new(SOURCE_KEY, self.ports(), options, CancellationFlag::new()).run()
    }

    pub fn run_recompute(&self, options: RunOptions) -> Result<RunReport> {
        HarvestService::new(SOURCE_KEY, self.recompute_ports(), options, CancellationFlag::new())
            .run()
    }

    pub fn observation_checkpoint(&self) -> Option<CheckpointCursor> {
        self.checkpoints.current(SOURCE_KEY, OBSERVATION_CLASS)
    }

    pub fn deletion_checkpoint(&self) -> Option<CheckpointCursor> {
        self.checkpoints.current(SOURCE_KEY, DELETED_OBSERVATION_CLASS)
    }
}
