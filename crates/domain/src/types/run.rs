//! Run options and operating modes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_BATCH_FACTOR, DEFAULT_BATCH_SIZE};
use crate::errors::{HarvestError, Result};

/// Which passes a run performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HarvestMode {
    /// Resume after the stored checkpoint
    #[default]
    Incremental,
    /// Reset the observation checkpoint and harvest from the epoch
    Full,
    /// Retry only the records in the skip registry
    SkipRetry,
    /// Recompute destination metadata without reading a source
    Recompute,
}

crate::impl_domain_status_conversions!(HarvestMode {
    Incremental => "incremental",
    Full => "full",
    SkipRetry => "skip",
    Recompute => "recompute",
});

impl HarvestMode {
    /// Whether the mode reads from a separate source store
    pub fn reads_source(self) -> bool {
        !matches!(self, Self::Recompute)
    }
}

/// Mode switches as given on the command line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModeFlags {
    pub full: bool,
    pub skip: bool,
    pub recompute: bool,
}

impl ModeFlags {
    /// Resolve the switches to a single mode
    ///
    /// # Errors
    /// Returns [`HarvestError::InvalidArgument`] when `skip` is combined with
    /// `full` or `recompute`.
    pub fn resolve(self) -> Result<HarvestMode> {
        if self.skip && self.full {
            return Err(HarvestError::InvalidArgument(
                "--skip cannot be combined with --full".to_string(),
            ));
        }
        if self.skip && self.recompute {
            return Err(HarvestError::InvalidArgument(
                "--skip cannot be combined with --recompute".to_string(),
            ));
        }

        Ok(if self.recompute {
            HarvestMode::Recompute
        } else if self.full {
            HarvestMode::Full
        } else if self.skip {
            HarvestMode::SkipRetry
        } else {
            HarvestMode::Incremental
        })
    }
}

/// Options controlling one harvest run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub mode: HarvestMode,
    /// Compute outcomes without mutating any store
    pub dry_run: bool,
    /// Destination starts empty: skip replaying past deletions
    pub init: bool,
    /// Maximum number of parent records per batch
    pub batch_size: usize,
    /// Expected children per parent, used to size child fetches
    pub batch_factor: usize,
    /// Ignore records modified after this instant
    pub max_date: Option<DateTime<Utc>>,
    /// Stop after this many observation batches
    pub max_batches: Option<usize>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self::new(HarvestMode::Incremental)
    }
}

impl RunOptions {
    pub fn new(mode: HarvestMode) -> Self {
        Self {
            mode,
            dry_run: false,
            init: false,
            batch_size: DEFAULT_BATCH_SIZE,
            batch_factor: DEFAULT_BATCH_FACTOR,
            max_date: None,
            max_batches: None,
        }
    }

    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    #[must_use]
    pub fn with_init(mut self, init: bool) -> Self {
        self.init = init;
        self
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    #[must_use]
    pub fn with_batch_factor(mut self, batch_factor: usize) -> Self {
        self.batch_factor = batch_factor;
        self
    }

    #[must_use]
    pub fn with_max_date(mut self, max_date: Option<DateTime<Utc>>) -> Self {
        self.max_date = max_date;
        self
    }

    #[must_use]
    pub fn with_max_batches(mut self, max_batches: Option<usize>) -> Self {
        self.max_batches = max_batches;
        self
    }

    /// Budget of child rows fetched alongside `parents` records
    pub fn child_budget(&self, parents: usize) -> usize {
        parents.saturating_mul(self.batch_factor)
    }

    /// Check the numeric options
    ///
    /// # Errors
    /// Returns [`HarvestError::InvalidArgument`] when a batch size is zero.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(HarvestError::InvalidArgument("batchSize must be at least 1".to_string()));
        }
        if self.batch_factor == 0 {
            return Err(HarvestError::InvalidArgument(
                "batchFactor must be at least 1".to_string(),
            ));
        }
        if self.max_batches == Some(0) {
            return Err(HarvestError::InvalidArgument(
                "max_batches must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
