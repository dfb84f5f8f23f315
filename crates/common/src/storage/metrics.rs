//! Connection pool usage for one store
//!
//! The pool records every acquisition; a harvest takes a [`PoolUsage`]
//! snapshot at the end of the run and logs it next to the run report.

use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free pool counters
#[derive(Debug)]
pub struct StorageMetrics {
    acquired: AtomicU64,
    timeouts: AtomicU64,
    errors: AtomicU64,
    total_wait_ms: AtomicU64,
    slowest_wait_ms: AtomicU64,
    max_pool_size: u32,
}

/// Point-in-time copy of [`StorageMetrics`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolUsage {
    pub acquired: u64,
    pub timeouts: u64,
    pub errors: u64,
    pub avg_wait_ms: u64,
    pub slowest_wait_ms: u64,
    pub max_pool_size: u32,
}

impl PoolUsage {
    /// Whether any acquisition failed during the run
    pub fn is_degraded(&self) -> bool {
        self.timeouts > 0 || self.errors > 0
    }
}

impl StorageMetrics {
    pub fn new(max_pool_size: u32) -> Self {
        Self {
            acquired: AtomicU64::new(0),
            timeouts: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            total_wait_ms: AtomicU64::new(0),
            slowest_wait_ms: AtomicU64::new(0),
            max_pool_size,
        }
    }

    /// Count a connection handed out after waiting `wait_ms`
    pub fn record_acquired(&self, wait_ms: u64) {
        self.acquired.fetch_add(1, Ordering::Relaxed);
        self.total_wait_ms.fetch_add(wait_ms, Ordering::Relaxed);
        self.slowest_wait_ms.fetch_max(wait_ms, Ordering::Relaxed);
    }

    pub fn record_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn max_pool_size(&self) -> u32 {
        self.max_pool_size
    }

    pub fn snapshot(&self) -> PoolUsage {
        let acquired = self.acquired.load(Ordering::Relaxed);
        let total_wait_ms = self.total_wait_ms.load(Ordering::Relaxed);
        PoolUsage {
            acquired,
            timeouts: self.timeouts.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            avg_wait_ms: total_wait_ms.checked_div(acquired).unwrap_or(0),
            slowest_wait_ms: self.slowest_wait_ms.load(Ordering::Relaxed),
            max_pool_size: self.max_pool_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_metrics_snapshot_is_empty() {
        let usage = StorageMetrics::new(4).snapshot();
        assert_eq!(usage, PoolUsage { max_pool_size: 4, ..PoolUsage::default() });
        assert!(!usage.is_degraded());
    }

    #[test]
    fn test_waits_are_averaged_and_peak_kept() {
        let metrics = StorageMetrics::new(4);
        metrics.record_acquired(10);
        metrics.record_acquired(50);
        metrics.record_acquired(0);

        let usage = metrics.snapshot();
        assert_eq!(usage.acquired, 3);
        assert_eq!(usage.avg_wait_ms, 20);
        assert_eq!(usage.slowest_wait_ms, 50);
    }

    #[test]
    fn test_failures_mark_the_pool_degraded() {
        let metrics = StorageMetrics::new(1);
        metrics.record_timeout();
        metrics.record_error();
        metrics.record_error();

        let usage = metrics.snapshot();
        assert_eq!((usage.timeouts, usage.errors), (1, 2));
        assert!(usage.is_degraded());
    }
}
