//! Stats Module - GC Performance Monitoring
//!
//! Collects per-cycle statistics for tuning and debugging:
//! - Pause time (min, max, mean, percentiles)
//! - Reclaimed and moved bytes per cycle
//! - Cycle counts by trigger (explicit, allocation failure, threshold)

pub mod gc_cycle;
pub mod histogram;
pub mod timer;

pub use gc_cycle::{AggregatedStats, GcCycleStats, GcStatsCollector};
pub use histogram::Histogram;
pub use timer::GcTimer;

use crate::gc::GcReason;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// GcStats - statistics repository for one collector
pub struct GcStats {
    /// Cycle history and totals
    cycles: GcStatsCollector,

    /// Pause time distribution (nanoseconds)
    pause_stats: Arc<Histogram>,

    explicit_cycles: AtomicU64,
    allocation_cycles: AtomicU64,
    threshold_cycles: AtomicU64,

    start_time: Instant,
}

impl GcStats {
    /// Create a repository retaining `history_limit` cycles
    pub fn new(history_limit: usize) -> Self {
        Self {
            cycles: GcStatsCollector::new(history_limit),
            pause_stats: Arc::new(Histogram::new()),
            explicit_cycles: AtomicU64::new(0),
            allocation_cycles: AtomicU64::new(0),
            threshold_cycles: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a finished collection
    pub fn record_collection(&self, cycle: GcCycleStats) {
        let counter = match cycle.reason {
            GcReason::Explicit => &self.explicit_cycles,
            GcReason::AllocationFailure { .. } => &self.allocation_cycles,
            GcReason::Threshold { .. } => &self.threshold_cycles,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        self.pause_stats.record(cycle.total_pause_ns());
        self.cycles.record(cycle);
    }

    pub fn cycles(&self) -> &GcStatsCollector {
        &self.cycles
    }

    /// Get pause time histogram
    pub fn pause_histogram(&self) -> Arc<Histogram> {
        Arc::clone(&self.pause_stats)
    }

    /// Get summary statistics
    pub fn summary(&self) -> GcSummary {
        let aggregated = self.cycles.aggregated();
        GcSummary {
            total_cycles: aggregated.total_cycles,
            explicit_cycles: self.explicit_cycles.load(Ordering::Relaxed),
            allocation_cycles: self.allocation_cycles.load(Ordering::Relaxed),
            threshold_cycles: self.threshold_cycles.load(Ordering::Relaxed),
            total_bytes_reclaimed: aggregated.total_bytes_reclaimed,
            avg_pause_ms: self.pause_stats.mean() as f64 / 1_000_000.0,
            max_pause_ms: self.pause_stats.max() as f64 / 1_000_000.0,
            p99_pause_ms: self.pause_stats.p99() as f64 / 1_000_000.0,
            uptime_secs: self.start_time.elapsed().as_secs(),
        }
    }

    /// Reset statistics
    pub fn reset(&self) {
        self.cycles.reset();
        self.pause_stats.clear();
        self.explicit_cycles.store(0, Ordering::Relaxed);
        self.allocation_cycles.store(0, Ordering::Relaxed);
        self.threshold_cycles.store(0, Ordering::Relaxed);
    }
}

impl Default for GcStats {
    fn default() -> Self {
        Self::new(64)
    }
}

impl std::fmt::Debug for GcStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GcStats")
            .field("summary", &self.summary())
            .finish()
    }
}

/// Summary statistics
#[derive(Debug, Default, Clone, Serialize)]
pub struct GcSummary {
    pub total_cycles: u64,
    /// Cycles started by `collect()`
    pub explicit_cycles: u64,
    /// Cycles started by a failed allocation
    pub allocation_cycles: u64,
    /// Cycles started by the utilization threshold
    pub threshold_cycles: u64,
    pub total_bytes_reclaimed: usize,
    pub avg_pause_ms: f64,
    pub max_pause_ms: f64,
    pub p99_pause_ms: f64,
    pub uptime_secs: u64,
}
