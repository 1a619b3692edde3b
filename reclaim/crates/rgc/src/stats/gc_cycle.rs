//! GC Cycle Statistics
//!
//! Per-cycle record of what each phase did and how long it took, plus a
//! collector that keeps a bounded history and running totals.

use crate::gc::GcReason;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// GC Cycle Statistics - one stop-the-world collection
#[derive(Debug, Clone, Serialize)]
pub struct GcCycleStats {
    /// Cycle ID (1-based)
    pub cycle_id: u64,

    /// What started the cycle
    pub reason: GcReason,

    /// Phase timings (nanoseconds)
    pub mark_ns: u64,
    pub sweep_ns: u64,
    pub compact_ns: u64,

    /// Memory statistics
    pub heap_used_before: usize,
    pub heap_used_after: usize,
    pub bytes_reclaimed: usize,
    pub bytes_moved: usize,

    /// Object statistics
    pub roots_scanned: usize,
    pub objects_marked: usize,
    pub objects_swept: usize,
    pub objects_relocated: usize,

    /// Free regions left by the sweep, before compaction
    pub free_regions_before_compaction: usize,
}

impl GcCycleStats {
    pub fn new(cycle_id: u64, reason: GcReason) -> Self {
        Self {
            cycle_id,
            reason,
            mark_ns: 0,
            sweep_ns: 0,
            compact_ns: 0,
            heap_used_before: 0,
            heap_used_after: 0,
            bytes_reclaimed: 0,
            bytes_moved: 0,
            roots_scanned: 0,
            objects_marked: 0,
            objects_swept: 0,
            objects_relocated: 0,
            free_regions_before_compaction: 0,
        }
    }

    /// Total pause (the whole cycle is stop-the-world)
    pub fn total_pause_ns(&self) -> u64 {
        self.mark_ns + self.sweep_ns + self.compact_ns
    }

    /// Reclaimed fraction of the bytes in use before the cycle
    pub fn reclaim_ratio(&self) -> f64 {
        if self.heap_used_before == 0 {
            0.0
        } else {
            self.bytes_reclaimed as f64 / self.heap_used_before as f64
        }
    }
}

/// GC Statistics Collector - aggregates statistics across all cycles
pub struct GcStatsCollector {
    /// Most recent cycles, oldest first
    history: RwLock<VecDeque<GcCycleStats>>,
    max_history: usize,

    total_cycles: AtomicU64,
    total_pause_ns: AtomicU64,
    total_objects_marked: AtomicU64,
    total_objects_swept: AtomicU64,
    total_objects_relocated: AtomicU64,
    total_bytes_reclaimed: AtomicUsize,
    total_bytes_moved: AtomicUsize,

    peak_heap_used: AtomicUsize,
    peak_pause_ns: AtomicU64,
}

impl GcStatsCollector {
    pub fn new(max_history: usize) -> Self {
        Self {
            history: RwLock::new(VecDeque::with_capacity(max_history)),
            max_history,
            total_cycles: AtomicU64::new(0),
            total_pause_ns: AtomicU64::new(0),
            total_objects_marked: AtomicU64::new(0),
            total_objects_swept: AtomicU64::new(0),
            total_objects_relocated: AtomicU64::new(0),
            total_bytes_reclaimed: AtomicUsize::new(0),
            total_bytes_moved: AtomicUsize::new(0),
            peak_heap_used: AtomicUsize::new(0),
            peak_pause_ns: AtomicU64::new(0),
        }
    }

    /// Fold a finished cycle into the totals and the history
    pub fn record(&self, stats: GcCycleStats) {
        self.total_cycles.fetch_add(1, Ordering::Relaxed);
        self.total_pause_ns
            .fetch_add(stats.total_pause_ns(), Ordering::Relaxed);
        self.total_objects_marked
            .fetch_add(stats.objects_marked as u64, Ordering::Relaxed);
        self.total_objects_swept
            .fetch_add(stats.objects_swept as u64, Ordering::Relaxed);
        self.total_objects_relocated
            .fetch_add(stats.objects_relocated as u64, Ordering::Relaxed);
        self.total_bytes_reclaimed
            .fetch_add(stats.bytes_reclaimed, Ordering::Relaxed);
        self.total_bytes_moved
            .fetch_add(stats.bytes_moved, Ordering::Relaxed);

        self.peak_heap_used
            .fetch_max(stats.heap_used_before, Ordering::Relaxed);
        self.peak_pause_ns
            .fetch_max(stats.total_pause_ns(), Ordering::Relaxed);

        if self.max_history == 0 {
            return;
        }
        let mut history = self.history.write();
        if history.len() >= self.max_history {
            history.pop_front();
        }
        history.push_back(stats);
    }

    /// Most recent cycle
    pub fn last(&self) -> Option<GcCycleStats> {
        self.history.read().back().cloned()
    }

    /// Retained cycles, oldest first
    pub fn history(&self) -> Vec<GcCycleStats> {
        self.history.read().iter().cloned().collect()
    }

    pub fn aggregated(&self) -> AggregatedStats {
        let cycles = self.total_cycles.load(Ordering::Relaxed);
        let total_pause_ns = self.total_pause_ns.load(Ordering::Relaxed);
        AggregatedStats {
            total_cycles: cycles,
            total_pause_ns,
            total_objects_marked: self.total_objects_marked.load(Ordering::Relaxed),
            total_objects_swept: self.total_objects_swept.load(Ordering::Relaxed),
            total_objects_relocated: self.total_objects_relocated.load(Ordering::Relaxed),
            total_bytes_reclaimed: self.total_bytes_reclaimed.load(Ordering::Relaxed),
            total_bytes_moved: self.total_bytes_moved.load(Ordering::Relaxed),
            avg_pause_ns: if cycles > 0 { total_pause_ns / cycles } else { 0 },
            peak_heap_used: self.peak_heap_used.load(Ordering::Relaxed),
            peak_pause_ns: self.peak_pause_ns.load(Ordering::Relaxed),
        }
    }

    /// Reset all statistics
    pub fn reset(&self) {
        self.history.write().clear();
        self.total_cycles.store(0, Ordering::Relaxed);
        self.total_pause_ns.store(0, Ordering::Relaxed);
        self.total_objects_marked.store(0, Ordering::Relaxed);
        self.total_objects_swept.store(0, Ordering::Relaxed);
        self.total_objects_relocated.store(0, Ordering::Relaxed);
        self.total_bytes_reclaimed.store(0, Ordering::Relaxed);
        self.total_bytes_moved.store(0, Ordering::Relaxed);
        self.peak_heap_used.store(0, Ordering::Relaxed);
        self.peak_pause_ns.store(0, Ordering::Relaxed);
    }
}

impl std::fmt::Debug for GcStatsCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GcStatsCollector")
            .field("max_history", &self.max_history)
            .field("aggregated", &self.aggregated())
            .finish()
    }
}

/// Aggregated statistics across all cycles
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregatedStats {
    pub total_cycles: u64,
    pub total_pause_ns: u64,
    pub total_objects_marked: u64,
    pub total_objects_swept: u64,
    pub total_objects_relocated: u64,
    pub total_bytes_reclaimed: usize,
    pub total_bytes_moved: usize,
    pub avg_pause_ns: u64,
    pub peak_heap_used: usize,
    pub peak_pause_ns: u64,
}

impl AggregatedStats {
    pub fn avg_pause_ms(&self) -> f64 {
        self.avg_pause_ns as f64 / 1_000_000.0
    }

    pub fn peak_pause_ms(&self) -> f64 {
        self.peak_pause_ns as f64 / 1_000_000.0
    }
}
