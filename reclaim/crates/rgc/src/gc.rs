//! GC Core Module - Garbage Collection Cycle Management
//!
//! Implements the collection driver. RGC is a stop-the-world
//! mark-sweep-compact collector over one linear heap:
//!
//! 1. **Mark**: snapshot the root registry, mark everything reachable
//! 2. **Sweep**: free every unmarked record, clear surviving mark bits
//! 3. **Compact**: slide survivors to the heap base, rewrite references
//!    and roots, leave one free region at the top
//!
//! A cycle runs either on an explicit [`GarbageCollector::collect`], when an
//! allocation finds no free region, or (optionally) when heap utilization
//! crosses the configured threshold before an allocation.

use crate::allocator::{Allocator, AllocatorStats};
use crate::config::GcConfig;
use crate::error::{GcError, Result};
use crate::gc_invariant;
use crate::heap::{verify_heap, HeapStats, HeapStore, HeapVerifyError};
use crate::logging::{GcEvent, GcLogger, GcLoggerConfig, LogLevel};
use crate::marker::{Marker, RootId, RootRegistry};
use crate::object::{ObjectHandle, Value};
use crate::relocate::Compactor;
use crate::stats::{GcCycleStats, GcStats, GcTimer};
use crate::sweeper::Sweeper;
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// GC cycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GcState {
    /// Idle - no GC in progress
    Idle,
    /// Marking phase - computing the live set
    Marking,
    /// Sweeping phase - freeing unmarked records
    Sweeping,
    /// Compacting phase - sliding survivors, fixing references
    Compacting,
}

/// Reason for GC trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GcReason {
    /// An allocation of `requested` bytes found no free region
    AllocationFailure { requested: usize },
    /// Explicit GC request (user call)
    Explicit,
    /// Live bytes exceeded the configured threshold (both in bytes)
    Threshold { used: usize, threshold: usize },
}

impl fmt::Display for GcReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GcReason::AllocationFailure { requested } => {
                write!(f, "allocation failure ({} bytes)", requested)
            },
            GcReason::Explicit => write!(f, "explicit"),
            GcReason::Threshold { used, threshold } => {
                write!(f, "threshold ({} > {} bytes)", used, threshold)
            },
        }
    }
}

/// GarbageCollector - orchestrator for the entire GC cycle
///
/// Owns the heap and every collector component:
/// - Allocator for first-fit allocation
/// - RootRegistry for host-supplied roots
/// - Marker, Sweeper and Compactor for the three phases
/// - Stats and logger for monitoring
///
/// ## Thread Safety
///
/// Every mutating operation takes `&mut self`, so a cycle can never
/// overlap with a mutator access. Use [`Runtime`](crate::Runtime) to share
/// one collector between threads.
///
/// ## Handles and compaction
///
/// Compaction rewrites references stored in the heap and in the root
/// registry. Handles the host keeps elsewhere are not rewritten: after a
/// cycle, reach rooted objects through [`root`](Self::root), and re-read
/// references from fields. A handle whose object moved or died resolves
/// to `InvalidHandle`.
pub struct GarbageCollector {
    config: GcConfig,

    heap: HeapStore,

    allocator: Allocator,

    roots: RootRegistry,

    marker: Marker,

    sweeper: Sweeper,

    compactor: Compactor,

    state: GcState,

    /// Completed cycles
    cycle_count: u64,

    /// Statistics collector
    stats: Arc<GcStats>,

    /// Event logger, enabled by `config.verbose`
    logger: GcLogger,
}

impl GarbageCollector {
    /// Create a new GarbageCollector with specified configuration
    ///
    /// # Examples
    /// ```rust
    /// use rgc::{GarbageCollector, GcConfig};
    ///
    /// let gc = GarbageCollector::new(GcConfig::with_heap_size(4096))?;
    /// assert_eq!(gc.stats().free_bytes, 4096);
    /// # Ok::<(), rgc::GcError>(())
    /// ```
    pub fn new(config: GcConfig) -> Result<Self> {
        config.validate()?;

        let logger_config = GcLoggerConfig {
            level: LogLevel::Debug,
            ..Default::default()
        };
        let logger = if config.verbose {
            GcLogger::new(logger_config)
        } else {
            GcLogger::disabled(logger_config)
        };

        log::debug!(
            "heap [{:#x}, {:#x}) ({} bytes)",
            config.heap_base,
            config.heap_base + config.heap_size,
            config.heap_size
        );

        Ok(Self {
            heap: HeapStore::new(config.heap_base, config.heap_size),
            allocator: Allocator::new(),
            roots: RootRegistry::new(),
            marker: Marker::new(),
            sweeper: Sweeper::new(),
            compactor: Compactor::new(),
            state: GcState::Idle,
            cycle_count: 0,
            stats: Arc::new(GcStats::new(config.history_limit)),
            logger,
            config,
        })
    }

    /// Allocate a zero-initialized object of `size` bytes
    ///
    /// If no free region is large enough, runs one full cycle and retries
    /// once. When the threshold trigger already ran a cycle for this call,
    /// no second cycle is attempted.
    ///
    /// # Returns
    /// * `Ok(ObjectHandle)` - Handle to the new object
    /// * `Err(OutOfMemory)` - Still no room after the cycle
    /// * `Err(InvalidArgument)` - `size == 0`
    pub fn allocate(&mut self, size: usize) -> Result<ObjectHandle> {
        if size == 0 {
            return Err(GcError::InvalidArgument(
                "allocation size must be > 0".to_string(),
            ));
        }

        let collected = match self.should_collect() {
            Some(reason) => {
                self.run_cycle(reason);
                true
            },
            None => false,
        };

        let mut result = self.allocator.allocate(&mut self.heap, size);
        // A threshold cycle just ran; another one cannot free anything.
        if !collected && matches!(result, Err(GcError::OutOfMemory { .. })) {
            self.run_cycle(GcReason::AllocationFailure { requested: size });
            result = self.allocator.allocate(&mut self.heap, size);
        }

        if let Err(GcError::OutOfMemory {
            available,
            largest_free,
            ..
        }) = &result
        {
            log::warn!(
                "out of memory: {} bytes requested, {} free (largest region {})",
                size,
                available,
                largest_free
            );
            self.logger.log(GcEvent::AllocationFailure {
                size,
                heap_used: self.heap.live_bytes(),
                largest_free: *largest_free,
            });
        }
        result
    }

    /// Threshold trigger, if configured and exceeded
    pub fn should_collect(&self) -> Option<GcReason> {
        let ratio = self.config.gc_trigger_threshold?;
        let threshold = (self.heap.capacity() as f64 * ratio as f64) as usize;
        let used = self.heap.live_bytes();
        (used > threshold).then_some(GcReason::Threshold { used, threshold })
    }

    /// Read field `index` of `handle`
    pub fn read_field(&self, handle: ObjectHandle, index: usize) -> Result<Value> {
        let record = self.heap.resolve(handle)?;
        record.field(index).ok_or(GcError::FieldOutOfBounds {
            index,
            length: record.field_count(),
        })
    }

    /// Store `value` into field `index` of `handle`
    ///
    /// A reference value must name a live object; storing a stale handle
    /// would plant a dangling reference in the heap.
    pub fn write_field(&mut self, handle: ObjectHandle, index: usize, value: Value) -> Result<()> {
        if let Value::Ref(target) = value {
            if !self.heap.is_live(target) {
                return Err(GcError::InvalidHandle { handle: target });
            }
        }

        let record = self.heap.resolve_mut(handle)?;
        let length = record.field_count();
        if record.set_field(index, value) {
            Ok(())
        } else {
            Err(GcError::FieldOutOfBounds { index, length })
        }
    }

    /// Register a root with the GC
    ///
    /// Roots are references that the GC will trace from. Any object
    /// reachable from a root will not be collected. The returned
    /// [`RootId`] finds the root's current handle after compaction.
    pub fn register_root(&mut self, handle: ObjectHandle) -> Result<RootId> {
        self.register_root_inner(handle, None)
    }

    /// Register a root with a name shown in diagnostics
    pub fn register_named_root(&mut self, handle: ObjectHandle, name: &str) -> Result<RootId> {
        self.register_root_inner(handle, Some(name))
    }

    fn register_root_inner(&mut self, handle: ObjectHandle, name: Option<&str>) -> Result<RootId> {
        if !self.heap.is_live(handle) {
            log::debug!("refusing to root dead handle {}", handle);
            return Err(GcError::InvalidHandle { handle });
        }
        Ok(self.roots.register(handle, name))
    }

    /// Unregister one registration of `handle`
    ///
    /// `handle` must be the root's current handle (see [`root`](Self::root)).
    pub fn unregister_root(&mut self, handle: ObjectHandle) -> Result<()> {
        match self.roots.unregister_handle(handle) {
            Some(_) => Ok(()),
            None => Err(GcError::InvalidArgument(format!(
                "{} is not a registered root",
                handle
            ))),
        }
    }

    /// Unregister a root by id, returning its current handle
    pub fn unregister_root_id(&mut self, id: RootId) -> Result<ObjectHandle> {
        self.roots
            .unregister_id(id)
            .ok_or_else(|| GcError::InvalidArgument(format!("{} is not registered", id)))
    }

    /// Current handle of a registered root
    pub fn root(&self, id: RootId) -> Option<ObjectHandle> {
        self.roots.get(id)
    }

    /// Name given to a root by [`register_named_root`](Self::register_named_root)
    pub fn root_name(&self, id: RootId) -> Option<&str> {
        self.roots.descriptor(id)?.name.as_deref()
    }

    /// Current handles of all roots, in registration order
    pub fn roots(&self) -> Vec<ObjectHandle> {
        self.roots.handles()
    }

    /// Run one full collection cycle
    ///
    /// # Returns
    /// Bytes reclaimed by the cycle
    pub fn collect(&mut self) -> usize {
        self.run_cycle(GcReason::Explicit)
    }

    /// Execute one mark-sweep-compact cycle
    ///
    /// # Panics
    /// On any invariant violation discovered during or after the cycle.
    fn run_cycle(&mut self, reason: GcReason) -> usize {
        gc_invariant!(
            self.state == GcState::Idle,
            "cycle started in state {:?}",
            self.state
        );

        let cycle = self.cycle_count + 1;
        let cycle_timer = GcTimer::new();
        let mut cycle_stats = GcCycleStats::new(cycle, reason);
        cycle_stats.heap_used_before = self.heap.live_bytes();

        log::debug!("cycle {} started ({})", cycle, reason);
        self.logger.log(GcEvent::CycleStart {
            cycle,
            reason: reason.to_string(),
        });

        let mut snapshot = self.roots.snapshot();
        let mut phase_timer = GcTimer::new();

        // Mark
        self.enter_phase(cycle, GcState::Marking);
        let mark = self.marker.mark(&mut self.heap, &snapshot);
        cycle_stats.mark_ns = phase_timer.lap_ns();
        cycle_stats.roots_scanned = mark.roots_scanned;
        cycle_stats.objects_marked = mark.objects_marked;
        self.exit_phase(cycle, cycle_stats.mark_ns);
        self.logger.log(GcEvent::MarkStats {
            cycle,
            roots_scanned: mark.roots_scanned,
            marked_count: mark.objects_marked,
            marked_bytes: mark.bytes_marked,
        });

        // Sweep
        self.enter_phase(cycle, GcState::Sweeping);
        let sweep = self.sweeper.sweep(&mut self.heap);
        cycle_stats.sweep_ns = phase_timer.lap_ns();
        cycle_stats.objects_swept = sweep.objects_swept;
        cycle_stats.bytes_reclaimed = sweep.bytes_reclaimed;
        cycle_stats.free_regions_before_compaction = sweep.free_regions;
        self.exit_phase(cycle, cycle_stats.sweep_ns);
        self.logger.log(GcEvent::SweepStats {
            cycle,
            swept_count: sweep.objects_swept,
            reclaimed_bytes: sweep.bytes_reclaimed,
            free_regions: sweep.free_regions,
        });

        gc_invariant!(
            sweep.survivors == mark.objects_marked,
            "sweep kept {} objects but {} were marked",
            sweep.survivors,
            mark.objects_marked
        );

        // Compact
        self.enter_phase(cycle, GcState::Compacting);
        let relocate = self.compactor.compact(&mut self.heap, &mut snapshot);
        self.roots.apply_snapshot(&snapshot);
        cycle_stats.compact_ns = phase_timer.lap_ns();
        cycle_stats.objects_relocated = relocate.objects_relocated;
        cycle_stats.bytes_moved = relocate.bytes_moved;
        self.exit_phase(cycle, cycle_stats.compact_ns);
        self.logger.log(GcEvent::RelocateStats {
            cycle,
            relocated_count: relocate.objects_relocated,
            bytes_moved: relocate.bytes_moved,
        });

        self.state = GcState::Idle;
        self.cycle_count = cycle;
        cycle_stats.heap_used_after = self.heap.live_bytes();

        gc_invariant!(
            cycle_stats.heap_used_before - cycle_stats.heap_used_after == sweep.bytes_reclaimed,
            "live bytes went {} -> {} but {} bytes were reclaimed",
            cycle_stats.heap_used_before,
            cycle_stats.heap_used_after,
            sweep.bytes_reclaimed
        );
        gc_invariant!(
            self.heap.is_compacted(),
            "heap not contiguous after cycle {}",
            cycle
        );
        if self.config.verify_heap {
            if let Err(err) = verify_heap(&self.heap) {
                panic!(
                    "GC invariant violated: heap verification failed after cycle {}: {}",
                    cycle, err
                );
            }
        }

        let heap_stats = self.heap.stats();
        self.logger.log(GcEvent::CycleEnd {
            cycle,
            duration_ms: cycle_timer.elapsed_ms(),
            reclaimed_bytes: sweep.bytes_reclaimed,
        });
        self.logger.log(GcEvent::HeapStats {
            used_bytes: heap_stats.live_bytes,
            total_bytes: heap_stats.capacity,
            free_regions: heap_stats.free_regions,
            utilization: heap_stats.utilization,
        });
        log::debug!(
            "cycle {} finished: reclaimed {} bytes, {} live objects",
            cycle,
            sweep.bytes_reclaimed,
            heap_stats.object_count
        );

        if self.config.stats_enabled {
            self.stats.record_collection(cycle_stats);
        }

        sweep.bytes_reclaimed
    }

    fn enter_phase(&mut self, cycle: u64, state: GcState) {
        self.state = state;
        self.logger.log(GcEvent::PhaseStart {
            cycle,
            phase: phase_name(state).to_string(),
        });
    }

    fn exit_phase(&self, cycle: u64, duration_ns: u64) {
        self.logger.log(GcEvent::PhaseEnd {
            cycle,
            phase: phase_name(self.state).to_string(),
            duration_ms: duration_ns as f64 / 1_000_000.0,
        });
    }

    /// Heap statistics; no side effects
    pub fn stats(&self) -> HeapStats {
        self.heap.stats()
    }

    /// Size in bytes of a live object
    pub fn size_of(&self, handle: ObjectHandle) -> Result<usize> {
        Ok(self.heap.resolve(handle)?.size())
    }

    /// Number of fields of a live object
    pub fn field_count(&self, handle: ObjectHandle) -> Result<usize> {
        Ok(self.heap.resolve(handle)?.field_count())
    }

    /// Whether `handle` names a live object
    pub fn is_live(&self, handle: ObjectHandle) -> bool {
        self.heap.is_live(handle)
    }

    /// Handles of all live objects in heap order
    pub fn objects(&self) -> Vec<ObjectHandle> {
        self.heap.handles()
    }

    /// Check every heap invariant
    pub fn verify_heap(&self) -> std::result::Result<(), HeapVerifyError> {
        verify_heap(&self.heap)
    }

    /// Get current GC state
    pub fn state(&self) -> GcState {
        self.state
    }

    /// Get total GC cycles executed
    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    /// Statistics of the most recent cycle
    pub fn last_cycle(&self) -> Option<GcCycleStats> {
        self.stats.cycles().last()
    }

    /// Get GC statistics
    pub fn gc_stats(&self) -> Arc<GcStats> {
        Arc::clone(&self.stats)
    }

    pub fn allocator_stats(&self) -> AllocatorStats {
        self.allocator.stats()
    }

    pub fn config(&self) -> &GcConfig {
        &self.config
    }

    /// Read-only view of the heap
    pub fn heap(&self) -> &HeapStore {
        &self.heap
    }

    pub fn logger(&self) -> &GcLogger {
        &self.logger
    }

    /// Get detailed diagnostic information
    pub fn diagnostics(&self) -> IndexMap<String, String> {
        let mut diagnostics = IndexMap::new();
        let heap_stats = self.heap.stats();
        let root_stats = self.roots.stats();
        let allocator_stats = self.allocator.stats();

        diagnostics.insert("state".to_string(), format!("{:?}", self.state));
        diagnostics.insert("cycle_count".to_string(), self.cycle_count.to_string());
        diagnostics.insert(
            "heap_range".to_string(),
            format!("{:#x}..{:#x}", self.heap.base(), self.heap.end()),
        );
        diagnostics.insert("heap_used".to_string(), heap_stats.live_bytes.to_string());
        diagnostics.insert("heap_free".to_string(), heap_stats.free_bytes.to_string());
        diagnostics.insert("heap_capacity".to_string(), heap_stats.capacity.to_string());
        diagnostics.insert(
            "heap_utilization".to_string(),
            format!("{:.2}", heap_stats.utilization),
        );
        diagnostics.insert("object_count".to_string(), heap_stats.object_count.to_string());
        diagnostics.insert("free_regions".to_string(), heap_stats.free_regions.to_string());
        diagnostics.insert(
            "largest_free_region".to_string(),
            heap_stats.largest_free_region.to_string(),
        );
        diagnostics.insert("root_count".to_string(), root_stats.registered.to_string());
        diagnostics.insert(
            "rooted_objects".to_string(),
            root_stats.distinct_objects.to_string(),
        );
        diagnostics.insert(
            "allocations".to_string(),
            allocator_stats.allocations.to_string(),
        );
        diagnostics.insert(
            "failed_allocations".to_string(),
            allocator_stats.failed_allocations.to_string(),
        );
        diagnostics.insert(
            "bytes_moved_total".to_string(),
            self.compactor.total_bytes_moved().to_string(),
        );
        if let Some(last) = self.last_cycle() {
            diagnostics.insert("last_cycle_reason".to_string(), last.reason.to_string());
            diagnostics.insert(
                "last_cycle_reclaimed".to_string(),
                last.bytes_reclaimed.to_string(),
            );
        }

        diagnostics
    }
}

impl fmt::Debug for GarbageCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GarbageCollector")
            .field("state", &self.state)
            .field("cycle_count", &self.cycle_count)
            .field("heap", &self.heap.stats())
            .field("roots", &self.roots.len())
            .finish()
    }
}

fn phase_name(state: GcState) -> &'static str {
    match state {
        GcState::Idle => "idle",
        GcState::Marking => "mark",
        GcState::Sweeping => "sweep",
        GcState::Compacting => "compact",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gc(heap_size: usize) -> GarbageCollector {
        GarbageCollector::new(GcConfig {
            heap_size,
            verify_heap: true,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = GarbageCollector::new(GcConfig {
            heap_size: 0,
            ..Default::default()
        });
        assert!(matches!(result, Err(GcError::Configuration(_))));
    }

    #[test]
    fn test_cyclic_garbage_is_reclaimed() {
        let mut gc = gc(256);
        let a = gc.allocate(16).unwrap();
        let b = gc.allocate(24).unwrap();
        gc.write_field(a, 0, Value::Ref(b)).unwrap();
        gc.write_field(b, 0, Value::Ref(a)).unwrap();

        assert_eq!(gc.collect(), 40);
        assert_eq!(
            gc.read_field(a, 0),
            Err(GcError::InvalidHandle { handle: a })
        );
        assert_eq!(
            gc.read_field(b, 0),
            Err(GcError::InvalidHandle { handle: b })
        );
        assert_eq!(gc.stats().object_count, 0);
    }

    #[test]
    fn test_rooted_object_survives_with_fields() {
        let mut gc = gc(256);
        let a = gc.allocate(16).unwrap();
        gc.register_root(a).unwrap();
        let b = gc.allocate(16).unwrap();
        gc.write_field(a, 1, Value::Scalar(42)).unwrap();

        assert_eq!(gc.collect(), 16);
        assert_eq!(gc.read_field(a, 1), Ok(Value::Scalar(42)));
        assert!(!gc.is_live(b));
    }

    #[test]
    fn test_allocation_failure_triggers_cycle() {
        let mut gc = gc(64);
        let keep = gc.allocate(32).unwrap();
        let id = gc.register_root(keep).unwrap();
        gc.allocate(32).unwrap();

        let c = gc.allocate(32).unwrap();
        assert_eq!(gc.cycle_count(), 1);
        assert_eq!(
            gc.last_cycle().map(|s| s.reason),
            Some(GcReason::AllocationFailure { requested: 32 })
        );
        assert_eq!(gc.root(id), Some(keep));
        assert!(gc.is_live(c));
    }

    #[test]
    fn test_threshold_trigger() {
        let mut gc = GarbageCollector::new(GcConfig {
            heap_size: 100,
            gc_trigger_threshold: Some(0.5),
            ..Default::default()
        })
        .unwrap();

        gc.allocate(48).unwrap();
        assert_eq!(gc.should_collect(), None);
        gc.allocate(8).unwrap();
        assert_eq!(
            gc.should_collect(),
            Some(GcReason::Threshold {
                used: 56,
                threshold: 50
            })
        );

        gc.allocate(8).unwrap();
        assert_eq!(gc.cycle_count(), 1);
        assert_eq!(gc.stats().live_bytes, 8);
    }

    #[test]
    fn test_write_field_rejects_dead_target() {
        let mut gc = gc(128);
        let a = gc.allocate(16).unwrap();
        gc.register_root(a).unwrap();
        let dead = gc.allocate(16).unwrap();
        gc.collect();

        assert_eq!(
            gc.write_field(a, 0, Value::Ref(dead)),
            Err(GcError::InvalidHandle { handle: dead })
        );
        assert_eq!(
            gc.write_field(a, 2, Value::Scalar(1)),
            Err(GcError::FieldOutOfBounds {
                index: 2,
                length: 2
            })
        );
    }

    #[test]
    fn test_unregister_unknown_root() {
        let mut gc = gc(64);
        let a = gc.allocate(8).unwrap();
        assert!(matches!(
            gc.unregister_root(a),
            Err(GcError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_verbose_collector_logs_cycle() {
        let mut gc = GarbageCollector::new(GcConfig {
            heap_size: 64,
            verbose: true,
            ..Default::default()
        })
        .unwrap();
        gc.collect();

        let events = gc.logger().events();
        assert!(matches!(
            events.first().map(|(_, e)| e),
            Some(GcEvent::CycleStart { cycle: 1, .. })
        ));
        assert!(events
            .iter()
            .any(|(_, e)| matches!(e, GcEvent::CycleEnd { cycle: 1, .. })));
    }

    #[test]
    fn test_quiet_collector_records_no_events() {
        let mut gc = gc(64);
        gc.collect();
        assert_eq!(gc.logger().event_count(), 0);
    }

    #[test]
    fn test_diagnostics() {
        let mut gc = gc(64);
        let a = gc.allocate(8).unwrap();
        let main = gc.register_named_root(a, "main").unwrap();
        let anonymous = gc.register_root(a).unwrap();
        gc.collect();

        assert_eq!(gc.root_name(main), Some("main"));
        assert_eq!(gc.root_name(anonymous), None);

        let diagnostics = gc.diagnostics();
        assert_eq!(diagnostics.get("state").map(String::as_str), Some("Idle"));
        assert_eq!(diagnostics.get("cycle_count").map(String::as_str), Some("1"));
        assert_eq!(diagnostics.get("root_count").map(String::as_str), Some("2"));
        assert_eq!(diagnostics.get("rooted_objects").map(String::as_str), Some("1"));
        assert_eq!(
            diagnostics.get("last_cycle_reason").map(String::as_str),
            Some("explicit")
        );
    }
}
