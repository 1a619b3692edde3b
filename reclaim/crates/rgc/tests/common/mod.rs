//! Test Utilities for the RGC Test Suite
//!
//! Shared fixture and STRICT assertion helpers. Every helper checks an
//! exact property; there are no tolerances.
//!
//! Object identity across cycles is tracked by allocation stamp, because
//! compaction changes addresses but never stamps.

#![allow(dead_code)]

use rgc::{GarbageCollector, GcConfig, GcError, GcState, ObjectHandle, RootId, Value};
use std::collections::{BTreeSet, HashMap, VecDeque};

/// Default heap size for tests (64KB)
pub const DEFAULT_HEAP_SIZE: usize = 64 * 1024;

/// Heap size for OOM tests
pub const MINIMAL_HEAP_SIZE: usize = 256;

/// ============================================================================
/// GC FIXTURE
/// ============================================================================

/// Test fixture for GC operations
///
/// Heap verification runs after every cycle, so any cycle that breaks a
/// heap invariant panics inside the test that triggered it.
pub struct GcFixture {
    pub gc: GarbageCollector,
    pub config: GcConfig,
}

impl GcFixture {
    /// Create fixture with default test configuration
    pub fn with_defaults() -> Self {
        Self::with_heap_size(DEFAULT_HEAP_SIZE)
    }

    /// Create fixture with custom heap size
    ///
    /// **Bug this finds:** Heap size validation bugs, OOM handling
    pub fn with_heap_size(heap_size: usize) -> Self {
        Self::with_config(GcConfig {
            heap_size,
            verify_heap: true,
            verbose: false,
            ..Default::default()
        })
    }

    /// Create fixture with minimal heap (for OOM tests)
    pub fn with_minimal_heap() -> Self {
        Self::with_heap_size(MINIMAL_HEAP_SIZE)
    }

    pub fn with_config(config: GcConfig) -> Self {
        let gc = GarbageCollector::new(config.clone())
            .expect("GC initialization should succeed with valid config");
        Self { gc, config }
    }

    /// Allocate an object, panicking on failure
    ///
    /// **Bug this finds:** Allocation failures with free space available
    #[track_caller]
    pub fn allocate(&mut self, size: usize) -> ObjectHandle {
        self.gc
            .allocate(size)
            .unwrap_or_else(|e| panic!("Allocation of {} bytes failed: {}", size, e))
    }

    pub fn allocate_many(&mut self, count: usize, size: usize) -> Vec<ObjectHandle> {
        (0..count).map(|_| self.allocate(size)).collect()
    }

    /// Allocate and root an object
    #[track_caller]
    pub fn allocate_rooted(&mut self, size: usize) -> (ObjectHandle, RootId) {
        let handle = self.allocate(size);
        let id = self
            .gc
            .register_root(handle)
            .unwrap_or_else(|e| panic!("Rooting {} failed: {}", handle, e));
        (handle, id)
    }

    /// Store a reference `from.field -> to`
    #[track_caller]
    pub fn link(&mut self, from: ObjectHandle, field: usize, to: ObjectHandle) {
        self.gc
            .write_field(from, field, Value::Ref(to))
            .unwrap_or_else(|e| panic!("Linking {}[{}] -> {} failed: {}", from, field, to, e));
    }

    /// Follow reference field `field` of `from`
    #[track_caller]
    pub fn follow(&self, from: ObjectHandle, field: usize) -> ObjectHandle {
        match self.gc.read_field(from, field) {
            Ok(Value::Ref(target)) => target,
            other => panic!("{}[{}] is not a reference: {:?}", from, field, other),
        }
    }

    /// Current handle of a root
    #[track_caller]
    pub fn root(&self, id: RootId) -> ObjectHandle {
        self.gc
            .root(id)
            .unwrap_or_else(|| panic!("{} is not registered", id))
    }

    /// Run a cycle and check the post-cycle invariants
    ///
    /// **Bug this finds:** Cycles leaving the heap fragmented, inconsistent
    /// or with dangling references
    #[track_caller]
    pub fn collect(&mut self) -> usize {
        let cycles_before = self.gc.cycle_count();
        let reclaimed = self.gc.collect();
        assert_gc_cycle_increased(cycles_before, self.gc.cycle_count(), "collect()");
        assert_post_cycle_invariants(&self.gc, "after collect()");
        reclaimed
    }

    pub fn state(&self) -> GcState {
        self.gc.state()
    }

    pub fn cycle_count(&self) -> u64 {
        self.gc.cycle_count()
    }
}

/// ============================================================================
/// HEAP MODEL HELPERS
/// ============================================================================

/// Stamps of every live object
pub fn live_stamps(gc: &GarbageCollector) -> BTreeSet<u64> {
    gc.objects().iter().map(|h| h.stamp()).collect()
}

/// Stamps of every object reachable from the registered roots
///
/// Independent of the collector's marker: walks fields through the
/// public API only.
pub fn reachable_stamps(gc: &GarbageCollector) -> BTreeSet<u64> {
    let mut seen = BTreeSet::new();
    let mut queue: VecDeque<ObjectHandle> = gc.roots().into_iter().collect();

    while let Some(handle) = queue.pop_front() {
        if !seen.insert(handle.stamp()) {
            continue;
        }
        let count = gc
            .field_count(handle)
            .unwrap_or_else(|e| panic!("reachable handle {} is dead: {}", handle, e));
        for index in 0..count {
            if let Ok(Value::Ref(target)) = gc.read_field(handle, index) {
                queue.push_back(target);
            }
        }
    }
    seen
}

/// Field values of every live object keyed by stamp, with references
/// replaced by the target's stamp
pub fn field_snapshot(gc: &GarbageCollector) -> HashMap<u64, Vec<FieldShape>> {
    gc.objects()
        .into_iter()
        .map(|handle| {
            let count = gc.field_count(handle).unwrap_or(0);
            let fields = (0..count)
                .map(|index| match gc.read_field(handle, index) {
                    Ok(Value::Null) => FieldShape::Null,
                    Ok(Value::Scalar(v)) => FieldShape::Scalar(v),
                    Ok(Value::Ref(target)) => FieldShape::Ref(target.stamp()),
                    Err(e) => panic!("reading {}[{}] failed: {}", handle, index, e),
                })
                .collect();
            (handle.stamp(), fields)
        })
        .collect()
}

/// Address-independent view of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldShape {
    Null,
    Scalar(u64),
    Ref(u64),
}

/// ============================================================================
/// STRICT ASSERTION HELPERS
/// ============================================================================

/// Assert that a handle no longer resolves
///
/// **Bug this finds:** Garbage not reclaimed, stale handles resolving to
/// a different object after address reuse
/// **Tolerance:** ZERO
#[track_caller]
pub fn assert_invalid_handle(gc: &GarbageCollector, handle: ObjectHandle, context: &str) {
    assert!(
        !gc.is_live(handle),
        "{}: handle {} still resolves - object was not reclaimed or stamp check failed",
        context,
        handle
    );
    assert_eq!(
        gc.read_field(handle, 0),
        Err(GcError::InvalidHandle { handle }),
        "{}: read_field on stale handle {} must fail with InvalidHandle",
        context,
        handle
    );
}

/// Assert that a handle resolves
///
/// **Bug this finds:** Live objects incorrectly collected
#[track_caller]
pub fn assert_live(gc: &GarbageCollector, handle: ObjectHandle, context: &str) {
    assert!(
        gc.is_live(handle),
        "{}: handle {} does not resolve - live object was collected or not forwarded",
        context,
        handle
    );
}

/// Assert that free space is one region directly after the live data
///
/// **Bug this finds:** Compaction leaving holes, free map not rebuilt
/// **Tolerance:** ZERO - exactly one free region unless full or empty
#[track_caller]
pub fn assert_contiguous(gc: &GarbageCollector, context: &str) {
    let stats = gc.stats();
    let expected_regions = usize::from(stats.free_bytes > 0);
    assert_eq!(
        stats.free_regions, expected_regions,
        "{}: {} free regions after compaction (free bytes {}), expected {}",
        context, stats.free_regions, stats.free_bytes, expected_regions
    );
    assert!(
        gc.heap().is_compacted(),
        "{}: live objects do not form one run from the heap base",
        context
    );
}

/// Assert that every reference field names a live object
///
/// **Bug this finds:** Pointer fix-up missing a field, forwarding errors
#[track_caller]
pub fn assert_no_dangling_references(gc: &GarbageCollector, context: &str) {
    for handle in gc.objects() {
        let count = gc.field_count(handle).unwrap_or(0);
        for index in 0..count {
            if let Ok(Value::Ref(target)) = gc.read_field(handle, index) {
                assert!(
                    gc.is_live(target),
                    "{}: {}[{}] references dead object {}",
                    context,
                    handle,
                    index,
                    target
                );
            }
        }
    }
    for root in gc.roots() {
        assert!(gc.is_live(root), "{}: root {} is dead", context, root);
    }
}

/// Assert live + free == capacity and the verifier passes
#[track_caller]
pub fn assert_heap_consistent(gc: &GarbageCollector, context: &str) {
    let stats = gc.stats();
    assert_eq!(
        stats.live_bytes + stats.free_bytes,
        stats.capacity,
        "{}: live {} + free {} != capacity {}",
        context,
        stats.live_bytes,
        stats.free_bytes,
        stats.capacity
    );
    if let Err(err) = gc.verify_heap() {
        panic!("{}: heap verification failed: {}", context, err);
    }
}

/// Everything that must hold after any completed cycle
#[track_caller]
pub fn assert_post_cycle_invariants(gc: &GarbageCollector, context: &str) {
    assert_eq!(gc.state(), GcState::Idle, "{}: GC not idle after cycle", context);
    assert_heap_consistent(gc, context);
    assert_contiguous(gc, context);
    assert_no_dangling_references(gc, context);
    assert_eq!(
        live_stamps(gc),
        reachable_stamps(gc),
        "{}: live set differs from the set reachable from roots",
        context
    );
}

/// Assert that GC cycle count increased
///
/// **Bug this finds:** GC not actually running, cycle counter bug
#[track_caller]
pub fn assert_gc_cycle_increased(before: u64, after: u64, context: &str) {
    assert!(
        after > before,
        "{}: GC cycle count did not increase (before={}, after={}) - GC did not execute",
        context,
        before,
        after
    );
}
