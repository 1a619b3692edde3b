//! GC Correctness Tests - Garbage Collection Behavior Verification
//!
//! These tests verify that the GC correctly:
//! - Reclaims unreachable objects, including unreachable cycles
//! - Preserves every object reachable from a root
//! - Keeps field contents intact across a cycle
//! - Leaves no dangling references behind
//!
//! ============================================================================
//! EACH TEST FINDS SPECIFIC GC CORRECTNESS BUGS - DO NOT WEAKEN ASSERTIONS
//! ============================================================================

mod common;

use common::{
    assert_invalid_handle, assert_live, assert_no_dangling_references, field_snapshot,
    live_stamps, reachable_stamps, GcFixture,
};
use rgc::{GcError, GcReason, GcState, Value};

/// ============================================================================
/// SCENARIOS
/// ============================================================================

/// Cyclic garbage: A <-> B with no root
///
/// **Bug this finds:** Reference-counting style liveness, cycles kept alive
/// **Invariant verified:** Reclaimed bytes == size(A) + size(B), both handles invalid
#[test]
fn test_cyclic_garbage_reclaimed() {
    // Arrange
    let mut fixture = GcFixture::with_defaults();
    let a = fixture.allocate(8);
    let b = fixture.allocate(8);
    fixture.link(a, 0, b);
    fixture.link(b, 0, a);

    // Act
    let reclaimed = fixture.collect();

    // Assert
    assert_eq!(reclaimed, 16, "cycle A<->B must be reclaimed completely");
    assert_invalid_handle(&fixture.gc, a, "A after cycle");
    assert_invalid_handle(&fixture.gc, b, "B after cycle");
    assert_eq!(fixture.gc.stats().object_count, 0);
}

/// Simple survival: rooted A survives, unrooted B does not
///
/// **Invariant verified:** A's handle stays valid with unchanged fields
#[test]
fn test_simple_survival() {
    let mut fixture = GcFixture::with_defaults();
    let a = fixture.allocate(24);
    fixture.gc.register_root(a).unwrap();
    fixture.gc.write_field(a, 0, Value::Scalar(11)).unwrap();
    fixture.gc.write_field(a, 2, Value::Scalar(33)).unwrap();
    let b = fixture.allocate(16);

    let reclaimed = fixture.collect();

    assert_eq!(reclaimed, 16);
    assert_live(&fixture.gc, a, "rooted A");
    assert_eq!(fixture.gc.read_field(a, 0), Ok(Value::Scalar(11)));
    assert_eq!(fixture.gc.read_field(a, 1), Ok(Value::Null));
    assert_eq!(fixture.gc.read_field(a, 2), Ok(Value::Scalar(33)));
    assert_invalid_handle(&fixture.gc, b, "unrooted B");
}

/// Allocation failure: heap full of rooted objects
///
/// **Bug this finds:** Collector freeing reachable objects under pressure
/// **Invariant verified:** OutOfMemory returned, every object still live
#[test]
fn test_oom_when_heap_full_of_rooted_objects() {
    let mut fixture = GcFixture::with_minimal_heap();
    let objects: Vec<_> = (0..fixture.config.heap_size / 32)
        .map(|_| fixture.allocate_rooted(32).0)
        .collect();
    assert_eq!(fixture.gc.stats().free_bytes, 0);

    let result = fixture.gc.allocate(1);

    assert!(
        matches!(result, Err(GcError::OutOfMemory { requested: 1, .. })),
        "expected OutOfMemory, got {:?}",
        result
    );
    assert!(result.unwrap_err().is_recoverable());
    assert_eq!(fixture.cycle_count(), 1, "allocation failure must run one cycle");
    for handle in objects {
        assert_live(&fixture.gc, handle, "rooted object after OOM");
    }
}

/// ============================================================================
/// REACHABILITY
/// ============================================================================

/// Transitive closure through several hops survives
///
/// **Bug this finds:** Marker scanning only roots, not their fields
#[test]
fn test_transitively_reachable_objects_survive() {
    let mut fixture = GcFixture::with_defaults();
    let (head, head_id) = fixture.allocate_rooted(16);
    let mut tail = head;
    for i in 0..10 {
        let next = fixture.allocate(16);
        fixture.gc.write_field(next, 1, Value::Scalar(i)).unwrap();
        fixture.link(tail, 0, next);
        tail = next;
    }
    fixture.allocate_many(5, 16);

    let reclaimed = fixture.collect();

    assert_eq!(reclaimed, 5 * 16);
    let mut cursor = fixture.root(head_id);
    for i in 0..10 {
        cursor = fixture.follow(cursor, 0);
        assert_eq!(fixture.gc.read_field(cursor, 1), Ok(Value::Scalar(i)));
    }
    assert_eq!(fixture.gc.read_field(cursor, 0), Ok(Value::Null));
}

/// Live set equals the reachable set
///
/// **Invariant verified:** live objects after a cycle == reachable from roots
#[test]
fn test_live_set_equals_reachable_set() {
    let mut fixture = GcFixture::with_defaults();
    let objects = fixture.allocate_many(12, 24);
    // Two disjoint graphs; only the first is rooted.
    fixture.link(objects[0], 0, objects[3]);
    fixture.link(objects[3], 1, objects[7]);
    fixture.link(objects[7], 2, objects[0]);
    fixture.link(objects[1], 0, objects[2]);
    fixture.link(objects[2], 0, objects[1]);
    fixture.gc.register_root(objects[0]).unwrap();

    let expected = reachable_stamps(&fixture.gc);
    fixture.collect();

    assert_eq!(live_stamps(&fixture.gc), expected);
    assert_eq!(expected.len(), 3);
}

/// Field contents survive relocation
///
/// **Bug this finds:** Compaction copying records wrongly or losing fields
#[test]
fn test_fields_preserved_across_compaction() {
    let mut fixture = GcFixture::with_defaults();
    let garbage = fixture.allocate(64);
    let a = fixture.allocate(32);
    let b = fixture.allocate(32);
    fixture.gc.register_root(a).unwrap();
    fixture.gc.write_field(a, 0, Value::Scalar(u64::MAX)).unwrap();
    fixture.link(a, 3, b);
    fixture.gc.write_field(b, 1, Value::Scalar(5)).unwrap();
    fixture.link(b, 2, a);
    fixture.gc.unregister_root(a).unwrap();
    let root = fixture.gc.register_root(a).unwrap();

    let before = field_snapshot(&fixture.gc);
    fixture.collect();
    let after = field_snapshot(&fixture.gc);

    assert_invalid_handle(&fixture.gc, garbage, "garbage");
    for (stamp, fields) in &after {
        assert_eq!(Some(fields), before.get(stamp), "fields of object #{}", stamp);
    }
    assert_eq!(after.len(), 2);
    assert_eq!(fixture.root(root).stamp(), a.stamp());
}

/// Unregistering the only root makes the graph collectable
#[test]
fn test_unregistered_root_is_collected() {
    let mut fixture = GcFixture::with_defaults();
    let (a, id) = fixture.allocate_rooted(16);
    let b = fixture.allocate(16);
    fixture.link(a, 0, b);

    assert_eq!(fixture.collect(), 0);
    assert_eq!(fixture.gc.unregister_root_id(id), Ok(a));

    assert_eq!(fixture.collect(), 32);
    assert_eq!(fixture.gc.stats().live_bytes, 0);
}

/// A root registered twice survives until both registrations are gone
#[test]
fn test_duplicate_root_registrations() {
    let mut fixture = GcFixture::with_defaults();
    let a = fixture.allocate(8);
    fixture.gc.register_root(a).unwrap();
    fixture.gc.register_root(a).unwrap();

    fixture.gc.unregister_root(a).unwrap();
    fixture.collect();
    assert_live(&fixture.gc, a, "still rooted once");

    fixture.gc.unregister_root(a).unwrap();
    fixture.collect();
    assert_invalid_handle(&fixture.gc, a, "no roots left");
}

/// Marking twice changes nothing
///
/// **Invariant verified:** Mark idempotence at the driver level
#[test]
fn test_back_to_back_cycles_are_stable() {
    let mut fixture = GcFixture::with_defaults();
    let (a, _) = fixture.allocate_rooted(16);
    let b = fixture.allocate(16);
    fixture.link(a, 0, b);
    fixture.allocate(16);

    fixture.collect();
    let live = live_stamps(&fixture.gc);
    let handles = fixture.gc.objects();

    assert_eq!(fixture.collect(), 0, "second cycle must reclaim nothing");
    assert_eq!(live_stamps(&fixture.gc), live);
    assert_eq!(fixture.gc.objects(), handles, "nothing moves on a compact heap");
    assert_no_dangling_references(&fixture.gc, "second cycle");
}

/// ============================================================================
/// DRIVER STATE
/// ============================================================================

#[test]
fn test_cycle_bookkeeping() {
    let mut fixture = GcFixture::with_defaults();
    fixture.allocate(40);
    fixture.collect();

    assert_eq!(fixture.state(), GcState::Idle);
    assert_eq!(fixture.cycle_count(), 1);
    let last = fixture.gc.last_cycle().expect("stats enabled");
    assert_eq!(last.cycle_id, 1);
    assert_eq!(last.reason, GcReason::Explicit);
    assert_eq!(last.bytes_reclaimed, 40);
    assert_eq!(last.objects_swept, 1);
    assert_eq!(last.heap_used_before, 40);
    assert_eq!(last.heap_used_after, 0);
}
