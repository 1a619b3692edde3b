//! Relocate Module - Sliding Compaction
//!
//! Moves every survivor of a sweep to the low end of the heap, so that
//! free space becomes one contiguous region at the top.
//!
//! Compaction Steps:
//! 1. Plan destinations in heap order ([`CompactionPlan`])
//! 2. Build a [`ForwardingTable`] from the plan
//! 3. Rewrite every reference field of every survivor, and every root
//! 4. Move the records to their new addresses
//! 5. Replace the free-space map with the single region after the last
//!    survivor
//!
//! Pointer fix-up happens before the move, while every reference still
//! names an old address present in the forwarding table. Nothing outside
//! the heap and the root snapshot is rewritten, so handles the host holds
//! without rooting become stale.

pub mod compaction;
pub mod forwarding;

pub use compaction::{CompactionPlan, Relocation};
pub use forwarding::ForwardingTable;

use crate::gc_invariant;
use crate::heap::HeapStore;
use crate::marker::RootSnapshot;

/// Compactor - slides survivors to the heap base and fixes references
#[derive(Debug, Default)]
pub struct Compactor {
    /// Cycles in which at least one object moved
    compactions: u64,

    /// Bytes moved over the compactor's lifetime
    total_bytes_moved: u64,
}

impl Compactor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compact `heap`, rewriting references in survivors and `roots`
    ///
    /// Every record in `heap` must be a survivor (run the sweeper first).
    ///
    /// # Panics
    /// If a survivor or root references an object with no forwarding entry.
    pub fn compact(&mut self, heap: &mut HeapStore, roots: &mut RootSnapshot) -> RelocateStats {
        let plan = CompactionPlan::build(heap);
        let mut stats = RelocateStats {
            objects_relocated: plan.moving_objects(),
            bytes_moved: plan.moving_bytes(),
            survivors: plan.relocations().len(),
            free_start: plan.end(),
            ..Default::default()
        };

        if plan.is_noop() {
            // Survivors already tile [base, end); the coalesced free map is
            // the single region after them.
            log::debug!("compaction: heap already compact ({} survivors)", stats.survivors);
            return stats;
        }

        let mut forwarding = ForwardingTable::with_capacity(plan.relocations().len());
        for relocation in plan.relocations() {
            forwarding.insert(relocation.from, relocation.to);
        }

        for (_, record) in heap.records_mut() {
            for slot in record.reference_slots_mut() {
                *slot = forwarding.forward(*slot);
                stats.references_updated += 1;
            }
        }

        for handle in roots.handles_mut() {
            *handle = forwarding.forward(*handle);
            stats.roots_updated += 1;
        }

        let mut records = heap.take_records();
        for relocation in plan.relocations() {
            let record = records.remove(&relocation.from.address());
            gc_invariant!(
                record.is_some(),
                "planned record {} vanished during compaction",
                relocation.from
            );
            if let Some(record) = record {
                log::trace!(
                    "moved {} bytes {:#x} -> {:#x}",
                    relocation.size,
                    relocation.from.address(),
                    relocation.to
                );
                heap.place(relocation.to, record);
            }
        }
        gc_invariant!(
            records.is_empty(),
            "{} records were not in the compaction plan",
            records.len()
        );
        heap.reset_free_space(plan.end());

        self.compactions += 1;
        self.total_bytes_moved += stats.bytes_moved as u64;

        log::debug!(
            "compacted {} objects ({} bytes moved), free space starts at {:#x}",
            stats.objects_relocated,
            stats.bytes_moved,
            stats.free_start
        );

        stats
    }

    /// Cycles in which at least one object moved
    pub fn compactions(&self) -> u64 {
        self.compactions
    }

    pub fn total_bytes_moved(&self) -> u64 {
        self.total_bytes_moved
    }
}

/// Result of one compaction
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RelocateStats {
    /// Objects whose address changed
    pub objects_relocated: usize,
    /// Bytes whose address changed
    pub bytes_moved: usize,
    /// Objects present after compaction
    pub survivors: usize,
    /// Reference fields rewritten
    pub references_updated: usize,
    /// Root entries rewritten
    pub roots_updated: usize,
    /// Start of the free region
    pub free_start: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::Allocator;
    use crate::heap::verify_heap;
    use crate::object::Value;

    #[test]
    fn test_compact_moves_and_fixes_references() {
        let mut heap = HeapStore::new(0x1000, 128);
        let mut allocator = Allocator::new();
        let garbage = allocator.allocate(&mut heap, 32).unwrap();
        let a = allocator.allocate(&mut heap, 16).unwrap();
        let b = allocator.allocate(&mut heap, 16).unwrap();
        heap.get_mut(a).unwrap().set_field(0, Value::Ref(b));
        heap.get_mut(b).unwrap().set_field(1, Value::Ref(a));
        heap.free(garbage).unwrap();

        let mut roots = RootSnapshot::from_handles([a]);
        let stats = Compactor::new().compact(&mut heap, &mut roots);

        assert_eq!(stats.objects_relocated, 2);
        assert_eq!(stats.bytes_moved, 32);
        assert_eq!(stats.references_updated, 2);
        assert_eq!(stats.roots_updated, 1);

        let new_a = roots.handles().next().unwrap();
        assert_eq!(new_a.address(), 0x1000);
        assert_eq!(new_a.stamp(), a.stamp());
        assert!(!heap.is_live(a));

        let new_b = heap.get(new_a).unwrap().field(0).unwrap().as_handle().unwrap();
        assert_eq!(new_b.address(), 0x1010);
        assert_eq!(heap.get(new_b).unwrap().field(1), Some(Value::Ref(new_a)));

        assert!(heap.is_compacted());
        assert_eq!(heap.free_map().iter().collect::<Vec<_>>(), vec![(0x1020, 96)]);
        assert_eq!(verify_heap(&heap), Ok(()));
    }

    #[test]
    fn test_compact_of_compact_heap_moves_nothing() {
        let mut heap = HeapStore::new(0x1000, 64);
        let mut allocator = Allocator::new();
        let a = allocator.allocate(&mut heap, 16).unwrap();

        let mut roots = RootSnapshot::from_handles([a]);
        let mut compactor = Compactor::new();
        let stats = compactor.compact(&mut heap, &mut roots);

        assert_eq!(stats.objects_relocated, 0);
        assert_eq!(roots.handles().next(), Some(a));
        assert_eq!(compactor.compactions(), 0);
    }

    #[test]
    fn test_compact_empty_heap_restores_single_region() {
        let mut heap = HeapStore::new(0x1000, 64);
        let mut allocator = Allocator::new();
        let a = allocator.allocate(&mut heap, 16).unwrap();
        let b = allocator.allocate(&mut heap, 16).unwrap();
        heap.free(a).unwrap();
        heap.free(b).unwrap();

        Compactor::new().compact(&mut heap, &mut RootSnapshot::default());
        assert_eq!(heap.free_map().iter().collect::<Vec<_>>(), vec![(0x1000, 64)]);
    }

    #[test]
    fn test_full_heap_has_no_free_region() {
        let mut heap = HeapStore::new(0x1000, 32);
        let mut allocator = Allocator::new();
        let a = allocator.allocate(&mut heap, 16).unwrap();
        allocator.allocate(&mut heap, 16).unwrap();

        let mut roots = RootSnapshot::from_handles([a]);
        Compactor::new().compact(&mut heap, &mut roots);
        assert!(heap.free_map().is_empty());
        assert!(heap.is_compacted());
    }
}
