//! Marker Module - Reachability Marking
//!
//! This module computes the exact set of live objects for one cycle.
//!
//! Marking Algorithm:
//! - Tri-color marking (White, Grey, Black)
//!   - White: mark bit clear, not reached yet
//!   - Grey: mark bit set, queued in the [`MarkQueue`], fields not scanned
//!   - Black: mark bit set, fields scanned
//! - Breadth-first from the root snapshot
//! - An object is queued only when its mark bit flips, so every object is
//!   scanned at most once and reference cycles terminate
//!
//! Marking runs stop-the-world: the marker holds `&mut HeapStore` for the
//! whole pass.

pub mod mark_queue;
pub mod roots;

pub use mark_queue::{MarkQueue, MarkQueueStats};
pub use roots::{RootDescriptor, RootId, RootRegistry, RootSnapshot, RootStats};

use crate::gc_invariant;
use crate::heap::HeapStore;
use crate::object::ObjectHandle;

/// Marker - owns the mark bits for the duration of a marking pass
#[derive(Debug, Default)]
pub struct Marker {
    /// Grey objects
    queue: MarkQueue,

    /// Scratch buffer for the references of the object being scanned
    scratch: Vec<ObjectHandle>,
}

impl Marker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark every object reachable from `roots`
    ///
    /// Clears all mark bits first, so running this twice on an unchanged
    /// heap produces the same marking.
    ///
    /// # Panics
    /// If a root or a reference field of a reachable object names a record
    /// that is not live. Either means a dangling reference already exists.
    pub fn mark(&mut self, heap: &mut HeapStore, roots: &RootSnapshot) -> MarkStats {
        self.queue.clear();
        Self::clear_marks(heap);

        let mut stats = MarkStats::default();

        for root in roots.handles() {
            stats.roots_scanned += 1;
            let record = heap.get_mut(root);
            gc_invariant!(record.is_some(), "root {} is not a live object", root);
            if let Some(record) = record {
                if !record.set_marked() {
                    stats.objects_marked += 1;
                    stats.bytes_marked += record.size();
                    self.queue.push(root);
                }
            }
        }

        while let Some(object) = self.queue.pop() {
            self.scratch.clear();
            if let Some(record) = heap.get(object) {
                self.scratch.extend(record.references());
            }

            for &child in &self.scratch {
                let record = heap.get_mut(child);
                gc_invariant!(
                    record.is_some(),
                    "object {} references dead object {}",
                    object,
                    child
                );
                if let Some(record) = record {
                    if !record.set_marked() {
                        stats.objects_marked += 1;
                        stats.bytes_marked += record.size();
                        self.queue.push(child);
                    }
                }
            }
        }

        let queue_stats = self.queue.stats();
        stats.enqueued = queue_stats.enqueued;
        stats.processed = queue_stats.processed;

        log::debug!(
            "marked {} objects ({} bytes) from {} roots",
            stats.objects_marked,
            stats.bytes_marked,
            stats.roots_scanned
        );

        stats
    }

    /// Reset every mark bit to false
    pub fn clear_marks(heap: &mut HeapStore) {
        for (_, record) in heap.records_mut() {
            record.clear_mark();
        }
    }

    /// Check whether an object is currently marked
    pub fn is_marked(heap: &HeapStore, object: ObjectHandle) -> bool {
        heap.get(object).is_some_and(|record| record.is_marked())
    }

    /// Mark bits in heap order, for comparing two passes
    pub fn mark_bits(heap: &HeapStore) -> Vec<(usize, bool)> {
        heap.records()
            .map(|(address, record)| (address, record.is_marked()))
            .collect()
    }
}

/// Result of one marking pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MarkStats {
    /// Root entries scanned (duplicates included)
    pub roots_scanned: usize,
    /// Objects whose mark bit was set
    pub objects_marked: usize,
    /// Bytes of marked objects
    pub bytes_marked: usize,
    /// Objects pushed on the mark queue
    pub enqueued: usize,
    /// Objects popped and scanned
    pub processed: usize,
}
