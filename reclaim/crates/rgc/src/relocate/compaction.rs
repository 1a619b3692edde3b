//! Compaction Plan - sliding destinations for surviving objects
//!
//! Survivors keep their relative order and slide towards the heap base:
//!
//! ```text
//! before:  │ A │ free │ B │ free  │ C │     free     │
//! after:   │ A │ B │ C │              free             │
//! ```
//!
//! Because destinations are assigned in increasing address order, every
//! object's new address is less than or equal to its old one.

use crate::heap::HeapStore;
use crate::object::ObjectHandle;

/// One planned move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relocation {
    /// Handle before the move
    pub from: ObjectHandle,
    /// Destination address
    pub to: usize,
    /// Bytes occupied
    pub size: usize,
}

impl Relocation {
    #[inline]
    pub fn moves(&self) -> bool {
        self.from.address() != self.to
    }
}

/// Destinations for every record in the heap
#[derive(Debug, Default, Clone)]
pub struct CompactionPlan {
    relocations: Vec<Relocation>,
    /// First free address after the compacted run
    end: usize,
}

impl CompactionPlan {
    /// Plan a slide of every record in `heap` towards `heap.base()`
    ///
    /// Expects the sweeper to have removed garbage already; every record
    /// present is treated as a survivor.
    pub fn build(heap: &HeapStore) -> Self {
        let mut cursor = heap.base();
        let relocations = heap
            .records()
            .map(|(address, record)| {
                let relocation = Relocation {
                    from: ObjectHandle::new(address, record.stamp()),
                    to: cursor,
                    size: record.size(),
                };
                cursor += record.size();
                relocation
            })
            .collect();

        Self {
            relocations,
            end: cursor,
        }
    }

    pub fn relocations(&self) -> &[Relocation] {
        &self.relocations
    }

    /// Start of the single free region after compaction
    pub fn end(&self) -> usize {
        self.end
    }

    /// Number of objects that change address
    pub fn moving_objects(&self) -> usize {
        self.relocations.iter().filter(|r| r.moves()).count()
    }

    /// Bytes that change address
    pub fn moving_bytes(&self) -> usize {
        self.relocations
            .iter()
            .filter(|r| r.moves())
            .map(|r| r.size)
            .sum()
    }

    /// Whether the heap is already compact
    pub fn is_noop(&self) -> bool {
        self.relocations.iter().all(|r| !r.moves())
    }
}
