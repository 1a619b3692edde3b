//! Heap Management Module - Linear Heap Store
//!
//! The heap is one bounded linear address range `[base, base + capacity)`.
//! At any moment it is partitioned into object records and free regions:
//!
//! ```text
//! base                                                      base + capacity
//! ┌────────┬──────┬────────────┬──────────────┬────────┬─────────────┐
//! │ obj A  │ free │   obj B    │     free     │ obj C  │    free     │
//! └────────┴──────┴────────────┴──────────────┴────────┴─────────────┘
//!  objects: BTreeMap<address, ObjectRecord>   (heap order)
//!  free:    FreeSpaceMap                      (coalesced regions)
//! ```
//!
//! The store itself does no policy. The allocator carves space from it,
//! the sweeper frees records into it, and the compactor rebuilds it.

pub mod free_map;
pub mod verify;

pub use free_map::FreeSpaceMap;
pub use verify::{verify_heap, HeapVerifyError};

use crate::error::{GcError, Result};
use crate::gc_invariant;
use crate::object::{ObjectHandle, ObjectRecord};
use serde::Serialize;
use std::collections::BTreeMap;

/// HeapStore - records plus free-space map over one address range
#[derive(Debug, Clone)]
pub struct HeapStore {
    /// Address of the first heap byte
    base: usize,

    /// Heap size in bytes
    capacity: usize,

    /// Live records keyed by start address
    objects: BTreeMap<usize, ObjectRecord>,

    /// Free regions
    free: FreeSpaceMap,

    /// Sum of record sizes
    live_bytes: usize,
}

impl HeapStore {
    /// Create an empty heap covering `[base, base + capacity)`
    pub fn new(base: usize, capacity: usize) -> Self {
        Self {
            base,
            capacity,
            objects: BTreeMap::new(),
            free: FreeSpaceMap::with_region(base, capacity),
            live_bytes: 0,
        }
    }

    #[inline]
    pub fn base(&self) -> usize {
        self.base
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// One past the last heap byte
    #[inline]
    pub fn end(&self) -> usize {
        self.base + self.capacity
    }

    #[inline]
    pub fn live_bytes(&self) -> usize {
        self.live_bytes
    }

    #[inline]
    pub fn free_bytes(&self) -> usize {
        self.free.free_bytes()
    }

    #[inline]
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    #[inline]
    pub fn free_map(&self) -> &FreeSpaceMap {
        &self.free
    }

    /// Resolve a handle to its record
    pub fn get(&self, handle: ObjectHandle) -> Option<&ObjectRecord> {
        self.objects
            .get(&handle.address())
            .filter(|record| record.matches(handle.address(), handle))
    }

    /// Resolve a handle to its record, mutably
    pub fn get_mut(&mut self, handle: ObjectHandle) -> Option<&mut ObjectRecord> {
        self.objects
            .get_mut(&handle.address())
            .filter(|record| record.matches(handle.address(), handle))
    }

    /// Resolve a handle or fail with `InvalidHandle`
    pub fn resolve(&self, handle: ObjectHandle) -> Result<&ObjectRecord> {
        self.get(handle).ok_or(GcError::InvalidHandle { handle })
    }

    /// Resolve a handle mutably or fail with `InvalidHandle`
    pub fn resolve_mut(&mut self, handle: ObjectHandle) -> Result<&mut ObjectRecord> {
        self.get_mut(handle).ok_or(GcError::InvalidHandle { handle })
    }

    /// Whether `handle` names a live record
    #[inline]
    pub fn is_live(&self, handle: ObjectHandle) -> bool {
        self.get(handle).is_some()
    }

    /// Records in heap (address) order
    pub fn records(&self) -> impl Iterator<Item = (usize, &ObjectRecord)> + '_ {
        self.objects.iter().map(|(&address, record)| (address, record))
    }

    pub(crate) fn records_mut(&mut self) -> impl Iterator<Item = (usize, &mut ObjectRecord)> + '_ {
        self.objects
            .iter_mut()
            .map(|(&address, record)| (address, record))
    }

    /// Handles of all records in heap order
    pub fn handles(&self) -> Vec<ObjectHandle> {
        self.records()
            .map(|(address, record)| ObjectHandle::new(address, record.stamp()))
            .collect()
    }

    /// Carve `size` bytes first-fit; the caller must place a record there
    pub(crate) fn carve(&mut self, size: usize) -> Option<usize> {
        self.free.first_fit(size)
    }

    /// Store a record in space previously carved at `address`
    pub(crate) fn place(&mut self, address: usize, record: ObjectRecord) {
        let size = record.size();
        gc_invariant!(
            address >= self.base && address + size <= self.end(),
            "record {:#x}+{} outside heap [{:#x}, {:#x})",
            address,
            size,
            self.base,
            self.end()
        );
        let previous = self.objects.insert(address, record);
        gc_invariant!(
            previous.is_none(),
            "two records placed at {:#x}",
            address
        );
        self.live_bytes += size;
    }

    /// Free a record and return its space to the free-space map
    ///
    /// Adjacent free regions are coalesced. Returns the number of bytes
    /// released.
    pub fn free(&mut self, handle: ObjectHandle) -> Result<usize> {
        if !self.is_live(handle) {
            return Err(GcError::InvalidHandle { handle });
        }
        Ok(self.free_at(handle.address()))
    }

    /// Free whatever record sits at `address`
    pub(crate) fn free_at(&mut self, address: usize) -> usize {
        match self.objects.remove(&address) {
            Some(record) => {
                let size = record.size();
                self.live_bytes -= size;
                self.free.insert(address, size);
                size
            }
            None => 0,
        }
    }

    /// Remove every record, handing them to the caller in heap order
    ///
    /// Leaves the heap with no records and no free space; the caller must
    /// re-place records and call [`reset_free_space`](Self::reset_free_space).
    pub(crate) fn take_records(&mut self) -> BTreeMap<usize, ObjectRecord> {
        self.live_bytes = 0;
        self.free = FreeSpaceMap::new();
        std::mem::take(&mut self.objects)
    }

    /// Replace the free-space map with one region `[start, end)`
    pub(crate) fn reset_free_space(&mut self, start: usize) {
        gc_invariant!(
            start >= self.base && start <= self.end(),
            "free space start {:#x} outside heap",
            start
        );
        self.free.reset(start, self.end() - start);
    }

    /// Whether live records form one run from `base` with free space after
    pub fn is_compacted(&self) -> bool {
        let mut cursor = self.base;
        for (address, record) in self.records() {
            if address != cursor {
                return false;
            }
            cursor += record.size();
        }
        self.free.len() <= 1 && self.free.iter().all(|(start, _)| start == cursor)
    }

    /// Heap statistics snapshot
    pub fn stats(&self) -> HeapStats {
        HeapStats {
            live_bytes: self.live_bytes,
            free_bytes: self.free.free_bytes(),
            object_count: self.objects.len(),
            capacity: self.capacity,
            free_regions: self.free.len(),
            largest_free_region: self.free.largest(),
            utilization: if self.capacity == 0 {
                0.0
            } else {
                self.live_bytes as f64 / self.capacity as f64
            },
        }
    }
}

/// Heap statistics - result of `stats()`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HeapStats {
    /// Bytes occupied by live records
    pub live_bytes: usize,
    /// Bytes in free regions
    pub free_bytes: usize,
    /// Number of live records
    pub object_count: usize,
    /// Total heap size
    pub capacity: usize,
    /// Number of free regions (1 after compaction unless full/empty)
    pub free_regions: usize,
    /// Size of the largest free region
    pub largest_free_region: usize,
    /// live_bytes / capacity (0.0 - 1.0)
    pub utilization: f64,
}
