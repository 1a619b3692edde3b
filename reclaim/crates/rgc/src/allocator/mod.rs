//! Allocator Module - First-Fit Object Allocation
//!
//! Carves new object slots out of the [`HeapStore`]'s free-space map.
//!
//! ## Allocation Flow
//!
//! 1. Reject zero-sized requests
//! 2. Walk free regions in address order, take the first one large enough
//! 3. Place a zero-initialized record with a fresh stamp at its start
//! 4. No region large enough -> `OutOfMemory` (the driver decides whether
//!    to collect and retry)
//!
//! Right after compaction the free space is one region at the top of the
//! live data, so first-fit degenerates to bump-pointer allocation.

use crate::error::{GcError, Result};
use crate::heap::HeapStore;
use crate::object::{ObjectHandle, ObjectRecord};

/// First-fit allocator
///
/// Owns the stamp sequence, so it is the only component that creates
/// object records.
#[derive(Debug)]
pub struct Allocator {
    /// Next allocation stamp (never reused)
    next_stamp: u64,

    /// Successful allocations
    allocations: u64,

    /// Bytes handed out by successful allocations
    bytes_allocated: u64,

    /// Requests that found no free region
    failed_allocations: u64,
}

impl Allocator {
    pub fn new() -> Self {
        Self {
            next_stamp: 1,
            allocations: 0,
            bytes_allocated: 0,
            failed_allocations: 0,
        }
    }

    /// Allocate a zero-initialized record of `size` bytes
    ///
    /// # Returns
    /// * `Ok(ObjectHandle)` - handle to the new record
    /// * `Err(InvalidArgument)` - `size == 0`
    /// * `Err(OutOfMemory)` - no free region of `size` bytes
    pub fn allocate(&mut self, heap: &mut HeapStore, size: usize) -> Result<ObjectHandle> {
        if size == 0 {
            return Err(GcError::InvalidArgument(
                "allocation size must be > 0".to_string(),
            ));
        }

        let address = match heap.carve(size) {
            Some(address) => address,
            None => {
                self.failed_allocations += 1;
                log::debug!(
                    "first-fit found no region for {} bytes ({} free in {} regions)",
                    size,
                    heap.free_bytes(),
                    heap.free_map().len()
                );
                return Err(GcError::OutOfMemory {
                    requested: size,
                    available: heap.free_bytes(),
                    largest_free: heap.free_map().largest(),
                });
            }
        };

        let stamp = self.next_stamp;
        self.next_stamp += 1;
        heap.place(address, ObjectRecord::new(stamp, size));

        self.allocations += 1;
        self.bytes_allocated += size as u64;
        log::trace!("allocated {} bytes at {:#x} (stamp {})", size, address, stamp);

        Ok(ObjectHandle::new(address, stamp))
    }

    /// Whether a request of `size` bytes would currently succeed
    pub fn can_allocate(&self, heap: &HeapStore, size: usize) -> bool {
        size > 0 && heap.free_map().largest() >= size
    }

    /// Get statistics
    pub fn stats(&self) -> AllocatorStats {
        AllocatorStats {
            allocations: self.allocations,
            bytes_allocated: self.bytes_allocated,
            failed_allocations: self.failed_allocations,
        }
    }
}

impl Default for Allocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics for allocator
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AllocatorStats {
    /// Successful allocations
    pub allocations: u64,
    /// Bytes handed out
    pub bytes_allocated: u64,
    /// Requests that found no free region (before any retry)
    pub failed_allocations: u64,
}
