//! Free-Space Map - address-ordered free regions
//!
//! Tracks every free byte range of the heap as `(address, length)` pairs,
//! kept in a `BTreeMap` keyed by address so that first-fit search and
//! neighbour lookup for coalescing are both ordered walks.
//!
//! ```text
//! heap:  [obj A][ free ][obj B][   free    ][obj C][free]
//! map:          {a: 16}        {b: 48}              {c: 8}
//! ```
//!
//! Regions are always coalesced: two free regions never touch.

use crate::gc_invariant;
use std::collections::BTreeMap;

/// Address-ordered map of free regions
#[derive(Debug, Clone, Default)]
pub struct FreeSpaceMap {
    /// start address -> length in bytes
    regions: BTreeMap<usize, usize>,

    /// Sum of all region lengths
    free_bytes: usize,
}

impl FreeSpaceMap {
    /// Empty map (no free space)
    pub fn new() -> Self {
        Self::default()
    }

    /// Map with a single free region covering `[start, start + len)`
    pub fn with_region(start: usize, len: usize) -> Self {
        let mut map = Self::new();
        if len > 0 {
            map.regions.insert(start, len);
            map.free_bytes = len;
        }
        map
    }

    /// Carve `size` bytes from the first region large enough
    ///
    /// Returns the start address of the carved range. The remainder of the
    /// region, if any, stays in the map.
    pub fn first_fit(&mut self, size: usize) -> Option<usize> {
        let (&start, &len) = self.regions.iter().find(|&(_, &len)| len >= size)?;

        self.regions.remove(&start);
        if len > size {
            self.regions.insert(start + size, len - size);
        }
        self.free_bytes -= size;

        Some(start)
    }

    /// Return `[start, start + len)` to the map, merging with neighbours
    ///
    /// # Panics
    /// If the range overlaps an existing free region. That would mean the
    /// same bytes were freed twice, which breaks the heap partition.
    pub fn insert(&mut self, start: usize, len: usize) {
        if len == 0 {
            return;
        }

        let mut merged_start = start;
        let mut merged_len = len;

        if let Some((&prev_start, &prev_len)) = self.regions.range(..start).next_back() {
            let prev_end = prev_start + prev_len;
            gc_invariant!(
                prev_end <= start,
                "free region {:#x}+{} overlaps {:#x}+{}",
                start,
                len,
                prev_start,
                prev_len
            );
            if prev_end == start {
                self.regions.remove(&prev_start);
                merged_start = prev_start;
                merged_len += prev_len;
                log::trace!("coalesced free region {:#x} with predecessor {:#x}", start, prev_start);
            }
        }

        let end = start + len;
        if let Some((&next_start, &next_len)) = self.regions.range(start..).next() {
            gc_invariant!(
                end <= next_start,
                "free region {:#x}+{} overlaps {:#x}+{}",
                start,
                len,
                next_start,
                next_len
            );
            if end == next_start {
                self.regions.remove(&next_start);
                merged_len += next_len;
                log::trace!("coalesced free region {:#x} with successor {:#x}", start, next_start);
            }
        }

        self.regions.insert(merged_start, merged_len);
        self.free_bytes += len;
    }

    /// Replace the whole map with a single region (or nothing if `len == 0`)
    pub fn reset(&mut self, start: usize, len: usize) {
        *self = Self::with_region(start, len);
    }

    /// Total free bytes
    #[inline]
    pub fn free_bytes(&self) -> usize {
        self.free_bytes
    }

    /// Number of free regions
    #[inline]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Length of the largest free region
    pub fn largest(&self) -> usize {
        self.regions.values().copied().max().unwrap_or(0)
    }

    /// Regions in address order
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.regions.iter().map(|(&start, &len)| (start, len))
    }
}
