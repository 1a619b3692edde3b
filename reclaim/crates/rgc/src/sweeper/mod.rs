//! Sweeper Module - Reclaiming Unmarked Objects
//!
//! Runs after marking. Walks records in address order:
//! - unmarked -> freed, space returned to the free-space map (coalesced)
//! - marked   -> mark bit cleared for the next cycle, left in place
//!
//! No reference is rewritten here. An unmarked object is unreachable, so
//! no surviving object can point at it.

use crate::heap::HeapStore;

/// Sweeper - linear heap scan
#[derive(Debug, Default)]
pub struct Sweeper {
    /// Scratch list of garbage addresses found by the current scan
    garbage: Vec<usize>,
}

impl Sweeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Free every unmarked record and clear the survivors' mark bits
    pub fn sweep(&mut self, heap: &mut HeapStore) -> SweepStats {
        let mut stats = SweepStats::default();
        self.garbage.clear();

        for (address, record) in heap.records_mut() {
            if record.is_marked() {
                record.clear_mark();
                stats.survivors += 1;
                stats.surviving_bytes += record.size();
            } else {
                self.garbage.push(address);
            }
        }

        for &address in &self.garbage {
            let size = heap.free_at(address);
            log::trace!("swept {} bytes at {:#x}", size, address);
            stats.objects_swept += 1;
            stats.bytes_reclaimed += size;
        }

        stats.free_regions = heap.free_map().len();

        log::debug!(
            "swept {} objects ({} bytes), {} survivors, {} free regions",
            stats.objects_swept,
            stats.bytes_reclaimed,
            stats.survivors,
            stats.free_regions
        );

        stats
    }
}

/// Result of one sweep
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepStats {
    /// Records freed
    pub objects_swept: usize,
    /// Bytes returned to the free-space map
    pub bytes_reclaimed: usize,
    /// Records left in place
    pub survivors: usize,
    /// Bytes held by survivors
    pub surviving_bytes: usize,
    /// Free regions after the sweep (fragmentation before compaction)
    pub free_regions: usize,
}
