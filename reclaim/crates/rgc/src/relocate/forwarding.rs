//! Forwarding Table - old address to new handle during compaction
//!
//! Built from the compaction plan before any record moves, then used to
//! rewrite every reference field and every root. Discarded when the cycle
//! ends, so it never outlives the addresses it describes.

use crate::gc_invariant;
use crate::object::ObjectHandle;
use indexmap::IndexMap;

/// ForwardingTable - mapping of surviving objects to their new location
///
/// Entries keep insertion order, which is heap order when built from a
/// [`CompactionPlan`](super::CompactionPlan).
#[derive(Debug, Default)]
pub struct ForwardingTable {
    /// old address -> relocated handle (same stamp, new address)
    entries: IndexMap<usize, ObjectHandle>,
}

impl ForwardingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: IndexMap::with_capacity(capacity),
        }
    }

    /// Add forwarding entry for `old`
    ///
    /// # Panics
    /// If `old`'s address already has an entry.
    pub fn insert(&mut self, old: ObjectHandle, new_address: usize) {
        let previous = self.entries.insert(old.address(), old.relocated(new_address));
        gc_invariant!(
            previous.is_none(),
            "two forwarding entries for {:#x}",
            old.address()
        );
    }

    /// New handle for `old`, if `old` names a forwarded object
    ///
    /// The stamp must match: a handle to a different (freed) object that
    /// once lived at the same address is not forwarded.
    pub fn lookup(&self, old: ObjectHandle) -> Option<ObjectHandle> {
        self.entries
            .get(&old.address())
            .copied()
            .filter(|new| new.stamp() == old.stamp())
    }

    /// New handle for a reference that must survive the cycle
    ///
    /// # Panics
    /// If `old` has no entry. A surviving reference to an object that was
    /// not forwarded would dangle after compaction.
    pub fn forward(&self, old: ObjectHandle) -> ObjectHandle {
        let new = self.lookup(old);
        gc_invariant!(new.is_some(), "no forwarding entry for {}", old);
        new.unwrap_or(old)
    }

    /// Entries that change address
    pub fn moved(&self) -> impl Iterator<Item = (usize, ObjectHandle)> + '_ {
        self.entries
            .iter()
            .filter(|&(&old, new)| old != new.address())
            .map(|(&old, &new)| (old, new))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_keeps_stamp_and_moves_address() {
        let mut table = ForwardingTable::new();
        let old = ObjectHandle::new(0x1040, 7);
        table.insert(old, 0x1000);

        let new = table.lookup(old).unwrap();
        assert_eq!(new.address(), 0x1000);
        assert_eq!(new.stamp(), 7);
        assert_eq!(table.forward(old), new);
    }

    #[test]
    fn test_lookup_rejects_other_stamp() {
        let mut table = ForwardingTable::new();
        table.insert(ObjectHandle::new(0x1040, 7), 0x1000);
        assert_eq!(table.lookup(ObjectHandle::new(0x1040, 3)), None);
    }

    #[test]
    fn test_moved_skips_stationary_entries() {
        let mut table = ForwardingTable::new();
        table.insert(ObjectHandle::new(0x1000, 1), 0x1000);
        table.insert(ObjectHandle::new(0x1040, 2), 0x1010);
        let moved: Vec<_> = table.moved().map(|(old, _)| old).collect();
        assert_eq!(moved, vec![0x1040]);
        assert_eq!(table.len(), 2);
    }

    #[test]
    #[should_panic(expected = "GC invariant violated")]
    fn test_forward_missing_entry_is_fatal() {
        ForwardingTable::new().forward(ObjectHandle::new(0x2000, 1));
    }
}
