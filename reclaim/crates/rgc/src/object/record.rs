//! Object Record - what the heap stores at an object's address
//!
//! Record layout (logical):
//! ┌─────────────────────────────────────────┐
//! │  stamp   - allocation identity          │
//! │  size    - bytes occupied in the heap   │
//! │  marked  - mark bit, owned by Marker    │
//! ├─────────────────────────────────────────┤
//! │  fields  - size / FIELD_SIZE slots      │
//! └─────────────────────────────────────────┘

use super::handle::{ObjectHandle, Value};

/// Bytes covered by one field slot
pub const FIELD_SIZE: usize = 8;

/// One object in the heap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRecord {
    stamp: u64,
    size: usize,
    marked: bool,
    fields: Vec<Value>,
}

impl ObjectRecord {
    /// Create a zero-initialized record of `size` bytes
    pub fn new(stamp: u64, size: usize) -> Self {
        Self {
            stamp,
            size,
            marked: false,
            fields: vec![Value::Null; size / FIELD_SIZE],
        }
    }

    #[inline]
    pub fn stamp(&self) -> u64 {
        self.stamp
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    #[inline]
    pub fn fields(&self) -> &[Value] {
        &self.fields
    }

    pub fn field(&self, index: usize) -> Option<Value> {
        self.fields.get(index).copied()
    }

    /// Store `value`; returns false if `index` is out of range
    pub fn set_field(&mut self, index: usize, value: Value) -> bool {
        match self.fields.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Non-null references held by this record, in field order
    pub fn references(&self) -> impl Iterator<Item = ObjectHandle> + '_ {
        self.fields.iter().filter_map(Value::as_handle)
    }

    /// Mutable access to every reference field, for pointer fix-up
    pub(crate) fn reference_slots_mut(&mut self) -> impl Iterator<Item = &mut ObjectHandle> + '_ {
        self.fields.iter_mut().filter_map(|field| match field {
            Value::Ref(handle) => Some(handle),
            _ => None,
        })
    }

    #[inline]
    pub fn is_marked(&self) -> bool {
        self.marked
    }

    /// Set the mark bit; returns true if it was already set
    #[inline]
    pub(crate) fn set_marked(&mut self) -> bool {
        std::mem::replace(&mut self.marked, true)
    }

    #[inline]
    pub(crate) fn clear_mark(&mut self) {
        self.marked = false;
    }

    /// Whether `handle` names this record when it sits at `address`
    #[inline]
    pub fn matches(&self, address: usize, handle: ObjectHandle) -> bool {
        handle.address() == address && handle.stamp() == self.stamp
    }
}
