//! Object Handles and Field Values
//!
//! A handle names an object by its heap address plus the stamp the
//! allocator gave it:
//!
//! ```text
//! ObjectHandle
//! ┌──────────────────────┬──────────────────┐
//! │  address (usize)     │   stamp (u64)    │
//! │  first byte of slot  │  unique per      │
//! │  changes on compact  │  allocation      │
//! └──────────────────────┴──────────────────┘
//! ```
//!
//! Compaction changes the address and keeps the stamp. A handle only
//! resolves when both match the record currently at that address, so a
//! handle to a reclaimed object stays invalid even after its address is
//! reused.

use serde::Serialize;
use std::fmt;

/// Handle to an object record in the heap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ObjectHandle {
    address: usize,
    stamp: u64,
}

impl ObjectHandle {
    /// Create a handle from raw parts
    ///
    /// Handles built by hand are only useful for lookups; they resolve only
    /// if a record with this exact address and stamp exists.
    pub const fn new(address: usize, stamp: u64) -> Self {
        Self { address, stamp }
    }

    /// Heap address of the object's first byte
    #[inline]
    pub const fn address(&self) -> usize {
        self.address
    }

    /// Allocation stamp
    #[inline]
    pub const fn stamp(&self) -> u64 {
        self.stamp
    }

    /// Same object, new address
    #[inline]
    pub(crate) const fn relocated(&self, address: usize) -> Self {
        Self {
            address,
            stamp: self.stamp,
        }
    }
}

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}#{}", self.address, self.stamp)
    }
}

/// Content of one object field
///
/// `Null` is the zero value every field starts with; it doubles as the
/// null reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum Value {
    /// Null reference / zero-initialized field
    #[default]
    Null,
    /// Plain data word, never traced
    Scalar(u64),
    /// Reference to another object
    Ref(ObjectHandle),
}

impl Value {
    /// Referenced handle, if this is a non-null reference
    #[inline]
    pub fn as_handle(&self) -> Option<ObjectHandle> {
        match self {
            Value::Ref(handle) => Some(*handle),
            _ => None,
        }
    }

    /// Scalar payload, if this is a scalar
    #[inline]
    pub fn as_scalar(&self) -> Option<u64> {
        match self {
            Value::Scalar(v) => Some(*v),
            _ => None,
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<ObjectHandle> for Value {
    fn from(handle: ObjectHandle) -> Self {
        Value::Ref(handle)
    }
}

impl From<Option<ObjectHandle>> for Value {
    fn from(handle: Option<ObjectHandle>) -> Self {
        handle.map_or(Value::Null, Value::Ref)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Scalar(v)
    }
}
