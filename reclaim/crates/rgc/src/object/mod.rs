//! Object Module - collector-managed object model
//!
//! This module defines the records stored in the heap and the handles the
//! host program uses to name them.

pub mod handle;
pub mod record;

pub use handle::{ObjectHandle, Value};
pub use record::{ObjectRecord, FIELD_SIZE};
