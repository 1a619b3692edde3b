//! Error Module - RGC Error Types
//!
//! Defines all error types returned by the collector API.
//!
//! # Error Categories
//!
//! ## Recoverable
//! - `OutOfMemory` - no free region large enough, even after a full cycle
//!
//! ## Caller Bugs
//! - `InvalidHandle` - handle is stale or was never allocated
//! - `FieldOutOfBounds` - field index past the record's field count
//! - `InvalidArgument` - argument fails validation (e.g. zero-sized allocation)
//! - `InvalidState` - operation not allowed in the current driver state
//!
//! ## Configuration
//! - `Configuration` - invalid `GcConfig`
//!
//! Invariant violations inside the collector are not represented here.
//! They panic through [`gc_invariant!`](crate::gc_invariant), because a
//! heap that broke its partition or reachability invariant cannot be used
//! safely afterwards.

use crate::object::ObjectHandle;
use thiserror::Error;

/// Main error type for all RGC operations
///
/// # Examples
///
/// ```rust
/// use rgc::error::GcError;
///
/// fn handle_error(err: GcError) {
///     match err {
///         GcError::OutOfMemory { requested, available, .. } => {
///             eprintln!("OOM: requested {}, available {}", requested, available);
///         }
///         GcError::InvalidHandle { handle } => {
///             eprintln!("stale handle {}", handle);
///         }
///         _ => {
///             eprintln!("Other error: {}", err);
///         }
///     }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GcError {
    /// Out of memory - heap exhaustion
    ///
    /// **When returned:** `allocate` found no free region of the requested
    /// size after a full collection cycle
    ///
    /// **Recovery strategy:** Unregister roots, retry, or abort the
    /// higher-level operation
    ///
    /// `available` is the total free byte count; `largest_free` is the
    /// largest single free region. After a cycle these are equal because
    /// compaction leaves one free region.
    #[error(
        "Out of memory: requested {requested} bytes, available {available} bytes \
         (largest free region {largest_free} bytes)"
    )]
    OutOfMemory {
        requested: usize,
        available: usize,
        largest_free: usize,
    },

    /// Handle does not name a live object
    ///
    /// **When returned:** `read_field`, `write_field`, `register_root` or an
    /// introspection call received a handle that was never allocated or has
    /// been reclaimed
    ///
    /// **Recovery strategy:** None - this is a caller bug
    #[error("Invalid handle: {handle}")]
    InvalidHandle { handle: ObjectHandle },

    /// Field index out of range
    ///
    /// **When returned:** `read_field`/`write_field` index >= field count
    #[error("Field index {index} out of bounds for object with {length} fields")]
    FieldOutOfBounds { index: usize, length: usize },

    /// Invalid argument
    ///
    /// **Example scenarios:**
    /// - `allocate(0)`
    /// - Reference field value pointing at a reclaimed object
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid state
    ///
    /// **When returned:** An operation was attempted while the driver was not
    /// in the state it requires
    #[error("Invalid state: expected {expected}, got {actual}")]
    InvalidState { expected: String, actual: String },
}

impl GcError {
    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        matches!(self, GcError::OutOfMemory { .. })
    }

    /// Check if this error indicates a bug in the calling code
    pub fn is_bug(&self) -> bool {
        matches!(
            self,
            GcError::InvalidHandle { .. }
                | GcError::FieldOutOfBounds { .. }
                | GcError::InvalidArgument(_)
                | GcError::InvalidState { .. }
        )
    }
}

impl From<crate::config::ConfigError> for GcError {
    fn from(err: crate::config::ConfigError) -> Self {
        GcError::Configuration(err.to_string())
    }
}

/// Result type alias for RGC operations
pub type Result<T> = std::result::Result<T, GcError>;

/// Panic with context when a collector invariant is broken
///
/// Used for conditions that indicate a defect in the collector itself
/// (dangling reference during fix-up, overlapping free regions, ...).
#[macro_export]
macro_rules! gc_invariant {
    ($cond:expr, $context:expr) => {
        if !$cond {
            panic!(
                "GC invariant violated at {}: {}",
                stringify!($cond),
                $context
            );
        }
    };
    ($cond:expr, $context:expr, $($arg:tt)*) => {
        if !$cond {
            panic!(
                "GC invariant violated at {}: {}",
                stringify!($cond),
                format!($context, $($arg)*)
            );
        }
    };
}
