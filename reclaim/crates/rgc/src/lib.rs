//! # RGC - Stop-the-World Mark-Sweep-Compact Collector
//!
//! RGC manages a single bounded linear heap of fixed-layout objects and
//! reclaims unreachable ones with a three-phase stop-the-world cycle.
//!
//! ## Overview
//!
//! - **Explicit roots**: the host registers and unregisters roots; nothing
//!   is discovered by scanning stacks
//! - **Precise marking**: breadth-first from the roots, cycles included
//! - **Coalescing sweep**: freed space merges with adjacent free regions
//! - **Sliding compaction**: survivors move to the heap base, every
//!   reference and root is rewritten, free space ends up in one region
//! - **Stamped handles**: a handle to a reclaimed or moved object is
//!   rejected with `InvalidHandle`, even if its address is reused
//!
//! ## Quick Start
//!
//! ```rust
//! use rgc::{GarbageCollector, GcConfig, GcError, Value};
//!
//! fn main() -> Result<(), GcError> {
//!     let mut gc = GarbageCollector::new(GcConfig::with_heap_size(4096))?;
//!
//!     // Two objects referencing each other, nothing rooted
//!     let a = gc.allocate(16)?;
//!     let b = gc.allocate(16)?;
//!     gc.write_field(a, 0, Value::Ref(b))?;
//!     gc.write_field(b, 0, Value::Ref(a))?;
//!
//!     // A rooted object with a scalar field
//!     let keep = gc.allocate(8)?;
//!     gc.write_field(keep, 0, Value::Scalar(7))?;
//!     let root = gc.register_root(keep)?;
//!
//!     assert_eq!(gc.collect(), 32);
//!     assert!(matches!(gc.read_field(a, 0), Err(GcError::InvalidHandle { .. })));
//!
//!     // Compaction may have moved the root: ask the registry
//!     let keep = gc.root(root).expect("still registered");
//!     assert_eq!(gc.read_field(keep, 0)?, Value::Scalar(7));
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//!   host ── allocate / read_field / write_field / register_root / collect
//!                                │
//!                      ┌─────────▼──────────┐
//!                      │  GarbageCollector  │  (gc.rs)
//!                      └─────────┬──────────┘
//!        ┌──────────┬────────────┼────────────┬─────────────┐
//!        ▼          ▼            ▼            ▼             ▼
//!    Allocator  RootRegistry   Marker      Sweeper      Compactor
//!        │                       │            │             │
//!        └───────────────────────┴─────┬──────┴─────────────┘
//!                                      ▼
//!                       HeapStore (records + FreeSpaceMap)
//! ```
//!
//! ### GC Cycle Phases
//!
//! 1. **Mark**: clear mark bits, traverse from a root snapshot
//! 2. **Sweep**: free unmarked records, reset mark bits of survivors
//! 3. **Compact**: plan, forward references and roots, move, rebuild free space
//!
//! A cycle runs on `collect()`, on an allocation that finds no free
//! region (followed by one retry), or before an allocation once live bytes
//! exceed `gc_trigger_threshold` if one is configured.
//!
//! ## Errors
//!
//! `OutOfMemory` and `InvalidHandle` are ordinary [`GcError`] values.
//! A broken collector invariant (dangling reference, overlapping free
//! regions, failed heap verification) panics.
//!
//! ## Modules
//!
//! - [`allocator`]: first-fit allocation
//! - [`config`]: configuration and validation
//! - [`error`]: error types and the invariant macro
//! - [`gc`]: collection cycle orchestration
//! - [`heap`]: heap store, free-space map, verifier
//! - [`logging`]: structured GC events
//! - [`marker`]: root registry and reachability marking
//! - [`object`]: handles, field values, object records
//! - [`relocate`]: forwarding table and sliding compaction
//! - [`runtime`]: thread-safe shared front end
//! - [`stats`]: cycle statistics and pause histogram
//! - [`sweeper`]: reclaiming unmarked objects

// Core GC modules
pub mod config;
pub mod error;
pub mod gc;
pub mod logging;

// Heap and object model
pub mod allocator;
pub mod heap;
pub mod object;

// GC algorithm components
pub mod marker;
pub mod relocate;
pub mod sweeper;

// Runtime and monitoring
pub mod runtime;
pub mod stats;

pub use config::GcConfig;
pub use error::{GcError, Result};
pub use gc::{GarbageCollector, GcReason, GcState};
pub use heap::{HeapStats, HeapVerifyError};
pub use marker::RootId;
pub use object::{ObjectHandle, Value, FIELD_SIZE};
pub use runtime::Runtime;

/// RGC version string from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize a shared runtime with default configuration
///
/// # Examples
///
/// ```rust
/// let runtime = rgc::init()?;
/// let handle = runtime.allocate(32)?;
/// assert!(runtime.is_live(handle));
/// # Ok::<(), rgc::GcError>(())
/// ```
pub fn init() -> Result<Runtime> {
    Runtime::new(GcConfig::default())
}

/// Initialize a shared runtime with custom configuration
///
/// # Examples
///
/// ```rust
/// use rgc::GcConfig;
///
/// let config = GcConfig {
///     heap_size: 64 * 1024,
///     gc_trigger_threshold: Some(0.75),
///     ..Default::default()
/// };
///
/// let runtime = rgc::init_with_config(config)?;
/// # Ok::<(), rgc::GcError>(())
/// ```
pub fn init_with_config(config: GcConfig) -> Result<Runtime> {
    Runtime::new(config)
}
