//! Runtime Module - shared collector front end
//!
//! [`Runtime`] lets several threads use one collector. Every operation
//! takes the collector lock for its whole duration, so a collection cycle
//! stops every thread sharing the runtime until it finishes.
//!
//! ```text
//!  thread A ─┐
//!  thread B ─┼──► Mutex<GarbageCollector> ──► mark / sweep / compact
//!  thread C ─┘        (one holder at a time)
//! ```

use crate::config::GcConfig;
use crate::error::{GcError, Result};
use crate::gc::GarbageCollector;
use crate::heap::HeapStats;
use crate::marker::RootId;
use crate::object::{ObjectHandle, Value};
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

/// Runtime state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeState {
    /// Accepting operations
    Running,
    /// Shut down; heap operations fail with `InvalidState`
    Stopped,
}

/// Runtime - thread-safe handle to one collector
///
/// Cloning is cheap and every clone shares the same heap.
#[derive(Clone)]
pub struct Runtime {
    gc: Arc<Mutex<GarbageCollector>>,
    state: Arc<RwLock<RuntimeState>>,
}

impl Runtime {
    /// Create new runtime
    pub fn new(config: GcConfig) -> Result<Self> {
        Ok(Self::from_collector(GarbageCollector::new(config)?))
    }

    /// Share an existing collector
    pub fn from_collector(gc: GarbageCollector) -> Self {
        Self {
            gc: Arc::new(Mutex::new(gc)),
            state: Arc::new(RwLock::new(RuntimeState::Running)),
        }
    }

    pub fn state(&self) -> RuntimeState {
        *self.state.read()
    }

    /// Stop the runtime; later heap operations fail
    pub fn stop(&self) {
        *self.state.write() = RuntimeState::Stopped;
        log::debug!("runtime stopped");
    }

    fn ensure_running(&self) -> Result<()> {
        match self.state() {
            RuntimeState::Running => Ok(()),
            state => Err(GcError::InvalidState {
                expected: format!("{:?}", RuntimeState::Running),
                actual: format!("{:?}", state),
            }),
        }
    }

    /// Run `f` with exclusive access to the collector
    ///
    /// Handles obtained inside `f` stay valid for the rest of `f`; no cycle
    /// can run in between except one started by `f` itself.
    pub fn with<R>(&self, f: impl FnOnce(&mut GarbageCollector) -> R) -> Result<R> {
        self.ensure_running()?;
        let mut gc = self.gc.lock();
        Ok(f(&mut gc))
    }

    /// Allocate object
    pub fn allocate(&self, size: usize) -> Result<ObjectHandle> {
        self.with(|gc| gc.allocate(size))?
    }

    /// Allocate an object and root it in one step
    ///
    /// Without this, another thread's cycle could reclaim the object
    /// between `allocate` and `register_root`.
    pub fn allocate_rooted(&self, size: usize) -> Result<(ObjectHandle, RootId)> {
        self.with(|gc| {
            let handle = gc.allocate(size)?;
            let id = gc.register_root(handle)?;
            Ok((handle, id))
        })?
    }

    pub fn read_field(&self, handle: ObjectHandle, index: usize) -> Result<Value> {
        self.with(|gc| gc.read_field(handle, index))?
    }

    pub fn write_field(&self, handle: ObjectHandle, index: usize, value: Value) -> Result<()> {
        self.with(|gc| gc.write_field(handle, index, value))?
    }

    pub fn register_root(&self, handle: ObjectHandle) -> Result<RootId> {
        self.with(|gc| gc.register_root(handle))?
    }

    pub fn unregister_root(&self, handle: ObjectHandle) -> Result<()> {
        self.with(|gc| gc.unregister_root(handle))?
    }

    pub fn unregister_root_id(&self, id: RootId) -> Result<ObjectHandle> {
        self.with(|gc| gc.unregister_root_id(id))?
    }

    /// Current handle of a root
    pub fn root(&self, id: RootId) -> Option<ObjectHandle> {
        self.gc.lock().root(id)
    }

    /// Run a full cycle, waiting for the collector if another thread holds it
    pub fn collect(&self) -> Result<usize> {
        self.with(|gc| gc.collect())
    }

    /// Run a full cycle only if the collector is free right now
    ///
    /// Fails with `InvalidState` when another thread holds the collector.
    pub fn try_collect(&self) -> Result<usize> {
        self.ensure_running()?;
        match self.gc.try_lock() {
            Some(mut gc) => Ok(gc.collect()),
            None => Err(GcError::InvalidState {
                expected: "idle collector".to_string(),
                actual: "collector busy".to_string(),
            }),
        }
    }

    /// Heap statistics; available after `stop`
    pub fn stats(&self) -> HeapStats {
        self.gc.lock().stats()
    }

    pub fn is_live(&self, handle: ObjectHandle) -> bool {
        self.gc.lock().is_live(handle)
    }

    pub fn cycle_count(&self) -> u64 {
        self.gc.lock().cycle_count()
    }

    pub fn diagnostics(&self) -> IndexMap<String, String> {
        let mut diagnostics = self.gc.lock().diagnostics();
        diagnostics.insert("runtime_state".to_string(), format!("{:?}", self.state()));
        diagnostics.insert(
            "runtime_handles".to_string(),
            Arc::strong_count(&self.gc).to_string(),
        );
        diagnostics
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("state", &self.state())
            .finish()
    }
}
