//! Root Registry - explicit GC roots supplied by the host
//!
//! Roots are starting points for marking. All objects reachable from a
//! root must survive a cycle.
//!
//! The host registers and unregisters roots explicitly; nothing is
//! discovered by scanning stacks or statics. Each registration gets a
//! [`RootId`], and because compaction moves objects, `RootId` is the stable
//! way to find a root's current handle after a cycle.
//!
//! # Snapshot protocol
//!
//! 1. The driver takes a [`RootSnapshot`] when a cycle starts
//! 2. The marker reads it
//! 3. The compactor rewrites its handles through the forwarding table
//! 4. The driver writes it back with [`RootRegistry::apply_snapshot`]

use crate::object::ObjectHandle;
use indexmap::IndexMap;
use std::fmt;

/// Identifier of one root registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RootId(u64);

impl RootId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RootId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "root#{}", self.0)
    }
}

/// Root descriptor - describes a single root registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootDescriptor {
    /// Current handle of the rooted object
    pub handle: ObjectHandle,
    /// Optional name for debugging
    pub name: Option<String>,
}

/// RootRegistry - the host's set of live references
///
/// The same handle may be registered several times; each registration is
/// separate and must be unregistered separately.
#[derive(Debug, Default)]
pub struct RootRegistry {
    /// Registrations in registration order
    roots: IndexMap<RootId, RootDescriptor>,

    /// Next root id
    next_id: u64,
}

impl RootRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a root
    ///
    /// Handle validity is the caller's concern; the driver checks it
    /// before calling this.
    pub fn register(&mut self, handle: ObjectHandle, name: Option<&str>) -> RootId {
        let id = RootId(self.next_id);
        self.next_id += 1;

        self.roots.insert(
            id,
            RootDescriptor {
                handle,
                name: name.map(|s| s.to_string()),
            },
        );

        log::trace!("registered {} -> {}", id, handle);
        id
    }

    /// Remove the oldest registration of `handle`
    ///
    /// Returns the removed id, or None if `handle` is not a root.
    pub fn unregister_handle(&mut self, handle: ObjectHandle) -> Option<RootId> {
        let id = self
            .roots
            .iter()
            .find(|(_, root)| root.handle == handle)
            .map(|(&id, _)| id)?;
        self.roots.shift_remove(&id);
        log::trace!("unregistered {} -> {}", id, handle);
        Some(id)
    }

    /// Remove a registration by id, returning its current handle
    pub fn unregister_id(&mut self, id: RootId) -> Option<ObjectHandle> {
        self.roots.shift_remove(&id).map(|root| root.handle)
    }

    /// Current handle of a root
    pub fn get(&self, id: RootId) -> Option<ObjectHandle> {
        self.roots.get(&id).map(|root| root.handle)
    }

    /// Full descriptor of a root
    pub fn descriptor(&self, id: RootId) -> Option<&RootDescriptor> {
        self.roots.get(&id)
    }

    /// Whether `handle` is registered at least once
    pub fn contains(&self, handle: ObjectHandle) -> bool {
        self.roots.values().any(|root| root.handle == handle)
    }

    /// Current handles of all roots, in registration order
    pub fn handles(&self) -> Vec<ObjectHandle> {
        self.roots.values().map(|root| root.handle).collect()
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Consistent copy of the root set for one cycle
    pub fn snapshot(&self) -> RootSnapshot {
        RootSnapshot {
            entries: self
                .roots
                .iter()
                .map(|(&id, root)| (id, root.handle))
                .collect(),
        }
    }

    /// Write relocated handles from a snapshot back into the registry
    ///
    /// Ids no longer registered are ignored.
    pub fn apply_snapshot(&mut self, snapshot: &RootSnapshot) {
        for &(id, handle) in &snapshot.entries {
            if let Some(root) = self.roots.get_mut(&id) {
                root.handle = handle;
            }
        }
    }

    /// Get statistics
    pub fn stats(&self) -> RootStats {
        let mut distinct = self.handles();
        distinct.sort_unstable();
        distinct.dedup();

        RootStats {
            registered: self.roots.len(),
            distinct_objects: distinct.len(),
        }
    }
}

/// Root set captured at the start of a cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RootSnapshot {
    entries: Vec<(RootId, ObjectHandle)>,
}

impl RootSnapshot {
    /// Snapshot from bare handles (ids are assigned positionally)
    pub fn from_handles(handles: impl IntoIterator<Item = ObjectHandle>) -> Self {
        Self {
            entries: handles
                .into_iter()
                .enumerate()
                .map(|(i, handle)| (RootId(i as u64), handle))
                .collect(),
        }
    }

    pub fn handles(&self) -> impl Iterator<Item = ObjectHandle> + '_ {
        self.entries.iter().map(|&(_, handle)| handle)
    }

    pub fn entries(&self) -> &[(RootId, ObjectHandle)] {
        &self.entries
    }

    pub(crate) fn handles_mut(&mut self) -> impl Iterator<Item = &mut ObjectHandle> + '_ {
        self.entries.iter_mut().map(|(_, handle)| handle)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Statistics for the root registry
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RootStats {
    /// Number of registrations
    pub registered: usize,
    /// Number of distinct rooted objects
    pub distinct_objects: usize,
}
