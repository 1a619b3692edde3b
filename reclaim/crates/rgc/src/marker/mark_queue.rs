//! Mark Queue - grey set for the marking traversal
//!
//! Holds objects that have been marked but whose fields have not been
//! scanned yet. Popping from the front gives breadth-first order.
//!
//! ```text
//!   roots ──push──► ┌───┬───┬───┬───┐ ──pop──► scan fields
//!                   │ g │ g │ g │ g │            │
//!                   └───┴───┴───┴───┘ ◄──push──┘ (newly marked children)
//! ```

use crate::object::ObjectHandle;
use std::collections::VecDeque;

/// MarkQueue - FIFO work list for one marking pass
#[derive(Debug, Default)]
pub struct MarkQueue {
    queue: VecDeque<ObjectHandle>,

    /// Counters for statistics
    enqueued_count: usize,
    processed_count: usize,
}

impl MarkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push an object whose fields still need scanning
    pub fn push(&mut self, object: ObjectHandle) {
        self.queue.push_back(object);
        self.enqueued_count += 1;
    }

    /// Pop the oldest pending object
    pub fn pop(&mut self) -> Option<ObjectHandle> {
        let object = self.queue.pop_front();
        if object.is_some() {
            self.processed_count += 1;
        }
        object
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Drop pending work and reset counters
    pub fn clear(&mut self) {
        self.queue.clear();
        self.enqueued_count = 0;
        self.processed_count = 0;
    }

    /// Get statistics
    pub fn stats(&self) -> MarkQueueStats {
        MarkQueueStats {
            enqueued: self.enqueued_count,
            processed: self.processed_count,
            pending: self.queue.len(),
        }
    }
}

/// Statistics for mark queue
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MarkQueueStats {
    /// Total enqueued objects
    pub enqueued: usize,
    /// Total processed objects
    pub processed: usize,
    /// Pending objects in queue
    pub pending: usize,
}
