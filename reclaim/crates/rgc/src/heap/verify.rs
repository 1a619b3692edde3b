//! Heap Verifier - structural invariant checks
//!
//! Walks records and free regions together in address order and checks
//! that they tile `[base, base + capacity)` exactly, that free regions are
//! coalesced, and that every reference field resolves to a live record.

use super::HeapStore;
use crate::object::ObjectHandle;
use thiserror::Error;

/// First invariant violation found by [`verify_heap`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeapVerifyError {
    #[error("range {address:#x}+{len} lies outside the heap")]
    OutOfBounds { address: usize, len: usize },

    #[error("range at {address:#x} overlaps the previous range ending at {previous_end:#x}")]
    Overlap { address: usize, previous_end: usize },

    #[error("{len} bytes at {address:#x} are neither live nor free")]
    Gap { address: usize, len: usize },

    #[error("free regions at {first:#x} and {second:#x} are adjacent but not coalesced")]
    Uncoalesced { first: usize, second: usize },

    #[error("object at {holder:#x} field {index} references dead object {target}")]
    DanglingReference {
        holder: usize,
        index: usize,
        target: ObjectHandle,
    },

    #[error("object at {address:#x} has its mark bit set outside a cycle")]
    StaleMark { address: usize },

    #[error("{what} accounting is {recorded} bytes but the heap holds {actual}")]
    Accounting {
        what: &'static str,
        recorded: usize,
        actual: usize,
    },
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Span {
    Live,
    Free,
}

/// Check every structural invariant of `heap`
///
/// Mark bits must all be clear, so this is only meaningful between cycles.
pub fn verify_heap(heap: &HeapStore) -> Result<(), HeapVerifyError> {
    let mut spans: Vec<(usize, usize, Span)> = heap
        .records()
        .map(|(address, record)| (address, record.size(), Span::Live))
        .chain(heap.free_map().iter().map(|(start, len)| (start, len, Span::Free)))
        .collect();
    spans.sort_by_key(|&(address, _, _)| address);

    let mut cursor = heap.base();
    let mut previous: Option<(usize, Span)> = None;
    let mut live_total = 0;
    let mut free_total = 0;

    for &(address, len, kind) in &spans {
        if address < heap.base() || address.saturating_add(len) > heap.end() {
            return Err(HeapVerifyError::OutOfBounds { address, len });
        }
        if address < cursor {
            return Err(HeapVerifyError::Overlap {
                address,
                previous_end: cursor,
            });
        }
        if address > cursor {
            return Err(HeapVerifyError::Gap {
                address: cursor,
                len: address - cursor,
            });
        }
        if let Some((prev_address, Span::Free)) = previous {
            if kind == Span::Free {
                return Err(HeapVerifyError::Uncoalesced {
                    first: prev_address,
                    second: address,
                });
            }
        }

        match kind {
            Span::Live => live_total += len,
            Span::Free => free_total += len,
        }
        cursor = address + len;
        previous = Some((address, kind));
    }

    if cursor != heap.end() {
        return Err(HeapVerifyError::Gap {
            address: cursor,
            len: heap.end() - cursor,
        });
    }

    if live_total != heap.live_bytes() {
        return Err(HeapVerifyError::Accounting {
            what: "live",
            recorded: heap.live_bytes(),
            actual: live_total,
        });
    }
    if free_total != heap.free_bytes() {
        return Err(HeapVerifyError::Accounting {
            what: "free",
            recorded: heap.free_bytes(),
            actual: free_total,
        });
    }

    for (address, record) in heap.records() {
        if record.is_marked() {
            return Err(HeapVerifyError::StaleMark { address });
        }
        for (index, field) in record.fields().iter().enumerate() {
            if let Some(target) = field.as_handle() {
                if !heap.is_live(target) {
                    return Err(HeapVerifyError::DanglingReference {
                        holder: address,
                        index,
                        target,
                    });
                }
            }
        }
    }

    Ok(())
}
