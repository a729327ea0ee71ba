//! Recyclable display-slot pools.
//!
//! A [`SlotPool`] hands out small integer indices in `[0, capacity)` and
//! takes them back for reuse. The pool is a min-heap over the free
//! indices, so `acquire` always returns the *smallest* free index. That
//! determinism is load-bearing: slot numbering must be reproducible
//! across disconnect/reconnect cycles, and both clients and server agree
//! on it without exchanging anything beyond the deltas.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use conclave_protocol::SlotIndex;

/// A pool of recyclable integer indices in `[0, capacity)`.
///
/// Invariant: assigned ∪ free = the full range; no index is ever in both
/// sets. The room keeps two independent pools (user slots, presentation
/// slots), so the same numeric index can be live in each at once.
#[derive(Debug)]
pub struct SlotPool {
    capacity: u32,
    /// Min-heap of free indices (`Reverse` flips `BinaryHeap`'s max-heap).
    free: BinaryHeap<Reverse<u32>>,
}

impl SlotPool {
    /// Creates a pool with every index in `[0, capacity)` free.
    pub fn new(capacity: u32) -> Self {
        Self {
            capacity,
            free: (0..capacity).map(Reverse).collect(),
        }
    }

    /// Takes the smallest free index, or `None` if the pool is exhausted.
    /// Callers map `None` to RoomFull / PresentationFull.
    pub fn acquire(&mut self) -> Option<SlotIndex> {
        self.free.pop().map(|Reverse(i)| SlotIndex(i))
    }

    /// Returns an index to the pool.
    ///
    /// Releasing an out-of-range or already-free index is a caller bug;
    /// it is logged and ignored rather than corrupting the free set.
    pub fn release(&mut self, slot: SlotIndex) {
        if slot.0 >= self.capacity {
            tracing::warn!(%slot, capacity = self.capacity, "release of out-of-range slot ignored");
            return;
        }
        if self.free.iter().any(|&Reverse(i)| i == slot.0) {
            tracing::warn!(%slot, "double release of slot ignored");
            return;
        }
        self.free.push(Reverse(slot.0));
    }

    /// Total number of indices this pool manages.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Number of indices currently free.
    pub fn available(&self) -> u32 {
        self.free.len() as u32
    }

    /// Number of indices currently assigned.
    pub fn in_use(&self) -> u32 {
        self.capacity - self.available()
    }
}
