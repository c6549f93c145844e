//! Transaction queue
//!
//! Fixed-capacity ring of `N` transaction slots, one per bus instance. One
//! slot always stays empty so that `queue_in == queue_out` means empty, which
//! leaves room for `N - 1` outstanding transactions.
//!
//! Slots are retired only when the engine finishes a transaction: `dequeue`
//! hands out the oldest slot without moving `queue_out`, and `retire` moves
//! it once the STOP (or a bus fault) has completed.

use crate::config::MAX_QUEUE_DEPTH;
use crate::transaction::{Transaction, TransactionHandle};

/// Index of a queue slot
pub type SlotIndex = usize;

/// Errors from queue pointer manipulation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum QueueError {
    /// Slot is not the one `allocate_slot` handed out
    NotAllocated,
    /// Nothing left to retire
    Empty,
}

/// Ring buffer of transaction slots
#[derive(Debug)]
pub struct TransactionQueue<const N: usize> {
    slots: [Transaction; N],
    queue_in: usize,
    queue_out: usize,
}

impl<const N: usize> Default for TransactionQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> TransactionQueue<N> {
    /// Evaluated per `N`; rejects depths a handle cannot address
    const DEPTH_OK: () = assert!(
        N >= 2 && N <= MAX_QUEUE_DEPTH,
        "queue depth must be in 2..=256"
    );

    /// Create an empty queue
    pub fn new() -> Self {
        let () = Self::DEPTH_OK;
        Self {
            slots: core::array::from_fn(|_| Transaction::default()),
            queue_in: 0,
            queue_out: 0,
        }
    }

    /// Total slots, including the one kept empty
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Number of transactions that can still be queued
    pub fn count_free(&self) -> usize {
        let used = (self.queue_in + N - self.queue_out) % N;
        N - used - 1
    }

    /// Number of queued transactions, including the one in flight
    pub fn len(&self) -> usize {
        N - 1 - self.count_free()
    }

    /// Check if nothing is queued
    pub fn is_empty(&self) -> bool {
        critical_section::with(|_| self.queue_in == self.queue_out)
    }

    /// Reserve the next free slot for filling
    ///
    /// Returns `None` when the queue is full. The slot stays invisible to the
    /// engine until it is passed to [`enqueue`](Self::enqueue).
    pub fn allocate_slot(&mut self) -> Option<SlotIndex> {
        let (queue_in, free) =
            critical_section::with(|_| (self.queue_in, self.count_free()));
        if free > 0 {
            Some(queue_in)
        } else {
            None
        }
    }

    /// Publish a filled slot to the consumer
    pub fn enqueue(&mut self, slot: SlotIndex) -> Result<(), QueueError> {
        critical_section::with(|_| {
            if slot != self.queue_in || self.count_free() == 0 {
                return Err(QueueError::NotAllocated);
            }
            self.queue_in = (self.queue_in + 1) % N;
            Ok(())
        })
    }

    /// Oldest queued slot, left in place until retired
    pub fn dequeue(&self) -> Option<SlotIndex> {
        critical_section::with(|_| {
            if self.queue_in == self.queue_out {
                None
            } else {
                Some(self.queue_out)
            }
        })
    }

    /// Release the oldest slot after its transaction finished
    pub fn retire(&mut self) -> Result<SlotIndex, QueueError> {
        critical_section::with(|_| {
            if self.queue_in == self.queue_out {
                return Err(QueueError::Empty);
            }
            let retired = self.queue_out;
            self.queue_out = (self.queue_out + 1) % N;
            Ok(retired)
        })
    }

    /// Transaction stored in a slot
    pub fn slot(&self, slot: SlotIndex) -> Option<&Transaction> {
        self.slots.get(slot)
    }

    pub(crate) fn slot_mut(&mut self, slot: SlotIndex) -> Option<&mut Transaction> {
        self.slots.get_mut(slot)
    }

    /// Resolve a handle, rejecting it if the slot was reused since
    pub fn get(&self, handle: TransactionHandle) -> Option<&Transaction> {
        self.slots
            .get(handle.slot())
            .filter(|tx| tx.generation == handle.generation)
    }
}
