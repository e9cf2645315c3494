/*!
 * Event Streaming
 * Bounded ring buffer between record producers and the drain thread
 *
 * Design: many producers (lifecycle handlers, sampler), one consumer (writer).
 * Every operation takes one mutex and returns immediately; a full buffer drops the
 * incoming record and counts it instead of blocking the producer.
 */

mod writer;

pub use writer::{DrainWriter, WriterHandle, WriterStats};

use crate::core::limits::MIN_RING_CAPACITY;
use crate::core::{Result, WatchError};
use crate::monitoring::events::Record;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Result of a produce attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProduceOutcome {
    /// Record stored and write position advanced
    Committed,
    /// Builder declined; nothing stored, no counter touched
    Skipped,
    /// Buffer full; record discarded and counted
    Dropped,
}

impl ProduceOutcome {
    #[inline]
    pub fn is_committed(self) -> bool {
        self == ProduceOutcome::Committed
    }
}

/// Result of a consume attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeOutcome {
    Consumed,
    Empty,
}

/// Buffer usage counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferStats {
    pub capacity: usize,
    pub written: u64,
    pub read: u64,
    pub dropped: u64,
    /// Committed but not yet consumed
    pub pending: usize,
}

struct RingState {
    slots: Box<[Record]>,
    read: usize,
    write: usize,
    written: u64,
    read_count: u64,
    dropped: u64,
}

impl RingState {
    #[inline]
    fn advance(&self, position: usize) -> usize {
        (position + 1) % self.slots.len()
    }

    #[inline]
    fn pending(&self) -> usize {
        let capacity = self.slots.len();
        (self.write + capacity - self.read) % capacity
    }
}

/// Fixed-capacity circular record buffer guarded by one mutex
///
/// One slot is always left free so `read == write` means empty and
/// `write + 1 == read` means full.
pub struct RingBuffer {
    state: Mutex<RingState>,
}

impl RingBuffer {
    /// Allocate a buffer with `capacity` slots
    ///
    /// Allocation failure is reported instead of aborting so the caller can
    /// stop startup cleanly.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        if capacity < MIN_RING_CAPACITY {
            return Err(WatchError::InvalidCapacity {
                capacity,
                minimum: MIN_RING_CAPACITY,
            });
        }

        let mut slots = Vec::new();
        slots
            .try_reserve_exact(capacity)
            .map_err(|_| WatchError::BufferAllocation { capacity })?;
        slots.resize(capacity, Record::VACANT);

        Ok(Self {
            state: Mutex::new(RingState {
                slots: slots.into_boxed_slice(),
                read: 0,
                write: 0,
                written: 0,
                read_count: 0,
                dropped: 0,
            }),
        })
    }

    /// Reserve a slot and let `build` decide whether to fill it
    ///
    /// `build` runs under the buffer lock and only when a slot is free. Returning
    /// `None` leaves the buffer untouched.
    #[inline]
    pub fn try_produce<F>(&self, build: F) -> ProduceOutcome
    where
        F: FnOnce() -> Option<Record>,
    {
        let mut state = self.state.lock();

        let next = state.advance(state.write);
        if next == state.read {
            state.dropped += 1;
            return ProduceOutcome::Dropped;
        }

        match build() {
            Some(record) => {
                let write = state.write;
                state.slots[write] = record;
                state.written += 1;
                state.write = next;
                ProduceOutcome::Committed
            }
            None => ProduceOutcome::Skipped,
        }
    }

    /// Hand the oldest record to `sink` and release its slot
    #[inline]
    pub fn try_consume<F>(&self, sink: F) -> ConsumeOutcome
    where
        F: FnOnce(&Record),
    {
        let mut state = self.state.lock();

        if state.read == state.write {
            return ConsumeOutcome::Empty;
        }

        sink(&state.slots[state.read]);
        state.read_count += 1;
        state.read = state.advance(state.read);
        ConsumeOutcome::Consumed
    }

    /// Copy the oldest record out
    #[inline]
    pub fn pop(&self) -> Option<Record> {
        let mut out = None;
        self.try_consume(|record| out = Some(*record));
        out
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.state.lock().slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        let state = self.state.lock();
        state.read == state.write
    }

    pub fn stats(&self) -> BufferStats {
        let state = self.state.lock();
        BufferStats {
            capacity: state.slots.len(),
            written: state.written,
            read: state.read_count,
            dropped: state.dropped,
            pending: state.pending(),
        }
    }

    /// Report final counters
    ///
    /// Call once, after every producer and the consumer have stopped. Only the
    /// owning `ThreadWatcher` does, as the last step of its shutdown.
    pub(crate) fn teardown(&self) -> BufferStats {
        let stats = self.stats();

        info!(
            written = stats.written,
            read = stats.read,
            pending = stats.pending,
            "Disposing ring buffer"
        );

        if stats.dropped > 0 {
            warn!(dropped = stats.dropped, "Lost records due to full buffer");
        }

        stats
    }
}
