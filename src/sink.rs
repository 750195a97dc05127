//! The leak-event sink: a bounded, multi-producer single-consumer queue
//! drained by an external, out-of-scope scheduled pusher (§6.4, §5 "Leak
//! event sink").
//!
//! Producers (the active flow table, on reclamation) never block: once the
//! queue is at capacity, new events are dropped and counted rather than
//! applying backpressure to the hot path (§7 "Leak-event queue full").

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use time::OffsetDateTime;

/// An immutable record of one detected leak (§3 "Leak event").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeakEvent {
    /// The allocation-site label (first observed signature) for the leaked object.
    pub root_label: String,
    /// Whether the leaked object was direct or heap allocated.
    pub allocation: crate::flow::Allocation,
    /// When the leak was detected (reclamation-queue drain time).
    pub detected_at: OffsetDateTime,
    /// The fully reconstructed root-to-leaf path, e.g. `"A.alloc -> B.use"`.
    pub path: String,
}

/// A bounded, drop-on-full multi-producer single-consumer leak event queue.
pub struct LeakEventSink {
    capacity: usize,
    queue: Mutex<VecDeque<LeakEvent>>,
    dropped: AtomicU64,
}

impl LeakEventSink {
    /// Creates a sink bounded to `capacity` pending events.
    pub fn new(capacity: usize) -> Self {
        LeakEventSink {
            capacity,
            queue: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            dropped: AtomicU64::new(0),
        }
    }

    /// Pushes a leak event. Drops it (and bumps the dropped-event counter)
    /// if the queue is already at capacity; never blocks the caller.
    pub fn push(&self, event: LeakEvent) {
        let mut queue = self.queue.lock();
        if queue.len() >= self.capacity {
            drop(queue);
            self.dropped.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("leak-event queue full; dropping event");
            return;
        }
        queue.push_back(event);
    }

    /// Atomically extracts and returns every pending event, resetting the
    /// queue to empty (§6.4).
    pub fn drain(&self) -> Vec<LeakEvent> {
        let mut queue = self.queue.lock();
        queue.drain(..).collect()
    }

    /// Number of currently pending (undrained) events.
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    /// Whether the sink currently holds no pending events.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of events dropped for capacity reasons since creation
    /// (or the last [`LeakEventSink::reset`]).
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Clears pending events and the dropped-event counter. Never called on the hot path.
    pub fn reset(&self) {
        self.queue.lock().clear();
        self.dropped.store(0, Ordering::Relaxed);
    }
}
