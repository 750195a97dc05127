//! The tracker façade (§4.4): the single hot-path entry point instrumentation
//! calls on every observed method invocation, plus the process-wide global
//! singleton accessor (§6.5, Design Notes "global mutable singleton").

use std::cell::Cell;
use std::sync::OnceLock;

use crate::active::{ActiveFlowTable, ObjectId};
use crate::bucket::RefCountBucket;
use crate::config::TrackerConfig;
use crate::error::{Result, TrackerError};
use crate::flow::Allocation;
use crate::handle::TrackedHandle;
use crate::intern::StringInterner;
use crate::metrics::TrackerMetrics;
use crate::signature::split_signature;
use crate::sink::{LeakEvent, LeakEventSink};
use crate::trie::{ImprintNode, ImprintTrie};

thread_local! {
    /// Re-entrancy guard (Design Notes §9): instrumentation may itself call
    /// instrumented methods (e.g. a buffer's `release` calling into another
    /// tracked type). Observations made while already inside
    /// `record_method_call` on this thread are dropped rather than
    /// recursing, since the trie and active-table operations are not
    /// designed to be safely re-entered from within themselves on one
    /// thread.
    static TRACING: Cell<bool> = Cell::new(false);
}

struct ReentrancyGuard;

impl ReentrancyGuard {
    /// Attempts to acquire the thread-local tracing flag. Returns `None` if
    /// already held (the caller should drop the observation).
    fn try_acquire() -> Option<Self> {
        TRACING.with(|flag| {
            if flag.get() {
                None
            } else {
                flag.set(true);
                Some(ReentrancyGuard)
            }
        })
    }
}

impl Drop for ReentrancyGuard {
    fn drop(&mut self) {
        TRACING.with(|flag| flag.set(false));
    }
}

/// The process-wide flow tracker. Owns the string interner, the imprint
/// trie, the active flow table, and the leak-event sink; orchestrates their
/// interaction on every observation.
pub struct Tracker {
    config: TrackerConfig,
    interner: StringInterner,
    trie: ImprintTrie,
    active: ActiveFlowTable,
    sink: LeakEventSink,
}

impl Tracker {
    /// Builds a tracker from a validated configuration. Prefer
    /// [`global`]/[`init_global`] for the process-wide singleton; construct
    /// directly only for isolated instances (e.g. tests).
    pub fn new(config: TrackerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Tracker {
            interner: StringInterner::with_capacity(config.interner_capacity),
            trie: ImprintTrie::new(config.max_nodes, config.max_depth),
            active: ActiveFlowTable::new(config.flow_state_pool_size),
            sink: LeakEventSink::new(config.leak_event_queue_capacity),
            config,
        })
    }

    /// Wraps `payload` in a [`TrackedHandle`] registered for reclamation
    /// notification against this tracker (§6.2).
    pub fn track<T>(&self, payload: T, allocation: Allocation) -> TrackedHandle<T> {
        TrackedHandle::new(payload, allocation, self.active.reclaim_sender())
    }

    /// The single hot-path ingress operation (§6.1, §4.4's seven-step
    /// contract). Never fails visibly: every internal anomaly degrades
    /// gracefully and the observation is simply dropped. New flows default
    /// to [`Allocation::Direct`]; use [`Tracker::record_method_call_for`]
    /// when the allocation kind is known and the object may be newly
    /// observed.
    pub fn record_method_call(&self, obj: Option<ObjectId>, method_signature: &str, ref_count: u32) {
        self.record_method_call_for(obj, method_signature, ref_count, Allocation::Direct)
    }

    /// Same as [`Tracker::record_method_call`] but lets the caller supply
    /// the direct/heap classification a freshly created flow should carry.
    /// Subsequent observations for an identity that already has a flow
    /// ignore `allocation`, since the flow already exists.
    pub fn record_method_call_for(
        &self,
        obj: Option<ObjectId>,
        method_signature: &str,
        ref_count: u32,
        allocation: Allocation,
    ) {
        let Some(id) = obj else {
            return; // Step 1: null object is a no-op.
        };
        let Some(_guard) = ReentrancyGuard::try_acquire() else {
            return; // Observation made while already tracing on this thread.
        };

        let bucket = RefCountBucket::of(ref_count);
        // Node identity stays (signature, bucket); class/method views are
        // derived on demand by splitting the signature (§9 node-key compression).
        let _ = split_signature(method_signature);

        let Some(interned) = self.interner.intern(Some(method_signature)) else {
            return;
        };

        let (flow, newly_created) = self
            .active
            .get_or_create(id, interned.clone(), bucket, allocation, &self.trie);

        if flow.is_completed() {
            return; // Step 3: stale observation on a terminal flow.
        }

        // A freshly created flow is already positioned at the root that
        // *is* this first observation (§4.3 `get_or_create` derives the
        // root from this very signature); only observations after the
        // first traverse a level deeper.
        if !newly_created {
            let depth = flow.depth();
            if depth < self.config.max_depth {
                let current = flow.current_node();
                let next = self.trie.traverse_or_create(&current, interned, bucket, depth);
                flow.advance(next);
            }
        }

        if bucket.is_released() {
            // Drop this façade's strong ref first: `record_clean_release`
            // removes the table's own ref and then tries to recycle the
            // flow state via `Arc::try_unwrap`, which only succeeds once no
            // other strong ref is outstanding (§9 flow-state pooling).
            drop(flow);
            self.active.record_clean_release(id, &self.trie);
        }
    }

    /// Drains the reclamation queue, converting any reclaimed-without-release
    /// entries into leak records. Idempotent; safe to call from any thread,
    /// including opportunistically from the hot path (§4.3).
    pub fn process_reclamation_queue(&self) {
        self.active.process_reclamation_queue(&self.trie, &self.sink);
    }

    /// Shutdown path: drains the reclamation queue, then treats every
    /// remaining live flow as a leak (§4.3 `mark_remaining_as_leaks`, §7
    /// "Shutdown").
    pub fn shutdown(&self) {
        self.process_reclamation_queue();
        self.active.mark_remaining_as_leaks(&self.trie, &self.sink);
    }

    /// Atomically extracts and returns all pending leak events (§6.4).
    pub fn drain_leak_events(&self) -> Vec<LeakEvent> {
        self.sink.drain()
    }

    /// Read-only snapshot view over the trie's current roots (§6.3).
    pub fn roots(&self) -> Vec<std::sync::Arc<ImprintNode>> {
        self.trie.roots()
    }

    /// A point-in-time metrics snapshot (§6.5), the seam an out-of-scope
    /// metric pusher would poll.
    pub fn metrics(&self) -> TrackerMetrics {
        TrackerMetrics {
            node_count: self.trie.node_count(),
            root_count: self.trie.root_count(),
            active_flow_count: self.active.active_count(),
            dropped_reclamation_count: self.active.dropped_reclamation_count(),
            dropped_leak_event_count: self.sink.dropped_count(),
            interner_len: self.interner.len(),
            interner_capacity: self.interner.capacity(),
            max_nodes: self.trie.max_nodes(),
            max_depth: self.trie.max_depth(),
        }
    }

    /// This tracker's effective configuration.
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Zeroes every piece of state: the trie, the active table, the sink,
    /// and the interner. Never called on the hot path (§6.6).
    pub fn reset(&self) {
        self.trie.reset();
        self.active.reset();
        self.sink.reset();
        self.interner.clear();
    }
}

static GLOBAL: OnceLock<Tracker> = OnceLock::new();

/// Returns the process-wide tracker, lazily constructing it with default
/// configuration on first access if [`init_global`] was never called.
pub fn global() -> &'static Tracker {
    GLOBAL.get_or_init(|| {
        Tracker::new(TrackerConfig::default()).expect("default configuration always validates")
    })
}

/// Explicitly initializes the process-wide tracker with `config`. Must be
/// called before the first call to [`global`] (or to this function) to take
/// effect; a second call returns [`TrackerError::AlreadyInitialized`].
pub fn init_global(config: TrackerConfig) -> Result<()> {
    let tracker = Tracker::new(config)?;
    GLOBAL
        .set(tracker)
        .map_err(|_| TrackerError::AlreadyInitialized)
}
