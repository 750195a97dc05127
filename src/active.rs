//! The active flow table (§4.3): a concurrent map from each currently-live
//! tracked object's identity to its [`FlowState`], plus the reclamation
//! queue that converts runtime-reclaimed, never-released objects into leak
//! records.
//!
//! Rust has no tracing garbage collector and no `ReferenceQueue`
//! equivalent, so the "weak reference + reclamation queue" design from §3
//! is realized per the Design Notes' own re-architecture guidance: an
//! explicit smart handle ([`crate::handle::TrackedHandle`]) whose `Drop`
//! posts the object's identity to this table's reclamation channel if its
//! flow was never completed. This table never holds a pointer to the
//! tracked payload itself — only the flow state and the identity used to
//! key it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use time::OffsetDateTime;

use crate::bucket::RefCountBucket;
use crate::flow::{Allocation, FlowState};
use crate::intern::InternedString;
use crate::sink::{LeakEvent, LeakEventSink};
use crate::trie::{path_string, ImprintTrie};

/// An opaque, process-unique identity for a tracked object. The
/// instrumentation layer (out of scope) is responsible for deriving this
/// from the object itself; [`crate::handle::TrackedHandle`] derives it from
/// a monotonic counter at handle-construction time.
pub type ObjectId = u64;

/// A small pool of recycled [`FlowState`] allocations (§9 "flow-state
/// pooling"). A pooled record is only ever pushed back after its entry has
/// been removed from the active map, never while a caller might still hold
/// the `Arc`.
struct FlowPool {
    pool: Mutex<Vec<FlowState>>,
    max_size: Option<usize>,
}

impl FlowPool {
    fn new(max_size: Option<usize>) -> Self {
        FlowPool {
            pool: Mutex::new(Vec::new()),
            max_size,
        }
    }

    fn take(
        &self,
        root: Arc<crate::trie::ImprintNode>,
        root_label: String,
        allocation: Allocation,
    ) -> Arc<FlowState> {
        if let Some(mut recycled) = self.pool.lock().pop() {
            recycled.reinit(root, root_label, allocation);
            Arc::new(recycled)
        } else {
            Arc::new(FlowState::new(root, root_label, allocation))
        }
    }

    fn recycle(&self, flow: Arc<FlowState>) {
        let Ok(owned) = Arc::try_unwrap(flow) else {
            // Still referenced elsewhere; never recycle out from under a
            // live caller (§9 flow-state pooling discipline).
            return;
        };
        let mut pool = self.pool.lock();
        let has_room = match self.max_size {
            Some(max) => pool.len() < max,
            None => true,
        };
        if has_room {
            pool.push(owned);
        }
    }
}

/// The concurrent active flow table plus its reclamation channel.
pub struct ActiveFlowTable {
    entries: DashMap<ObjectId, Arc<FlowState>>,
    reclaim_tx: Sender<ObjectId>,
    reclaim_rx: Mutex<Receiver<ObjectId>>,
    pool: FlowPool,
    dropped_reclamations: AtomicU64,
}

impl ActiveFlowTable {
    /// Creates an empty active flow table, optionally bounding its recycled
    /// flow-state pool to `flow_state_pool_size` entries (`None` = unbounded).
    pub fn new(flow_state_pool_size: Option<usize>) -> Self {
        let (reclaim_tx, reclaim_rx) = mpsc::channel();
        ActiveFlowTable {
            entries: DashMap::new(),
            reclaim_tx,
            reclaim_rx: Mutex::new(reclaim_rx),
            pool: FlowPool::new(flow_state_pool_size),
            dropped_reclamations: AtomicU64::new(0),
        }
    }

    /// A cloneable sender a [`crate::handle::TrackedHandle`] holds to post
    /// its identity on `Drop` if its flow never completed.
    pub fn reclaim_sender(&self) -> Sender<ObjectId> {
        self.reclaim_tx.clone()
    }

    /// Looks up (or creates) the flow for `id`, observed under `signature`
    /// at `bucket`. Creation derives a root node from the trie and installs
    /// a fresh pooled-or-new flow state (§4.3 `get_or_create`).
    ///
    /// Returns the flow together with whether it was newly created by this
    /// call. A freshly created flow is already positioned at the root that
    /// *is* this first observation — the façade must not also traverse a
    /// child for the same observation, or the root's own signature would be
    /// duplicated one level down (§8 scenario S1: three observations on one
    /// object produce exactly three nodes, not four).
    pub fn get_or_create(
        &self,
        id: ObjectId,
        signature: InternedString,
        bucket: RefCountBucket,
        allocation: Allocation,
        trie: &ImprintTrie,
    ) -> (Arc<FlowState>, bool) {
        if let Some(existing) = self.entries.get(&id) {
            return (existing.clone(), false);
        }
        let root_label = signature.to_string();
        let root = trie.get_or_create_root(signature, bucket);
        let flow = self.pool.take(root, root_label, allocation);
        match self.entries.entry(id) {
            dashmap::mapref::entry::Entry::Occupied(entry) => (entry.get().clone(), false),
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(flow.clone());
                (flow, true)
            }
        }
    }

    /// Called when the façade observes `ref_count == 0` for `id`: marks the
    /// flow completed, records a clean outcome on its current node, removes
    /// it from the table, and recycles the flow state.
    pub fn record_clean_release(&self, id: ObjectId, trie: &ImprintTrie) {
        let Some((_, flow)) = self.entries.remove(&id) else {
            return;
        };
        if flow.complete() {
            trie.record_outcome(&flow.current_node(), true);
        }
        self.pool.recycle(flow);
    }

    /// Drains the reclamation queue; every reclaimed entry whose flow was
    /// not already completed is a leak (§4.3 `process_reclamation_queue`).
    pub fn process_reclamation_queue(&self, trie: &ImprintTrie, sink: &LeakEventSink) {
        let pending: Vec<ObjectId> = {
            let rx = self.reclaim_rx.lock();
            rx.try_iter().collect()
        };
        for id in pending {
            self.finalize_as_leak(id, trie, sink);
        }
    }

    /// Shutdown path (§4.3 `mark_remaining_as_leaks`): treat every entry
    /// still present as a leak, as if it had just been reclaimed.
    pub fn mark_remaining_as_leaks(&self, trie: &ImprintTrie, sink: &LeakEventSink) {
        let ids: Vec<ObjectId> = self.entries.iter().map(|kv| *kv.key()).collect();
        for id in ids {
            self.finalize_as_leak(id, trie, sink);
        }
    }

    fn finalize_as_leak(&self, id: ObjectId, trie: &ImprintTrie, sink: &LeakEventSink) {
        let Some((_, flow)) = self.entries.remove(&id) else {
            self.dropped_reclamations.fetch_add(1, Ordering::Relaxed);
            return;
        };
        if flow.complete() {
            let node = flow.current_node();
            trie.record_outcome(&node, false);
            sink.push(LeakEvent {
                root_label: flow.root_label().to_string(),
                allocation: flow.allocation(),
                detected_at: OffsetDateTime::now_utc(),
                path: path_string(&node),
            });
        }
        self.pool.recycle(flow);
    }

    /// Number of currently live (not yet terminal) tracked objects.
    pub fn active_count(&self) -> usize {
        self.entries.len()
    }

    /// Number of reclamation notifications received for identities that
    /// were no longer present in the table (e.g. already cleanly released).
    pub fn dropped_reclamation_count(&self) -> u64 {
        self.dropped_reclamations.load(Ordering::Relaxed)
    }

    /// Clears all entries without recording outcomes. Only used by a global
    /// `reset`, never on the hot path.
    pub fn reset(&self) {
        self.entries.clear();
        self.dropped_reclamations.store(0, Ordering::Relaxed);
        let rx = self.reclaim_rx.lock();
        while rx.try_recv().is_ok() {}
    }
}
