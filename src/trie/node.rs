use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::bucket::RefCountBucket;
use crate::intern::InternedString;
use crate::signature::split_signature;

use super::key::NodeKey;

/// Fan-out ceiling per node (Design default), strict: a child map's
/// successfully-inserted entry count never exceeds this (§8 invariant 5).
pub const MAX_CHILDREN_PER_NODE: usize = 1000;

/// One imprint trie node: a single observed `(method_signature, bucket)`
/// step, aggregated across every flow that passed through it.
///
/// Identity (`signature`, `bucket`, `parent`) is immutable after creation;
/// only the counters and the (lazily allocated) child map mutate. Nodes are
/// never deleted — limits are enforced by refusing to grow further, not by
/// eviction (§4.2).
pub struct ImprintNode {
    signature: InternedString,
    bucket: RefCountBucket,
    parent: Option<Weak<ImprintNode>>,
    children: OnceLock<DashMap<NodeKey, Arc<ImprintNode>>>,
    child_count: AtomicUsize,
    traversal: AtomicU64,
    clean: AtomicU64,
    leak: AtomicU64,
}

impl ImprintNode {
    pub(crate) fn new_root(signature: InternedString, bucket: RefCountBucket) -> Arc<Self> {
        Arc::new(ImprintNode {
            signature,
            bucket,
            parent: None,
            children: OnceLock::new(),
            child_count: AtomicUsize::new(0),
            traversal: AtomicU64::new(0),
            clean: AtomicU64::new(0),
            leak: AtomicU64::new(0),
        })
    }

    fn new_child(signature: InternedString, bucket: RefCountBucket, parent: &Arc<ImprintNode>) -> Arc<Self> {
        Arc::new(ImprintNode {
            signature,
            bucket,
            parent: Some(Arc::downgrade(parent)),
            children: OnceLock::new(),
            child_count: AtomicUsize::new(0),
            traversal: AtomicU64::new(0),
            clean: AtomicU64::new(0),
            leak: AtomicU64::new(0),
        })
    }

    /// The interned observation signature (`"ClassName.methodName"`) this node represents.
    pub fn signature(&self) -> &InternedString {
        &self.signature
    }

    /// The reference-count bucket this node represents.
    pub fn bucket(&self) -> RefCountBucket {
        self.bucket
    }

    /// Class-name view, derived on demand by splitting `signature`.
    pub fn class_name(&self) -> &str {
        split_signature(&self.signature).0
    }

    /// Method-name view, derived on demand by splitting `signature`.
    pub fn method_name(&self) -> &str {
        split_signature(&self.signature).1
    }

    /// Number of times a flow has traversed to (or reconfirmed) this node.
    pub fn traversal_count(&self) -> u64 {
        self.traversal.load(Ordering::Relaxed)
    }

    /// Number of flows that terminated here via clean release.
    pub fn clean_count(&self) -> u64 {
        self.clean.load(Ordering::Relaxed)
    }

    /// Number of flows that terminated here via leak.
    pub fn leak_count(&self) -> u64 {
        self.leak.load(Ordering::Relaxed)
    }

    pub(crate) fn bump_traversal(&self) {
        self.traversal.fetch_add(1, Ordering::Relaxed);
    }

    /// `true` iff the child map is empty or never allocated.
    pub fn is_leaf(&self) -> bool {
        self.children.get().map_or(true, |m| m.is_empty())
    }

    /// The node's parent, or `None` for a root. Upgraded from a weak
    /// reference: once a global `reset` drops every root, ancestor chains
    /// of nodes still referenced elsewhere can no longer be walked.
    pub fn parent(&self) -> Option<Arc<ImprintNode>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    /// Snapshot iterator over this node's current children. Not a
    /// linearizable snapshot — concurrent inserts may or may not be
    /// visible, per §6.3's "consistent snapshot not required".
    pub fn children(&self) -> Vec<Arc<ImprintNode>> {
        match self.children.get() {
            Some(map) => map.iter().map(|kv| kv.value().clone()).collect(),
            None => Vec::new(),
        }
    }

    pub(crate) fn record_outcome(&self, clean: bool) {
        if clean {
            self.clean.fetch_add(1, Ordering::Relaxed);
        } else {
            self.leak.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Resolves or creates the `(signature, bucket)` child of `self`,
    /// subject to the per-node fan-out cap and the trie's global node cap.
    ///
    /// Returns `self` unchanged (the stop-on-limit policy) when either cap
    /// is reached and the requested child does not already exist.
    pub(crate) fn get_or_create_child(
        self: &Arc<Self>,
        signature: InternedString,
        bucket: RefCountBucket,
        node_count: &AtomicUsize,
        max_nodes: usize,
    ) -> Arc<ImprintNode> {
        let key = NodeKey::new(signature.clone(), bucket);
        let children = self.children.get_or_init(DashMap::new);

        if let Some(existing) = children.get(&key) {
            existing.traversal.fetch_add(1, Ordering::Relaxed);
            return existing.clone();
        }

        // Reserve a fan-out slot before touching the map: this is the only
        // thing that must be a strict (never-overshoot) bound (§8 invariant 5).
        loop {
            let current = self.child_count.load(Ordering::Acquire);
            if current >= MAX_CHILDREN_PER_NODE {
                log_fanout_saturation(self);
                return self.clone();
            }
            if self
                .child_count
                .compare_exchange_weak(current, current + 1, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                break;
            }
        }

        if reserve_node_slot(node_count, max_nodes).is_none() {
            self.child_count.fetch_sub(1, Ordering::AcqRel);
            return self.clone();
        }

        match children.entry(key) {
            Entry::Occupied(entry) => {
                // Lost the race: another thread inserted the same key first.
                self.child_count.fetch_sub(1, Ordering::AcqRel);
                node_count.fetch_sub(1, Ordering::Relaxed);
                let existing = entry.get().clone();
                existing.traversal.fetch_add(1, Ordering::Relaxed);
                existing
            }
            Entry::Vacant(entry) => {
                let child = ImprintNode::new_child(signature, bucket, self);
                child.traversal.fetch_add(1, Ordering::Relaxed);
                entry.insert(child.clone());
                child
            }
        }
    }
}

/// Reserves one slot in the global node counter, returning `None` (no
/// reservation made) once `max_nodes` is reached. The counter is an
/// approximate, soft bound by design (§4.2): concurrent reservations may
/// race past `max_nodes` by a small margin, which the spec explicitly
/// tolerates.
pub(crate) fn reserve_node_slot(node_count: &AtomicUsize, max_nodes: usize) -> Option<()> {
    loop {
        let current = node_count.load(Ordering::Acquire);
        if current >= max_nodes {
            return None;
        }
        if node_count
            .compare_exchange_weak(current, current + 1, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            return Some(());
        }
    }
}

fn log_fanout_saturation(node: &Arc<ImprintNode>) {
    // Nodes that saturate fan-out are rare; plain debug-level logging here
    // never becomes a meaningful hot-path cost.
    tracing::debug!(
        signature = %node.signature,
        "trie node reached per-node fan-out cap; dropping new distinct child"
    );
}
