//! The concurrent, bounded imprint trie (§4.2). Roots are allocation-site
//! observations; children are subsequent observed method calls. No eviction:
//! limits are enforced by refusing to grow once a cap is hit.

mod key;
mod node;

pub use key::NodeKey;
pub use node::{ImprintNode, MAX_CHILDREN_PER_NODE};

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::bucket::RefCountBucket;
use crate::intern::InternedString;
use node::reserve_node_slot;

/// The shared, process-lifetime trie of observed call paths.
pub struct ImprintTrie {
    roots: DashMap<NodeKey, Arc<ImprintNode>>,
    node_count: AtomicUsize,
    max_nodes: usize,
    max_depth: u32,
    node_cap_logged: AtomicBool,
}

impl ImprintTrie {
    /// Creates an empty trie bounded to `max_nodes` total nodes and
    /// `max_depth` edges per flow.
    pub fn new(max_nodes: usize, max_depth: u32) -> Self {
        ImprintTrie {
            roots: DashMap::new(),
            node_count: AtomicUsize::new(0),
            max_nodes,
            max_depth,
            node_cap_logged: AtomicBool::new(false),
        }
    }

    /// Looks up a root keyed by `(signature, bucket)`, creating it if
    /// absent and under the global node cap. Returns some existing root
    /// for overflow calls once the cap is reached (§8 scenario S5).
    pub fn get_or_create_root(
        &self,
        signature: InternedString,
        bucket: RefCountBucket,
    ) -> Arc<ImprintNode> {
        let key = NodeKey::new(signature.clone(), bucket);
        if let Some(existing) = self.roots.get(&key) {
            existing.bump_traversal();
            return existing.clone();
        }

        if reserve_node_slot(&self.node_count, self.max_nodes).is_none() {
            self.log_node_cap_once();
            return self.any_existing_root();
        }

        match self.roots.entry(key) {
            Entry::Occupied(entry) => {
                self.node_count.fetch_sub(1, Ordering::Relaxed);
                let existing = entry.get().clone();
                existing.bump_traversal();
                existing
            }
            Entry::Vacant(entry) => {
                let root = ImprintNode::new_root(signature, bucket);
                root.bump_traversal();
                entry.insert(root.clone());
                root
            }
        }
    }

    /// Returns any existing root, used once the node cap makes creating a
    /// new one impossible. Panics only if called before any root exists,
    /// which cannot happen on the path that calls it (a cap of zero is
    /// rejected by `TrackerConfig::validate`, so at least one root must
    /// have been created before the cap could be reached).
    fn any_existing_root(&self) -> Arc<ImprintNode> {
        self.roots
            .iter()
            .next()
            .map(|kv| kv.value().clone())
            .expect("node cap reached with no roots created: config should have rejected max_nodes == 0")
    }

    fn log_node_cap_once(&self) {
        if !self.node_cap_logged.swap(true, Ordering::Relaxed) {
            tracing::warn!(
                max_nodes = self.max_nodes,
                "imprint trie reached global node cap; no further nodes will be created"
            );
        }
    }

    /// Resolves or creates `parent`'s `(signature, bucket)` child.
    ///
    /// A no-op (returns `parent` unchanged) once `current_depth` reaches
    /// `max_depth`, once the per-node fan-out cap is reached, or once the
    /// global node cap is reached.
    pub fn traverse_or_create(
        &self,
        parent: &Arc<ImprintNode>,
        signature: InternedString,
        bucket: RefCountBucket,
        current_depth: u32,
    ) -> Arc<ImprintNode> {
        if current_depth >= self.max_depth {
            return parent.clone();
        }
        if self.node_count.load(Ordering::Acquire) >= self.max_nodes {
            self.log_node_cap_once();
            return parent.clone();
        }
        parent.get_or_create_child(signature, bucket, &self.node_count, self.max_nodes)
    }

    /// Records a flow's terminal outcome on the node where it terminated.
    pub fn record_outcome(&self, node: &Arc<ImprintNode>, was_clean: bool) {
        node.record_outcome(was_clean);
    }

    /// Snapshot iterator over the current roots. Not a linearizable
    /// snapshot — concurrent inserts may or may not be visible.
    pub fn roots(&self) -> Vec<Arc<ImprintNode>> {
        self.roots.iter().map(|kv| kv.value().clone()).collect()
    }

    /// Approximate count of nodes created so far (soft bound; see §4.2).
    pub fn node_count(&self) -> usize {
        self.node_count.load(Ordering::Relaxed)
    }

    /// Number of distinct roots.
    pub fn root_count(&self) -> usize {
        self.roots.len()
    }

    /// Configured global node cap.
    pub fn max_nodes(&self) -> usize {
        self.max_nodes
    }

    /// Configured max traversal depth.
    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Drops every root (and transitively every node reachable only
    /// through them) and zeroes the node counter. Called only by a global
    /// `reset`, never on the hot path.
    pub fn reset(&self) {
        self.roots.clear();
        self.node_count.store(0, Ordering::Relaxed);
        self.node_cap_logged.store(false, Ordering::Relaxed);
    }
}

/// Reconstructs the root-to-`node` path as `"A.alloc -> B.use -> C.free"`.
pub fn path_string(node: &Arc<ImprintNode>) -> String {
    let mut labels = Vec::new();
    let mut current = Some(node.clone());
    while let Some(n) = current {
        labels.push(n.signature().to_string());
        current = n.parent();
    }
    labels.reverse();
    labels.join(" -> ")
}
