//! Per-object flow state: a tracked object's current position in the
//! imprint trie, plus the bits needed to emit a leak event if the object is
//! reclaimed before it reaches a clean release (§3 "Flow state").
//!
//! Depth and the completed flag are packed into a single `AtomicU8` exactly
//! as specified in §5: bit 7 is the completed flag, bits 0-6 are depth,
//! clamped at 127. This makes "advance depth" and "mark completed" both
//! single compare-and-swap loops with no lost updates.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::trie::ImprintNode;

const COMPLETED_BIT: u8 = 0b1000_0000;
const DEPTH_MASK: u8 = 0b0111_1111;
const MAX_PACKED_DEPTH: u8 = DEPTH_MASK;

/// Whether an object's flow terminated cleanly or via reclamation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// `ref_count == 0` was observed.
    Clean,
    /// The tracked object was reclaimed without a zero observation.
    Leak,
}

/// Classification supplied at [`crate::handle::TrackedHandle`] construction
/// (Design Notes §9, open question 2: this field is always present).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Allocation {
    /// A directly-allocated (off-heap) buffer.
    Direct,
    /// A heap-allocated buffer.
    Heap,
}

/// One tracked object's current position in the imprint trie.
///
/// Mutated only through [`crate::tracker::Tracker::record_method_call`] and
/// the completion paths in [`crate::active::ActiveFlowTable`]. The packed
/// depth/completed field uses compare-and-swap loops; `current_node` is
/// guarded by a small mutex (uncontended in practice, since only the owning
/// thread mutates a given flow under normal single-owner reference-counted
/// usage per §5).
pub struct FlowState {
    packed: AtomicU8,
    current_node: Mutex<Arc<ImprintNode>>,
    root_label: String,
    allocation: Allocation,
}

impl FlowState {
    /// Creates a new live flow positioned at `root`, depth 0.
    pub fn new(root: Arc<ImprintNode>, root_label: String, allocation: Allocation) -> Self {
        FlowState {
            packed: AtomicU8::new(0),
            current_node: Mutex::new(root),
            root_label,
            allocation,
        }
    }

    /// Re-initializes a pooled flow state in place for reuse (§9
    /// flow-state pooling: the outer record is minimal, the mutable state
    /// is recycled).
    pub fn reinit(&mut self, root: Arc<ImprintNode>, root_label: String, allocation: Allocation) {
        self.packed.store(0, Ordering::Relaxed);
        *self.current_node.get_mut() = root;
        self.root_label = root_label;
        self.allocation = allocation;
    }

    /// The allocation-site label (first observed signature), used in leak events.
    pub fn root_label(&self) -> &str {
        &self.root_label
    }

    /// The direct/heap classification supplied at construction.
    pub fn allocation(&self) -> Allocation {
        self.allocation
    }

    /// Current trie position.
    pub fn current_node(&self) -> Arc<ImprintNode> {
        self.current_node.lock().clone()
    }

    /// Current depth (0 = at root).
    pub fn depth(&self) -> u32 {
        (self.packed.load(Ordering::Acquire) & DEPTH_MASK) as u32
    }

    /// Whether this flow has already terminated (clean or leak).
    pub fn is_completed(&self) -> bool {
        self.packed.load(Ordering::Acquire) & COMPLETED_BIT != 0
    }

    /// Advances the flow to `next`, incrementing depth by one (clamped at
    /// 127 per §5). A no-op if the flow is already completed: the caller
    /// must check `is_completed` first, but this guards against a race
    /// where completion lands between the check and the advance.
    ///
    /// Returns `true` if the advance took effect.
    pub fn advance(&self, next: Arc<ImprintNode>) -> bool {
        loop {
            let current = self.packed.load(Ordering::Acquire);
            if current & COMPLETED_BIT != 0 {
                return false;
            }
            let depth = current & DEPTH_MASK;
            let new_depth = depth.saturating_add(1).min(MAX_PACKED_DEPTH);
            let updated = new_depth;
            if self
                .packed
                .compare_exchange_weak(current, updated, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                *self.current_node.lock() = next;
                return true;
            }
        }
    }

    /// Marks the flow terminal. Returns `true` the first time this
    /// succeeds; a second call (a stale observation on an already-completed
    /// flow) is a silent no-op returning `false` (§4.3 invariant).
    pub fn complete(&self) -> bool {
        loop {
            let current = self.packed.load(Ordering::Acquire);
            if current & COMPLETED_BIT != 0 {
                return false;
            }
            let updated = current | COMPLETED_BIT;
            if self
                .packed
                .compare_exchange_weak(current, updated, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return true;
            }
        }
    }
}
