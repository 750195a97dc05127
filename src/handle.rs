//! Smart handles wrapping tracked objects, realizing the spec's "weak
//! reference + reclamation queue" requirement without a tracing garbage
//! collector (SPEC_FULL.md §3, Design Notes §9).
//!
//! A [`TrackedHandle<T>`] owns its payload and carries a process-unique
//! identity assigned at construction. Its `Drop` unconditionally posts that
//! identity to the owning tracker's reclamation channel, mirroring "the
//! runtime's reclamation mechanism produces a notification when the object
//! becomes unreachable" from §6.2; the active flow table treats a
//! notification for an already clean-released identity as a no-op.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Sender;

use crate::active::ObjectId;
use crate::flow::Allocation;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Allocates the next process-unique object identity.
pub fn next_object_id() -> ObjectId {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// A reference count supplied by a tracked type.
///
/// Two historical strategies exist per §6.1: a typed reference-counted
/// buffer exposing a built-in counter (implement this trait directly), or a
/// generic object with a user-supplied liveness predicate mapped to
/// `{0, 1}` (wrap the predicate's result with [`PredicateRefCount`]).
pub trait RefCounted {
    /// The current reference count, as last reported by the tracked object.
    fn ref_count(&self) -> u32;
}

/// Adapts a liveness predicate (`true` while still reachable) into the
/// `{0, 1}` reference count §6.1 describes for generic, non-reference-counted objects.
pub struct PredicateRefCount<F: Fn() -> bool>(pub F);

impl<F: Fn() -> bool> RefCounted for PredicateRefCount<F> {
    fn ref_count(&self) -> u32 {
        if (self.0)() {
            1
        } else {
            0
        }
    }
}

/// Wraps a tracked object with the identity and reclamation bookkeeping the
/// tracker needs. Constructed via [`crate::tracker::Tracker::track`].
///
/// `Drop` always posts this handle's identity to the reclamation channel.
/// Posting is unconditional rather than gated on a "did this complete
/// cleanly" flag: the active flow table already treats a reclamation
/// notification for an identity it no longer holds (because it was removed
/// by a prior clean release) as a benign no-op, so there is no need to
/// duplicate that bookkeeping here (§6.2's "at-least-once delivery" already
/// presumes idempotent consumers).
pub struct TrackedHandle<T> {
    payload: T,
    id: ObjectId,
    allocation: Allocation,
    reclaim_tx: Sender<ObjectId>,
}

impl<T> TrackedHandle<T> {
    pub(crate) fn new(payload: T, allocation: Allocation, reclaim_tx: Sender<ObjectId>) -> Self {
        TrackedHandle {
            payload,
            id: next_object_id(),
            allocation,
            reclaim_tx,
        }
    }

    /// This handle's process-unique identity, used to key the active flow table.
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// The direct/heap classification supplied at construction.
    pub fn allocation(&self) -> Allocation {
        self.allocation
    }
}

impl<T> std::ops::Deref for TrackedHandle<T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.payload
    }
}

impl<T> std::ops::DerefMut for TrackedHandle<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.payload
    }
}

impl<T> Drop for TrackedHandle<T> {
    fn drop(&mut self) {
        // Best-effort: if the tracker itself has already shut down, the
        // receiving end is gone and the send silently fails, matching
        // §7's "no fatal errors on the hot path" posture.
        let _ = self.reclaim_tx.send(self.id);
    }
}
