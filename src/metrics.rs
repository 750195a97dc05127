//! A point-in-time metrics snapshot (§6.5), the seam an out-of-scope
//! scheduled metric pusher and user-facing metric handler registry would
//! poll. This crate implements neither; it only exposes the snapshot type.

use serde::Serialize;

/// A serializable snapshot of the tracker's internal counters, analogous to
/// this codebase's other `*Stats`/`*Report` types.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TrackerMetrics {
    /// Approximate total trie node count (soft bound; see §4.2).
    pub node_count: usize,
    /// Number of distinct allocation-site roots.
    pub root_count: usize,
    /// Number of currently live (not yet terminal) tracked objects.
    pub active_flow_count: usize,
    /// Reclamation notifications received for identities no longer present
    /// in the active table (already clean-released or already processed).
    pub dropped_reclamation_count: u64,
    /// Leak events dropped because the sink was at capacity.
    pub dropped_leak_event_count: u64,
    /// Number of distinct strings successfully canonicalized so far.
    pub interner_len: usize,
    /// Configured string interner capacity.
    pub interner_capacity: usize,
    /// Configured global trie node cap.
    pub max_nodes: usize,
    /// Configured maximum traversal depth.
    pub max_depth: u32,
}
