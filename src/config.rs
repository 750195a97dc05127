use crate::error::{Result, TrackerError};

/// Initialization-time configuration for a [`crate::tracker::Tracker`].
///
/// There is no dynamic reconfiguration on the hot path: a config is
/// snapshotted once, at construction, and never consulted again except to
/// read its plain fields.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Soft cap on the total number of trie nodes (roots + children) ever created.
    pub max_nodes: usize,
    /// Hard cap on the number of edges a single flow may traverse.
    pub max_depth: u32,
    /// Fixed capacity of the string interner, sized well above `max_nodes`
    /// so overflow (falling back to un-canonicalized strings) is rare.
    pub interner_capacity: usize,
    /// Optional cap on the number of recycled flow-state allocations kept
    /// warm in the pool. `None` means unbounded (every released flow state
    /// is kept for reuse).
    pub flow_state_pool_size: Option<usize>,
    /// Bound on the leak-event sink; beyond this, new events are dropped
    /// and counted rather than blocking the producer.
    pub leak_event_queue_capacity: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_nodes: 1_000_000,
            max_depth: 100,
            interner_capacity: 2_000_000,
            flow_state_pool_size: None,
            leak_event_queue_capacity: 10_000,
        }
    }
}

impl TrackerConfig {
    /// Rejects configurations that would make the tracker immediately inert
    /// or pathological. Called once at construction, never on the hot path.
    pub fn validate(&self) -> Result<()> {
        if self.max_depth == 0 {
            return Err(TrackerError::InvalidConfig(
                "max_depth must be at least 1".into(),
            ));
        }
        if self.max_nodes == 0 {
            return Err(TrackerError::InvalidConfig(
                "max_nodes must be at least 1".into(),
            ));
        }
        if self.interner_capacity == 0 {
            return Err(TrackerError::InvalidConfig(
                "interner_capacity must be at least 1".into(),
            ));
        }
        if self.leak_event_queue_capacity == 0 {
            return Err(TrackerError::InvalidConfig(
                "leak_event_queue_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
