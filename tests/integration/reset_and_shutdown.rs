//! Shutdown semantics (§7 "Shutdown"), `reset` idempotence (§8 round-trip
//! property), and the configuration-validation boundary (§6.5).

use imprint_tracer::{Tracker, TrackerConfig, TrackerError};

#[test]
fn shutdown_drains_reclamation_queue_then_marks_remainder_as_leaks() {
    let tracker = Tracker::new(TrackerConfig::default()).unwrap();

    let handle = tracker.track(vec![0u8; 8], imprint_tracer::Allocation::Heap);
    tracker.record_method_call(Some(handle.id()), "A.alloc", 1);
    drop(handle); // reclaimed, never drained explicitly before shutdown

    tracker.record_method_call(Some(99), "B.alloc", 1); // still live at shutdown

    tracker.shutdown();

    assert_eq!(tracker.metrics().active_flow_count, 0);
    let events = tracker.drain_leak_events();
    assert_eq!(events.len(), 2);
}

#[test]
fn reset_then_replay_reproduces_the_same_aggregate_counts() {
    let tracker = Tracker::new(TrackerConfig::default()).unwrap();

    let replay = |t: &Tracker| {
        t.record_method_call(Some(1), "A.alloc", 1);
        t.record_method_call(Some(1), "B.use", 1);
        t.record_method_call(Some(1), "C.free", 0);
    };

    replay(&tracker);
    let before = tracker.roots()[0].children()[0].children()[0].clean_count();

    tracker.reset();
    assert_eq!(tracker.metrics().node_count, 0);
    assert_eq!(tracker.metrics().root_count, 0);

    replay(&tracker);
    let after = tracker.roots()[0].children()[0].children()[0].clean_count();

    assert_eq!(before, 1);
    assert_eq!(after, 1);
}

#[test]
fn reset_clears_leak_events_and_dropped_counters() {
    let tracker = Tracker::new(TrackerConfig::default()).unwrap();
    tracker.record_method_call(Some(1), "A.alloc", 1);
    tracker.shutdown();
    assert!(!tracker.drain_leak_events().is_empty());

    tracker.record_method_call(Some(2), "A.alloc", 1);
    tracker.shutdown();
    tracker.reset();

    assert!(tracker.drain_leak_events().is_empty());
    assert_eq!(tracker.metrics().dropped_leak_event_count, 0);
}

#[test]
fn config_validation_rejects_zero_max_depth() {
    let cfg = TrackerConfig {
        max_depth: 0,
        ..TrackerConfig::default()
    };
    let result = Tracker::new(cfg);
    assert!(matches!(result, Err(TrackerError::InvalidConfig(_))));
}

#[test]
fn config_validation_rejects_zero_max_nodes() {
    let cfg = TrackerConfig {
        max_nodes: 0,
        ..TrackerConfig::default()
    };
    assert!(Tracker::new(cfg).is_err());
}

#[test]
fn config_validation_rejects_zero_leak_event_queue_capacity() {
    let cfg = TrackerConfig {
        leak_event_queue_capacity: 0,
        ..TrackerConfig::default()
    };
    assert!(Tracker::new(cfg).is_err());
}
