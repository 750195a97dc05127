//! End-to-end scenarios S4-S5 and the bucketing/fan-out/depth-cap policies
//! from the specification's testable-properties table.

use std::sync::Arc;

use imprint_tracer::bucket::RefCountBucket;
use imprint_tracer::intern::StringInterner;
use imprint_tracer::trie::{ImprintTrie, MAX_CHILDREN_PER_NODE};
use imprint_tracer::{Tracker, TrackerConfig};

#[test]
fn s4_fanout_saturates_at_max_children_per_node() {
    let interner = StringInterner::with_capacity(4096);
    let trie = ImprintTrie::new(1_000_000, 100);
    let root = trie.get_or_create_root(
        interner.intern(Some("Parent.alloc")).unwrap(),
        RefCountBucket::Low,
    );

    for i in 0..MAX_CHILDREN_PER_NODE {
        let sig = interner.intern(Some(&format!("Child{i}.call"))).unwrap();
        trie.traverse_or_create(&root, sig, RefCountBucket::Low, 0);
    }
    assert_eq!(root.children().len(), MAX_CHILDREN_PER_NODE);

    let overflow_sig = interner.intern(Some("Overflow.call")).unwrap();
    let result = trie.traverse_or_create(&root, overflow_sig, RefCountBucket::Low, 0);

    assert_eq!(root.children().len(), MAX_CHILDREN_PER_NODE);
    assert!(root
        .children()
        .iter()
        .all(|c| c.signature().as_ref() != "Overflow.call"));
    // Stop-on-limit: the call resolves to either the parent itself or an
    // already-existing child, never a new one.
    assert!(Arc::ptr_eq(&result, &root) || root.children().iter().any(|c| Arc::ptr_eq(c, &result)));
}

#[test]
fn s5_global_node_cap_stops_new_roots_but_overflow_still_resolves() {
    let interner = StringInterner::with_capacity(64);
    let trie = ImprintTrie::new(3, 100);

    trie.get_or_create_root(interner.intern(Some("A.alloc")).unwrap(), RefCountBucket::Low);
    trie.get_or_create_root(interner.intern(Some("B.alloc")).unwrap(), RefCountBucket::Low);
    trie.get_or_create_root(interner.intern(Some("C.alloc")).unwrap(), RefCountBucket::Low);
    assert_eq!(trie.root_count(), 3);

    let overflow = trie.get_or_create_root(interner.intern(Some("D.alloc")).unwrap(), RefCountBucket::Low);
    assert_eq!(trie.root_count(), 3);
    assert!(trie.roots().iter().any(|r| Arc::ptr_eq(r, &overflow)));
}

#[test]
fn node_cap_enforced_through_the_full_tracker_stops_new_roots() {
    let cfg = TrackerConfig {
        max_nodes: 2,
        ..TrackerConfig::default()
    };
    let tracker = Tracker::new(cfg).unwrap();

    tracker.record_method_call(Some(1), "A.alloc", 1);
    tracker.record_method_call(Some(2), "B.alloc", 1);
    // A third distinct root would exceed the cap; it must not be created.
    tracker.record_method_call(Some(3), "C.alloc", 1);

    assert!(tracker.metrics().node_count <= 2);
    assert_eq!(tracker.roots().len(), 2);
}

#[test]
fn depth_cap_makes_traversal_beyond_max_depth_a_no_op() {
    let interner = StringInterner::with_capacity(64);
    let trie = ImprintTrie::new(1_000_000, 2);
    let root = trie.get_or_create_root(interner.intern(Some("A.alloc")).unwrap(), RefCountBucket::Low);
    let n1 = trie.traverse_or_create(&root, interner.intern(Some("B.use")).unwrap(), RefCountBucket::Low, 0);
    let n2 = trie.traverse_or_create(&n1, interner.intern(Some("C.use")).unwrap(), RefCountBucket::Low, 2);
    assert!(Arc::ptr_eq(&n1, &n2));
}

#[test]
fn bucketing_matches_the_configured_quantization_table() {
    assert_eq!(RefCountBucket::of(0), RefCountBucket::Released);
    assert_eq!(RefCountBucket::of(1), RefCountBucket::Low);
    assert_eq!(RefCountBucket::of(2), RefCountBucket::Low);
    assert_eq!(RefCountBucket::of(3), RefCountBucket::Medium);
    assert_eq!(RefCountBucket::of(5), RefCountBucket::Medium);
    assert_eq!(RefCountBucket::of(6), RefCountBucket::High);
    assert_eq!(RefCountBucket::of(9999), RefCountBucket::High);
}

#[test]
fn interning_same_content_twice_yields_identity_equal_handles() {
    let interner = StringInterner::with_capacity(64);
    let a = interner.intern(Some("A.alloc")).unwrap();
    let b = interner.intern(Some("A.alloc")).unwrap();
    assert_eq!(a, b);
}
