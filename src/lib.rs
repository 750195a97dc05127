//! # imprint-tracer
//!
//! An in-process flow tracer for reference-counted, manually-released
//! objects (canonically, pooled byte buffers). It observes method-level
//! interactions with such objects, records the call paths each individual
//! object traverses during its lifetime into a bounded, concurrent
//! aggregating trie, and classifies every object's terminal outcome as a
//! **clean release** (reference count reached zero) or a **leak** (the
//! runtime reclaimed the object without it ever reaching zero).
//!
//! ## Quick start
//!
//! ```rust
//! use imprint_tracer::{Tracker, TrackerConfig};
//!
//! let tracker = Tracker::new(TrackerConfig::default())?;
//! tracker.record_method_call(Some(1), "ByteBuf.alloc", 1);
//! tracker.record_method_call(Some(1), "ByteBuf.use", 1);
//! tracker.record_method_call(Some(1), "ByteBuf.release", 0);
//!
//! let events = tracker.drain_leak_events();
//! assert!(events.is_empty());
//! # Ok::<(), imprint_tracer::TrackerError>(())
//! ```
//!
//! ## Architecture
//!
//! Four collaborating components, leaf-first:
//! - **String interner** ([`intern`]): canonicalizes class/method/signature
//!   strings so downstream comparisons use identity, not content.
//! - **Imprint trie** ([`trie`]): the concurrent, bounded prefix tree that
//!   aggregates every observed call path.
//! - **Active flow table** ([`active`]): tracks each live object's current
//!   position in the trie and notices when it is reclaimed unreleased.
//! - **Tracker façade** ([`tracker`]): the single hot-path entry point,
//!   [`Tracker::record_method_call`].
//!
//! Out of scope (external collaborators whose interfaces this crate defines
//! but whose internals it does not implement): bytecode instrumentation,
//! trie renderers, a management/JMX surface, CLI flags and config-file
//! parsing, a scheduled metric pusher, and a user-facing metric handler
//! registry.

pub mod active;
pub mod bucket;
pub mod config;
pub mod error;
pub mod flow;
pub mod handle;
pub mod intern;
pub mod metrics;
pub mod signature;
pub mod sink;
pub mod tracker;
pub mod trie;

pub use crate::active::ObjectId;
pub use crate::bucket::RefCountBucket;
pub use crate::config::TrackerConfig;
pub use crate::error::{Result, TrackerError};
pub use crate::flow::Allocation;
pub use crate::handle::{PredicateRefCount, RefCounted, TrackedHandle};
pub use crate::intern::InternedString;
pub use crate::metrics::TrackerMetrics;
pub use crate::sink::LeakEvent;
pub use crate::tracker::{global, init_global, Tracker};
pub use crate::trie::{path_string, ImprintNode};
