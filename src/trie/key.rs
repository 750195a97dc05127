use crate::bucket::RefCountBucket;
use crate::intern::InternedString;

/// The compressed trie node key: `(signature, bucket)`, not
/// `(class, method, bucket)` — saves a word per key and keeps equality a
/// single-pointer compare plus a byte compare. Class and method views are
/// derived on demand by splitting `signature` on its last `.`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct NodeKey {
    /// The interned observation signature (`"ClassName.methodName"`).
    pub signature: InternedString,
    /// The reference-count bucket observed alongside `signature`.
    pub bucket: RefCountBucket,
}

impl NodeKey {
    /// Builds a key from its two components.
    pub fn new(signature: InternedString, bucket: RefCountBucket) -> Self {
        NodeKey { signature, bucket }
    }
}
