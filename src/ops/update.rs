//! Bulk ingest — repeated assoc under one mutation token.

use std::hash::{BuildHasher, Hash};

use crate::hash::hash_of;
use crate::node::NodeRef;
use crate::ops::assoc::assoc;

/// Binds every pair of `iterable` into the tree rooted at `root`,
/// maintaining `count` as keys are added.
///
/// All inserts run under the same `mutid`, so intermediate nodes created
/// for one pair are edited in place by the next instead of being copied
/// again.
pub(crate) fn bulk_insert<K, V, S, I>(
    root: &mut NodeRef<K, V>,
    count: &mut usize,
    hasher: &S,
    iterable: I,
    mutid: u64,
) where
    K: Hash + Eq + Clone,
    V: Clone,
    S: BuildHasher,
    I: IntoIterator<Item = (K, V)>,
{
    for (key, value) in iterable {
        let hash = hash_of(hasher, &key);
        let mut added = false;
        assoc(root, 0, hash, key, value, &mut added, mutid);
        if added {
            *count += 1;
        }
    }
}
