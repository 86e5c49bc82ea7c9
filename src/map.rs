//! The persistent map façade.

use std::fmt;
use std::hash::{BuildHasher, Hash, Hasher};
use std::ops::Index;
use std::sync::OnceLock;

use foldhash::fast::FixedState;

use crate::error::MapError;
use crate::hash::hash_of;
use crate::iter::{Iter, Keys, Values};
use crate::mutate::{next_mutid, MapMutation};
use crate::node::{dump_node, empty_bitmap, NodeRef};
use crate::ops::assoc::assoc;
use crate::ops::find::find;
use crate::ops::update::bulk_insert;
use crate::ops::without::{without, Removed};

/// A persistent hash map.
///
/// All updates are non-destructive: they return a new map that shares
/// every unchanged subtree with its predecessor.  Cloning is O(1).
///
/// The default hasher is [`foldhash::fast::FixedState`], which is
/// deterministic within a process, so a given key set always produces the
/// same tree shape.
pub struct HamtMap<K, V, S = FixedState> {
    root: NodeRef<K, V>,
    count: usize,
    hash_memo: OnceLock<u64>,
    hasher: S,
}

// ---------------------------------------------------------------------------
// Construction & accessors — no key/value bounds
// ---------------------------------------------------------------------------

impl<K, V> HamtMap<K, V> {
    /// Creates an empty map with the default hasher.
    #[must_use]
    pub fn new() -> Self {
        Self::with_hasher(FixedState::default())
    }
}

impl<K, V, S> HamtMap<K, V, S> {
    /// Creates an empty map that hashes keys with `hasher`.
    #[must_use]
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            root: empty_bitmap(0),
            count: 0,
            hash_memo: OnceLock::new(),
            hasher,
        }
    }

    /// Returns the number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.count
    }

    /// Returns `true` if the map holds no bindings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns an iterator over `(&K, &V)` pairs.
    #[must_use]
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(&self.root, self.count)
    }

    /// Returns an iterator over the keys.
    #[must_use]
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys::new(self.iter())
    }

    /// Returns an iterator over the values.
    #[must_use]
    pub fn values(&self) -> Values<'_, K, V> {
        Values::new(self.iter())
    }

    pub(crate) fn from_parts(root: NodeRef<K, V>, count: usize, hasher: S) -> Self {
        Self {
            root,
            count,
            hash_memo: OnceLock::new(),
            hasher,
        }
    }

    pub(crate) fn root(&self) -> &NodeRef<K, V> {
        &self.root
    }
}

// ---------------------------------------------------------------------------
// Read operations — K: Hash + Eq
// ---------------------------------------------------------------------------

impl<K, V, S> HamtMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    /// Returns a reference to the value bound to `key`.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<&V> {
        if self.count == 0 {
            return None;
        }
        find(&self.root, 0, hash_of(&self.hasher, key), key)
    }

    /// Returns the value bound to `key`, or `default` if the key is absent.
    #[must_use]
    pub fn get_or<'a>(&'a self, key: &K, default: &'a V) -> &'a V {
        self.get(key).unwrap_or(default)
    }

    /// Returns `true` if the map contains `key`.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }
}

// ---------------------------------------------------------------------------
// Write operations — K: Hash + Eq + Clone, V: Clone
// ---------------------------------------------------------------------------

impl<K, V, S> HamtMap<K, V, S>
where
    K: Hash + Eq + Clone,
    V: Clone,
    S: BuildHasher + Clone,
{
    /// Returns a new map with `key` bound to `value`.
    ///
    /// An existing binding for the key is replaced; the length grows only
    /// when the key was absent.
    #[must_use]
    pub fn insert(&self, key: K, value: V) -> Self {
        let hash = hash_of(&self.hasher, &key);
        let mut root = self.root.clone();
        let mut added = false;
        assoc(&mut root, 0, hash, key, value, &mut added, 0);
        Self::from_parts(root, self.count + usize::from(added), self.hasher.clone())
    }

    /// Returns a new map without `key`.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::KeyMissing`] if the key is not present.
    pub fn remove(&self, key: &K) -> Result<Self, MapError<K>> {
        let hash = hash_of(&self.hasher, key);
        let mut root = self.root.clone();
        match without(&mut root, 0, hash, key, 0) {
            Removed::NotFound => Err(MapError::KeyMissing(key.clone())),
            Removed::Empty => Ok(Self::with_hasher(self.hasher.clone())),
            Removed::Changed => Ok(Self::from_parts(
                root,
                self.count - 1,
                self.hasher.clone(),
            )),
        }
    }

    /// Returns a new map overlaid with every pair from `iterable`.
    ///
    /// Later pairs win over earlier ones and over existing bindings.  The
    /// whole batch runs under one mutation token, so intermediate nodes are
    /// reused rather than copied per pair.
    #[must_use]
    pub fn update<I>(&self, iterable: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let mutid = next_mutid();
        let mut root = self.root.clone();
        let mut count = self.count;
        bulk_insert(&mut root, &mut count, &self.hasher, iterable, mutid);
        Self::from_parts(root, count, self.hasher.clone())
    }

    /// Returns a new map overlaid with every binding of `other`.
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        self.update(other.iter().map(|(k, v)| (k.clone(), v.clone())))
    }

    /// Opens a mutation draft over this map.
    ///
    /// The draft batches edits with in-place node reuse and produces a new
    /// persistent map on [`finish`](MapMutation::finish); this map is never
    /// affected.
    #[must_use]
    pub fn mutate(&self) -> MapMutation<K, V, S> {
        MapMutation::from_map(self.root.clone(), self.count, self.hasher.clone())
    }

    /// Runs `f` on a fresh mutation draft and finishes it on every exit
    /// path, returning the resulting map.
    ///
    /// # Errors
    ///
    /// Propagates the error returned by `f`; the draft is still finished
    /// (and discarded) in that case.
    pub fn mutate_with<F, E>(&self, f: F) -> Result<Self, E>
    where
        F: FnOnce(&mut MapMutation<K, V, S>) -> Result<(), E>,
    {
        let mut draft = self.mutate();
        let result = f(&mut draft);
        let map = draft.finish();
        result.map(|()| map)
    }
}

// ---------------------------------------------------------------------------
// Content hash — K: Hash, V: Hash
// ---------------------------------------------------------------------------

/// Spreads entry hashes before XOR-folding so that structured keys don't
/// cancel each other out.  Adapted from CPython's `frozenset` hash.
pub(crate) fn shuffle_bits(h: u64) -> u64 {
    ((h ^ 89_869_747) ^ (h << 16)).wrapping_mul(3_644_798_167)
}

impl<K, V, S> HamtMap<K, V, S>
where
    K: Hash,
    V: Hash,
    S: BuildHasher,
{
    /// Order-independent hash of the map's contents, memoised after the
    /// first computation.
    ///
    /// Equal maps hash equal regardless of insertion order.
    #[must_use]
    pub fn content_hash(&self) -> u64 {
        *self.hash_memo.get_or_init(|| {
            let mut h: u64 = 0;
            for (key, value) in self.iter() {
                h ^= shuffle_bits(self.hasher.hash_one(key));
                h ^= shuffle_bits(self.hasher.hash_one(value));
            }
            h ^= (self.count as u64 * 2 + 1).wrapping_mul(1_927_868_237);
            h ^= (h >> 11) ^ (h >> 25);
            h = h.wrapping_mul(69_069).wrapping_add(907_133_923);
            if h == u64::MAX {
                1
            } else {
                h
            }
        })
    }
}

impl<K, V, S> Hash for HamtMap<K, V, S>
where
    K: Hash,
    V: Hash,
    S: BuildHasher,
{
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.content_hash());
    }
}

// ---------------------------------------------------------------------------
// Debug dump — K: Debug, V: Debug
// ---------------------------------------------------------------------------

impl<K, V, S> HamtMap<K, V, S>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    /// Renders the tree structure as an indented multi-line string.
    ///
    /// One line per node with its kind, sizes, bitmap, and address.  The
    /// format is unstable and meant for tests and debugging.
    #[must_use]
    pub fn dump(&self) -> String {
        let mut out = format!("HamtMap(len={}):\n", self.count);
        dump_node(&self.root, &mut out, 0);
        out
    }
}

// ---------------------------------------------------------------------------
// Trait impls
// ---------------------------------------------------------------------------

impl<K, V, S: Default> Default for HamtMap<K, V, S> {
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

impl<K, V, S: Clone> Clone for HamtMap<K, V, S> {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
            count: self.count,
            hash_memo: self.hash_memo.clone(),
            hasher: self.hasher.clone(),
        }
    }
}

impl<K, V, S> fmt::Debug for HamtMap<K, V, S>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, S> PartialEq for HamtMap<K, V, S>
where
    K: Hash + Eq,
    V: PartialEq,
    S: BuildHasher,
{
    fn eq(&self, other: &Self) -> bool {
        if std::sync::Arc::ptr_eq(&self.root, &other.root) {
            return true;
        }
        if self.count != other.count {
            return false;
        }
        self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl<K, V, S> Eq for HamtMap<K, V, S>
where
    K: Hash + Eq,
    V: Eq,
    S: BuildHasher,
{
}

impl<K, V, S> Index<&K> for HamtMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    type Output = V;

    fn index(&self, key: &K) -> &V {
        self.get(key).expect("no entry found for key")
    }
}

impl<'a, K, V, S> IntoIterator for &'a HamtMap<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

impl<K, V, S> FromIterator<(K, V)> for HamtMap<K, V, S>
where
    K: Hash + Eq + Clone,
    V: Clone,
    S: BuildHasher + Default + Clone,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::default().update(iter)
    }
}
