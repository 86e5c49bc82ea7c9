//! Batched mutation drafts.
//!
//! A draft is a short-lived mutable view over a map's tree, stamped with a
//! token from a process-wide monotonic counter.  Nodes the draft created
//! carry that token and are edited in place; everything inherited from the
//! source map is cloned on first touch.  Tokens are never reused, so nodes
//! stamped by finished drafts are ordinary foreign nodes to later ones.

use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::sync::atomic::{AtomicU64, Ordering};

use foldhash::fast::FixedState;

use crate::error::MapError;
use crate::hash::hash_of;
use crate::iter::Iter;
use crate::map::HamtMap;
use crate::node::{empty_bitmap, NodeRef};
use crate::ops::assoc::assoc;
use crate::ops::find::find;
use crate::ops::update::bulk_insert;
use crate::ops::without::{without, Removed};

/// Process-wide mutation-token counter.  Starts at 1; `0` is reserved for
/// persistent nodes.  Uniqueness across overlapping drafts is all that
/// correctness requires, and a 64-bit counter cannot realistically wrap.
static MUTID_COUNTER: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_mutid() -> u64 {
    MUTID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// A mutable draft of a [`HamtMap`].
///
/// Created by [`HamtMap::mutate`].  Edits accumulate in place where the
/// draft exclusively owns nodes, then [`finish`](Self::finish) freezes the
/// tree into a new persistent map.  The source map is never modified.
///
/// A draft is single-owner: all mutating methods take `&mut self`.
pub struct MapMutation<K, V, S = FixedState> {
    root: NodeRef<K, V>,
    count: usize,
    mutid: u64,
    hasher: S,
}

impl<K, V, S> MapMutation<K, V, S> {
    pub(crate) fn from_map(root: NodeRef<K, V>, count: usize, hasher: S) -> Self {
        Self {
            root,
            count,
            mutid: next_mutid(),
            hasher,
        }
    }

    /// Returns the number of bindings in the draft.
    #[must_use]
    pub fn len(&self) -> usize {
        self.count
    }

    /// Returns `true` if the draft holds no bindings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub(crate) fn root(&self) -> &NodeRef<K, V> {
        &self.root
    }

    fn ensure_live(&self) -> Result<(), MapError<K>> {
        if self.mutid == 0 {
            Err(MapError::MutationFinished)
        } else {
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Read operations — valid on live and finished drafts alike
// ---------------------------------------------------------------------------

impl<K, V, S> MapMutation<K, V, S>
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

    /// Returns `true` if the draft contains `key`.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }
}

// ---------------------------------------------------------------------------
// Mutating operations — fail once the draft is finished
// ---------------------------------------------------------------------------

impl<K, V, S> MapMutation<K, V, S>
where
    K: Hash + Eq + Clone,
    V: Clone,
    S: BuildHasher,
{
    /// Binds `key` to `value`.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::MutationFinished`] after [`finish`](Self::finish).
    pub fn set(&mut self, key: K, value: V) -> Result<(), MapError<K>> {
        self.ensure_live()?;
        let hash = hash_of(&self.hasher, &key);
        let mut added = false;
        assoc(&mut self.root, 0, hash, key, value, &mut added, self.mutid);
        if added {
            self.count += 1;
        }
        Ok(())
    }

    /// Removes the binding for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::KeyMissing`] if the key is absent, or
    /// [`MapError::MutationFinished`] after [`finish`](Self::finish).
    pub fn remove(&mut self, key: &K) -> Result<(), MapError<K>> {
        self.ensure_live()?;
        let hash = hash_of(&self.hasher, key);
        match without(&mut self.root, 0, hash, key, self.mutid) {
            Removed::NotFound => Err(MapError::KeyMissing(key.clone())),
            Removed::Empty => {
                self.root = empty_bitmap(self.mutid);
                self.count = 0;
                Ok(())
            }
            Removed::Changed => {
                self.count -= 1;
                Ok(())
            }
        }
    }

    /// Removes the binding for `key` and returns its value.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::KeyMissing`] if the key is absent, or
    /// [`MapError::MutationFinished`] after [`finish`](Self::finish).
    pub fn pop(&mut self, key: &K) -> Result<V, MapError<K>> {
        self.ensure_live()?;
        let value = self
            .get(key)
            .cloned()
            .ok_or_else(|| MapError::KeyMissing(key.clone()))?;
        self.remove(key)?;
        Ok(value)
    }

    /// Removes the binding for `key` and returns its value, or returns
    /// `default` if the key is absent.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::MutationFinished`] after [`finish`](Self::finish).
    pub fn pop_or(&mut self, key: &K, default: V) -> Result<V, MapError<K>> {
        self.ensure_live()?;
        match self.pop(key) {
            Err(MapError::KeyMissing(_)) => Ok(default),
            other => other,
        }
    }

    /// Binds every pair of `iterable`, later pairs winning.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::MutationFinished`] after [`finish`](Self::finish).
    pub fn update<I>(&mut self, iterable: I) -> Result<(), MapError<K>>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        self.ensure_live()?;
        bulk_insert(
            &mut self.root,
            &mut self.count,
            &self.hasher,
            iterable,
            self.mutid,
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Finalisation
// ---------------------------------------------------------------------------

impl<K, V, S> MapMutation<K, V, S>
where
    S: Clone,
{
    /// Freezes the draft into a persistent map.
    ///
    /// Zeroes the draft's token, so any later mutation fails with
    /// [`MapError::MutationFinished`].  Calling `finish` again returns
    /// another map over the same tree.
    pub fn finish(&mut self) -> HamtMap<K, V, S> {
        self.mutid = 0;
        HamtMap::from_parts(self.root.clone(), self.count, self.hasher.clone())
    }
}

// ---------------------------------------------------------------------------
// Trait impls — drafts compare by content and are not hashable
// ---------------------------------------------------------------------------

impl<K, V, S> PartialEq for MapMutation<K, V, S>
where
    K: Hash + Eq,
    V: PartialEq,
    S: BuildHasher,
{
    fn eq(&self, other: &Self) -> bool {
        if self.count != other.count {
            return false;
        }
        Iter::new(&self.root, self.count).all(|(k, v)| other.get(k) == Some(v))
    }
}

impl<K, V, S> fmt::Debug for MapMutation<K, V, S>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(Iter::new(&self.root, self.count))
            .finish()
    }
}
