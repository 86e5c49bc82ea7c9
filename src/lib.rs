//! Persistent hash map based on a Hash Array Mapped Trie (HAMT).
//!
//! [`HamtMap`] is an immutable associative container: `insert` and `remove`
//! return a *new* map and leave the receiver untouched, in O(log N) time and
//! space thanks to structural sharing between versions.
//!
//! # Key properties
//!
//! - **O(1) copy**: cloning a map copies a root pointer and a counter
//! - **Structural sharing**: updated maps share all unchanged subtrees
//! - **Batched mutation**: [`HamtMap::mutate`] opens a [`MapMutation`] draft
//!   that edits nodes in place while they are exclusively owned, then
//!   freezes into a new persistent map
//! - **Zero `unsafe`**: enforced by `#![forbid(unsafe_code)]`
//!
//! # Example
//!
//! ```
//! use hamt_map::HamtMap;
//!
//! let one = HamtMap::new().insert("a", 1);
//! let two = one.insert("b", 2);
//!
//! assert_eq!(one.len(), 1);
//! assert_eq!(two.len(), 2);
//! assert_eq!(two.get(&"a"), Some(&1));
//! ```
//!
//! # References
//!
//! - Bagwell, 2001 — "Ideal Hash Trees"
//! - Clojure's `PersistentHashMap`, which introduced the collision-node
//!   treatment used here

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![allow(clippy::module_name_repetitions)]

mod error;
mod hash;
mod iter;
mod map;
mod mutate;
mod node;
mod ops;

#[cfg(feature = "serde")]
mod serde;

#[cfg(test)]
mod proptests;
#[cfg(test)]
mod tests;

pub use error::MapError;
pub use iter::{Iter, Keys, Values};
pub use map::HamtMap;
pub use mutate::MapMutation;
