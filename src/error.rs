//! Error type shared by map and mutation operations.

use std::error::Error;
use std::fmt;

/// Errors reported by [`HamtMap`](crate::HamtMap) and
/// [`MapMutation`](crate::MapMutation) operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapError<K> {
    /// The requested key is not present in the map.
    KeyMissing(K),
    /// The mutation was already finished; it no longer accepts edits.
    MutationFinished,
}

impl<K: fmt::Debug> fmt::Display for MapError<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeyMissing(key) => write!(f, "key missing: {key:?}"),
            Self::MutationFinished => f.write_str("mutation has been finished"),
        }
    }
}

impl<K: fmt::Debug> Error for MapError<K> {}
