//! Lookup — walks the trie one five-bit window per level.

use crate::hash::{bitindex, bitpos, mask, BITS_PER_LEVEL};
use crate::node::{Entry, Node};

/// Searches for `key` in the subtree rooted at `node`.
///
/// Returns a reference to the bound value if found.
pub(crate) fn find<'a, K, V>(
    mut node: &'a Node<K, V>,
    mut shift: u32,
    hash: i32,
    key: &K,
) -> Option<&'a V>
where
    K: Eq,
{
    loop {
        match node {
            Node::Bitmap(b) => {
                let bit = bitpos(hash, shift);
                if b.bitmap & bit == 0 {
                    return None;
                }
                match &b.entries[bitindex(b.bitmap, bit)] {
                    Entry::Leaf(leaf) => {
                        return (leaf.hash == hash && leaf.key == *key).then_some(&leaf.value);
                    }
                    Entry::Child(child) => {
                        node = child;
                        shift += BITS_PER_LEVEL;
                    }
                }
            }
            Node::Array(a) => match &a.slots[mask(hash, shift) as usize] {
                Some(child) => {
                    node = child;
                    shift += BITS_PER_LEVEL;
                }
                None => return None,
            },
            Node::Collision(c) => {
                if hash != c.hash {
                    return None;
                }
                return c.pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v);
            }
        }
    }
}
