//! Delete — copy-on-write removal with canonical collapse rules.
//!
//! Three rules keep the trie canonical on the way out:
//!
//! - a bitmap child left with a single leaf is inlined into its parent
//! - an array node that drops below 16 children is demoted to a bitmap
//! - a collision node left with one pair collapses to a bitmap leaf
//!
//! Together they guarantee a parent never observes an empty child subtree.

use std::sync::Arc;

use crate::hash::{bitindex, bitpos, mask, BITS_PER_LEVEL};
use crate::node::{
    arc_mut, single_leaf_of, BitmapNode, CollisionNode, Entry, Leaf, Node, NodeRef,
    MAX_BITMAP_ENTRIES,
};

/// Outcome of a recursive removal.
pub(crate) enum Removed {
    /// The key is not in this subtree; nothing changed.
    NotFound,
    /// The key was found and this subtree is now empty; the caller decides
    /// what to do with the vacated position.  The slot is left untouched.
    Empty,
    /// The key was removed; the slot now holds the replacement subtree.
    Changed,
}

/// Removes `key` from the subtree rooted at `slot`.
///
/// Mirrors [`assoc`](super::assoc::assoc)'s ownership discipline: nodes
/// stamped with the live `mutid` are edited in place, all others are
/// replaced through `*slot` by stamped copies.
pub(crate) fn without<K, V>(
    slot: &mut NodeRef<K, V>,
    shift: u32,
    hash: i32,
    key: &K,
    mutid: u64,
) -> Removed
where
    K: Eq + Clone,
    V: Clone,
{
    match &**slot {
        Node::Bitmap(_) => bitmap_without(slot, shift, hash, key, mutid),
        Node::Array(_) => array_without(slot, shift, hash, key, mutid),
        Node::Collision(_) => collision_without(slot, shift, hash, key, mutid),
    }
}

enum BitmapCase {
    Recurse,
    Match,
    NoMatch,
}

fn bitmap_without<K, V>(
    slot: &mut NodeRef<K, V>,
    shift: u32,
    hash: i32,
    key: &K,
    mutid: u64,
) -> Removed
where
    K: Eq + Clone,
    V: Clone,
{
    let own = mutid != 0 && slot.mutid() == mutid;
    let bit = bitpos(hash, shift);

    let (idx, case, size) = {
        let Node::Bitmap(node) = &**slot else {
            unreachable!("dispatched on a bitmap node")
        };
        if node.bitmap & bit == 0 {
            return Removed::NotFound;
        }
        let idx = bitindex(node.bitmap, bit);
        let case = match &node.entries[idx] {
            Entry::Child(_) => BitmapCase::Recurse,
            Entry::Leaf(leaf) if leaf.key == *key => BitmapCase::Match,
            Entry::Leaf(_) => BitmapCase::NoMatch,
        };
        (idx, case, node.entries.len())
    };

    match case {
        BitmapCase::NoMatch => Removed::NotFound,
        BitmapCase::Match => {
            if size == 1 {
                return Removed::Empty;
            }
            let next = {
                let Node::Bitmap(node) = &**slot else {
                    unreachable!()
                };
                let mut next = node.to_owned_with(mutid);
                next.entries.remove(idx);
                next.bitmap &= !bit;
                next
            };
            *slot = Arc::new(Node::Bitmap(next));
            Removed::Changed
        }
        BitmapCase::Recurse => {
            if own {
                let Node::Bitmap(node) = arc_mut(slot) else {
                    unreachable!()
                };
                let Entry::Child(child) = &mut node.entries[idx] else {
                    unreachable!()
                };
                match without(child, shift + BITS_PER_LEVEL, hash, key, mutid) {
                    Removed::NotFound => Removed::NotFound,
                    Removed::Empty => {
                        unreachable!("collapse and inlining forbid empty child subtrees")
                    }
                    Removed::Changed => {
                        if let Some(leaf) = single_leaf_of(child) {
                            node.entries[idx] = Entry::Leaf(leaf);
                        }
                        Removed::Changed
                    }
                }
            } else {
                let mut child = {
                    let Node::Bitmap(node) = &**slot else {
                        unreachable!()
                    };
                    let Entry::Child(child) = &node.entries[idx] else {
                        unreachable!()
                    };
                    Arc::clone(child)
                };
                match without(&mut child, shift + BITS_PER_LEVEL, hash, key, mutid) {
                    Removed::NotFound => Removed::NotFound,
                    Removed::Empty => {
                        unreachable!("collapse and inlining forbid empty child subtrees")
                    }
                    Removed::Changed => {
                        let next = {
                            let Node::Bitmap(node) = &**slot else {
                                unreachable!()
                            };
                            let mut next = node.to_owned_with(mutid);
                            next.entries[idx] = match single_leaf_of(&child) {
                                Some(leaf) => Entry::Leaf(leaf),
                                None => Entry::Child(child),
                            };
                            next
                        };
                        *slot = Arc::new(Node::Bitmap(next));
                        Removed::Changed
                    }
                }
            }
        }
    }
}

fn array_without<K, V>(
    slot: &mut NodeRef<K, V>,
    shift: u32,
    hash: i32,
    key: &K,
    mutid: u64,
) -> Removed
where
    K: Eq + Clone,
    V: Clone,
{
    let own = mutid != 0 && slot.mutid() == mutid;
    let idx = mask(hash, shift) as usize;

    {
        let Node::Array(node) = &**slot else {
            unreachable!("dispatched on an array node")
        };
        if node.slots[idx].is_none() {
            return Removed::NotFound;
        }
    }

    if own {
        let demoted = {
            let Node::Array(node) = arc_mut(slot) else {
                unreachable!()
            };
            let child = node.slots[idx].as_mut().expect("slot occupancy checked above");
            match without(child, shift + BITS_PER_LEVEL, hash, key, mutid) {
                Removed::NotFound => return Removed::NotFound,
                Removed::Changed => return Removed::Changed,
                Removed::Empty => {
                    let remaining = node.count - 1;
                    if remaining == 0 {
                        return Removed::Empty;
                    }
                    if usize::from(remaining) >= MAX_BITMAP_ENTRIES {
                        node.slots[idx] = None;
                        node.count = remaining;
                        return Removed::Changed;
                    }
                    demote(&node.slots, idx, mutid)
                }
            }
        };
        *slot = Arc::new(Node::Bitmap(demoted));
        Removed::Changed
    } else {
        let mut child = {
            let Node::Array(node) = &**slot else {
                unreachable!()
            };
            Arc::clone(node.slots[idx].as_ref().expect("slot occupancy checked above"))
        };
        match without(&mut child, shift + BITS_PER_LEVEL, hash, key, mutid) {
            Removed::NotFound => Removed::NotFound,
            Removed::Changed => {
                let next = {
                    let Node::Array(node) = &**slot else {
                        unreachable!()
                    };
                    let mut next = node.to_owned_with(mutid);
                    next.slots[idx] = Some(child);
                    next
                };
                *slot = Arc::new(Node::Array(next));
                Removed::Changed
            }
            Removed::Empty => {
                let replacement = {
                    let Node::Array(node) = &**slot else {
                        unreachable!()
                    };
                    let remaining = node.count - 1;
                    if remaining == 0 {
                        return Removed::Empty;
                    }
                    if usize::from(remaining) >= MAX_BITMAP_ENTRIES {
                        let mut next = node.to_owned_with(mutid);
                        next.slots[idx] = None;
                        next.count = remaining;
                        Arc::new(Node::Array(next))
                    } else {
                        Arc::new(Node::Bitmap(demote(&node.slots, idx, mutid)))
                    }
                };
                *slot = replacement;
                Removed::Changed
            }
        }
    }
}

/// Rebuilds an array node's surviving children as a bitmap node, skipping
/// the vacated slot.  Single-leaf bitmap children are inlined as leaves,
/// mirroring the rule that forbids them as bitmap children.
fn demote<K, V>(
    slots: &[Option<NodeRef<K, V>>],
    skip: usize,
    mutid: u64,
) -> BitmapNode<K, V>
where
    K: Clone,
    V: Clone,
{
    let mut bitmap = 0u32;
    let mut entries = Vec::new();
    for (i, slot) in slots.iter().enumerate() {
        if i == skip {
            continue;
        }
        let Some(child) = slot else {
            continue;
        };
        bitmap |= 1 << i;
        entries.push(match single_leaf_of(child) {
            Some(leaf) => Entry::Leaf(leaf),
            None => Entry::Child(Arc::clone(child)),
        });
    }
    BitmapNode {
        mutid,
        bitmap,
        entries,
    }
}

fn collision_without<K, V>(
    slot: &mut NodeRef<K, V>,
    shift: u32,
    hash: i32,
    key: &K,
    mutid: u64,
) -> Removed
where
    K: Eq + Clone,
    V: Clone,
{
    let (pos, len, node_hash) = {
        let Node::Collision(node) = &**slot else {
            unreachable!("dispatched on a collision node")
        };
        if hash != node.hash {
            return Removed::NotFound;
        }
        let Some(pos) = node.pairs.iter().position(|(k, _)| k == key) else {
            return Removed::NotFound;
        };
        (pos, node.pairs.len(), node.hash)
    };

    match len - 1 {
        0 => Removed::Empty,
        1 => {
            // One pair survives: collision nodes may not hold a single
            // binding, so collapse to a bitmap leaf at this level.
            let next = {
                let Node::Collision(node) = &**slot else {
                    unreachable!()
                };
                let (k, v) = node.pairs[1 - pos].clone();
                BitmapNode {
                    mutid,
                    bitmap: bitpos(node_hash, shift),
                    entries: vec![Entry::Leaf(Leaf {
                        hash: node_hash,
                        key: k,
                        value: v,
                    })],
                }
            };
            *slot = Arc::new(Node::Bitmap(next));
            Removed::Changed
        }
        _ => {
            let next = {
                let Node::Collision(node) = &**slot else {
                    unreachable!()
                };
                let mut pairs = node.pairs.clone();
                pairs.remove(pos);
                CollisionNode {
                    mutid,
                    hash: node_hash,
                    pairs,
                }
            };
            *slot = Arc::new(Node::Collision(next));
            Removed::Changed
        }
    }
}
