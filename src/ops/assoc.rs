//! Insert — copy-on-write assoc with token-gated in-place reuse.

use std::sync::Arc;

use crate::hash::{bitindex, bitpos, mask, BITS_PER_LEVEL};
use crate::node::{
    arc_mut, empty_bitmap, ArrayNode, BitmapNode, CollisionNode, Entry, Leaf, Node, NodeRef,
    ARRAY_NODE_SIZE, MAX_BITMAP_ENTRIES,
};

/// Binds `key` to `value` in the subtree rooted at `slot`.
///
/// `added` is set when the logical key count grew (insert rather than
/// replace).  A node stamped with the live `mutid` is edited in place;
/// every other node is replaced through `*slot` by a copy stamped with
/// `mutid`, leaving the original untouched.
pub(crate) fn assoc<K, V>(
    slot: &mut NodeRef<K, V>,
    shift: u32,
    hash: i32,
    key: K,
    value: V,
    added: &mut bool,
    mutid: u64,
) where
    K: Eq + Clone,
    V: Clone,
{
    match &**slot {
        Node::Bitmap(_) => bitmap_assoc(slot, shift, hash, key, value, added, mutid),
        Node::Array(_) => array_assoc(slot, shift, hash, key, value, added, mutid),
        Node::Collision(_) => collision_assoc(slot, shift, hash, key, value, added, mutid),
    }
}

/// What `bitmap_assoc` found at the selected slot.
enum BitmapCase {
    /// Bit clear, room for one more entry.
    Vacant,
    /// Bit clear, node already at capacity: promote to an array node.
    Full,
    /// Slot holds a subtree pointer.
    Recurse,
    /// Slot holds a leaf with an equal key.
    Replace,
    /// Slot holds a leaf with a different key: push both down a level.
    Split,
}

fn bitmap_assoc<K, V>(
    slot: &mut NodeRef<K, V>,
    shift: u32,
    hash: i32,
    key: K,
    value: V,
    added: &mut bool,
    mutid: u64,
) where
    K: Eq + Clone,
    V: Clone,
{
    let own = mutid != 0 && slot.mutid() == mutid;
    let bit = bitpos(hash, shift);

    let (idx, case) = {
        let Node::Bitmap(node) = &**slot else {
            unreachable!("dispatched on a bitmap node")
        };
        let idx = bitindex(node.bitmap, bit);
        let case = if node.bitmap & bit == 0 {
            if node.entries.len() < MAX_BITMAP_ENTRIES {
                BitmapCase::Vacant
            } else {
                BitmapCase::Full
            }
        } else {
            match &node.entries[idx] {
                Entry::Child(_) => BitmapCase::Recurse,
                Entry::Leaf(leaf) if leaf.key == key => BitmapCase::Replace,
                Entry::Leaf(_) => BitmapCase::Split,
            }
        };
        (idx, case)
    };

    match case {
        BitmapCase::Vacant => {
            // Size changes always allocate a fresh node.
            *added = true;
            let next = {
                let Node::Bitmap(node) = &**slot else {
                    unreachable!()
                };
                let mut next = node.to_owned_with(mutid);
                next.bitmap |= bit;
                next.entries.insert(idx, Entry::Leaf(Leaf { hash, key, value }));
                next
            };
            *slot = Arc::new(Node::Bitmap(next));
        }
        BitmapCase::Full => {
            *added = true;
            let next = {
                let Node::Bitmap(node) = &**slot else {
                    unreachable!()
                };
                promote(node, shift, Leaf { hash, key, value }, mutid)
            };
            *slot = Arc::new(Node::Array(next));
        }
        BitmapCase::Recurse => {
            if own {
                let Node::Bitmap(node) = arc_mut(slot) else {
                    unreachable!()
                };
                let Entry::Child(child) = &mut node.entries[idx] else {
                    unreachable!()
                };
                assoc(child, shift + BITS_PER_LEVEL, hash, key, value, added, mutid);
            } else {
                let mut next = {
                    let Node::Bitmap(node) = &**slot else {
                        unreachable!()
                    };
                    node.to_owned_with(mutid)
                };
                let Entry::Child(child) = &mut next.entries[idx] else {
                    unreachable!()
                };
                assoc(child, shift + BITS_PER_LEVEL, hash, key, value, added, mutid);
                *slot = Arc::new(Node::Bitmap(next));
            }
        }
        BitmapCase::Replace => {
            if own {
                let Node::Bitmap(node) = arc_mut(slot) else {
                    unreachable!()
                };
                let Entry::Leaf(leaf) = &mut node.entries[idx] else {
                    unreachable!()
                };
                leaf.value = value;
            } else {
                let next = {
                    let Node::Bitmap(node) = &**slot else {
                        unreachable!()
                    };
                    let mut next = node.to_owned_with(mutid);
                    let Entry::Leaf(leaf) = &mut next.entries[idx] else {
                        unreachable!()
                    };
                    leaf.value = value;
                    next
                };
                *slot = Arc::new(Node::Bitmap(next));
            }
        }
        BitmapCase::Split => {
            *added = true;
            let (existing, stamp) = {
                let Node::Bitmap(node) = &**slot else {
                    unreachable!()
                };
                let Entry::Leaf(leaf) = &node.entries[idx] else {
                    unreachable!()
                };
                (leaf.clone(), node.mutid)
            };
            let sub = make_bitmap_or_collision(
                shift + BITS_PER_LEVEL,
                existing,
                hash,
                key,
                value,
                stamp,
            );
            if own {
                let Node::Bitmap(node) = arc_mut(slot) else {
                    unreachable!()
                };
                node.entries[idx] = Entry::Child(sub);
            } else {
                let next = {
                    let Node::Bitmap(node) = &**slot else {
                        unreachable!()
                    };
                    let mut next = node.to_owned_with(mutid);
                    next.entries[idx] = Entry::Child(sub);
                    next
                };
                *slot = Arc::new(Node::Bitmap(next));
            }
        }
    }
}

fn array_assoc<K, V>(
    slot: &mut NodeRef<K, V>,
    shift: u32,
    hash: i32,
    key: K,
    value: V,
    added: &mut bool,
    mutid: u64,
) where
    K: Eq + Clone,
    V: Clone,
{
    let own = mutid != 0 && slot.mutid() == mutid;
    let idx = mask(hash, shift) as usize;

    if own {
        let Node::Array(node) = arc_mut(slot) else {
            unreachable!("dispatched on an array node")
        };
        match &mut node.slots[idx] {
            Some(child) => {
                assoc(child, shift + BITS_PER_LEVEL, hash, key, value, added, mutid);
            }
            None => {
                *added = true;
                node.slots[idx] = Some(single_leaf(
                    Leaf { hash, key, value },
                    shift + BITS_PER_LEVEL,
                    mutid,
                ));
                node.count += 1;
            }
        }
    } else {
        let mut next = {
            let Node::Array(node) = &**slot else {
                unreachable!("dispatched on an array node")
            };
            node.to_owned_with(mutid)
        };
        match &mut next.slots[idx] {
            Some(child) => {
                assoc(child, shift + BITS_PER_LEVEL, hash, key, value, added, mutid);
            }
            None => {
                *added = true;
                next.slots[idx] = Some(single_leaf(
                    Leaf { hash, key, value },
                    shift + BITS_PER_LEVEL,
                    mutid,
                ));
                next.count += 1;
            }
        }
        *slot = Arc::new(Node::Array(next));
    }
}

fn collision_assoc<K, V>(
    slot: &mut NodeRef<K, V>,
    shift: u32,
    hash: i32,
    key: K,
    value: V,
    added: &mut bool,
    mutid: u64,
) where
    K: Eq + Clone,
    V: Clone,
{
    let own = mutid != 0 && slot.mutid() == mutid;
    let node_hash = {
        let Node::Collision(node) = &**slot else {
            unreachable!("dispatched on a collision node")
        };
        node.hash
    };

    if hash != node_hash {
        // The incoming hash differs from the hash every stored key shares.
        // Lift the collision node into a one-entry bitmap at this level and
        // retry the insert against that bitmap.
        let lifted = BitmapNode {
            mutid,
            bitmap: bitpos(node_hash, shift),
            entries: vec![Entry::Child(Arc::clone(slot))],
        };
        *slot = Arc::new(Node::Bitmap(lifted));
        bitmap_assoc(slot, shift, hash, key, value, added, mutid);
        return;
    }

    let pos = {
        let Node::Collision(node) = &**slot else {
            unreachable!()
        };
        node.pairs.iter().position(|(k, _)| *k == key)
    };

    match pos {
        None => {
            *added = true;
            let next = {
                let Node::Collision(node) = &**slot else {
                    unreachable!()
                };
                let mut pairs = Vec::with_capacity(node.pairs.len() + 1);
                pairs.extend(node.pairs.iter().cloned());
                pairs.push((key, value));
                CollisionNode {
                    mutid,
                    hash: node_hash,
                    pairs,
                }
            };
            *slot = Arc::new(Node::Collision(next));
        }
        Some(i) => {
            if own {
                let Node::Collision(node) = arc_mut(slot) else {
                    unreachable!()
                };
                node.pairs[i].1 = value;
            } else {
                let next = {
                    let Node::Collision(node) = &**slot else {
                        unreachable!()
                    };
                    let mut pairs = node.pairs.clone();
                    pairs[i].1 = value;
                    CollisionNode {
                        mutid,
                        hash: node_hash,
                        pairs,
                    }
                };
                *slot = Arc::new(Node::Collision(next));
            }
        }
    }
}

/// Builds a node holding two bindings that clashed at the parent level.
///
/// Equal hashes produce a collision node; otherwise both bindings are
/// assoc'd into an empty bitmap at `shift`.  The recursion terminates
/// because each level consumes five more bits and distinct 32-bit hashes
/// must differ in some window.
fn make_bitmap_or_collision<K, V>(
    shift: u32,
    existing: Leaf<K, V>,
    hash: i32,
    key: K,
    value: V,
    mutid: u64,
) -> NodeRef<K, V>
where
    K: Eq + Clone,
    V: Clone,
{
    if existing.hash == hash {
        return Arc::new(Node::Collision(CollisionNode {
            mutid,
            hash,
            pairs: vec![(existing.key, existing.value), (key, value)],
        }));
    }

    let mut node = empty_bitmap(mutid);
    let mut added = false;
    let existing_hash = existing.hash;
    assoc(
        &mut node,
        shift,
        existing_hash,
        existing.key,
        existing.value,
        &mut added,
        mutid,
    );
    assoc(&mut node, shift, hash, key, value, &mut added, mutid);
    node
}

/// Rebuilds a full bitmap node as an array node with `leaf` added.
///
/// Leaf entries become single-leaf bitmap children one level down;
/// subtree entries are moved across as-is.
fn promote<K, V>(node: &BitmapNode<K, V>, shift: u32, leaf: Leaf<K, V>, mutid: u64) -> ArrayNode<K, V>
where
    K: Clone,
    V: Clone,
{
    let count = node.entries.len() as u8 + 1;
    let mut slots: [Option<NodeRef<K, V>>; ARRAY_NODE_SIZE] = std::array::from_fn(|_| None);
    let incoming = mask(leaf.hash, shift) as usize;
    slots[incoming] = Some(single_leaf(leaf, shift + BITS_PER_LEVEL, mutid));

    let mut j = 0;
    for (i, slot) in slots.iter_mut().enumerate() {
        if node.bitmap & (1 << i) != 0 {
            *slot = Some(match &node.entries[j] {
                Entry::Leaf(l) => single_leaf(l.clone(), shift + BITS_PER_LEVEL, mutid),
                Entry::Child(child) => Arc::clone(child),
            });
            j += 1;
        }
    }

    ArrayNode {
        mutid,
        count,
        slots,
    }
}

/// A bitmap node holding exactly one binding, positioned for `shift`.
fn single_leaf<K, V>(leaf: Leaf<K, V>, shift: u32, mutid: u64) -> NodeRef<K, V> {
    Arc::new(Node::Bitmap(BitmapNode {
        mutid,
        bitmap: bitpos(leaf.hash, shift),
        entries: vec![Entry::Leaf(leaf)],
    }))
}
