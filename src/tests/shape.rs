//! Structural tests: promotion, demotion, and node-shape invariants driven
//! by keys with fully controlled hashes.

use super::support::{DirectKey, DirectMap};
use crate::node::{Entry, Node};

fn filled(n: u64) -> DirectMap<u64> {
    let mut map = DirectMap::default();
    for i in 0..n {
        // hash32(DirectKey(i)) == i, so keys 0..n land in distinct
        // root windows as long as n <= 32
        map = map.insert(DirectKey(i), i);
    }
    map
}

#[test]
fn sixteen_root_entries_stay_a_bitmap() {
    let map = filled(16);
    match &**map.root() {
        Node::Bitmap(b) => {
            assert_eq!(b.entries.len(), 16);
            assert_eq!(b.bitmap.count_ones(), 16);
        }
        _ => panic!("expected a bitmap root"),
    }
}

#[test]
fn seventeenth_distinct_slot_promotes_root_to_array() {
    let map = filled(17);
    match &**map.root() {
        Node::Array(a) => {
            assert_eq!(a.count, 17);
            let occupied = a.slots.iter().flatten().count();
            assert_eq!(occupied, 17);
        }
        _ => panic!("expected an array root after the seventeenth entry"),
    }
    for i in 0..17 {
        assert_eq!(map.get(&DirectKey(i)), Some(&i));
    }
}

#[test]
fn array_children_are_single_leaf_bitmaps_after_promotion() {
    let map = filled(17);
    let Node::Array(a) = &**map.root() else {
        panic!("expected an array root");
    };
    for child in a.slots.iter().flatten() {
        match &**child {
            Node::Bitmap(b) => {
                assert_eq!(b.entries.len(), 1);
                assert!(matches!(b.entries[0], Entry::Leaf(_)));
            }
            _ => panic!("promotion should produce bitmap children"),
        }
    }
}

#[test]
fn dropping_to_fifteen_children_demotes_root_to_bitmap() {
    let map = filled(17);

    let map = map.remove(&DirectKey(0)).unwrap();
    match &**map.root() {
        Node::Array(a) => assert_eq!(a.count, 16),
        _ => panic!("sixteen children should still be an array node"),
    }

    let map = map.remove(&DirectKey(1)).unwrap();
    match &**map.root() {
        Node::Bitmap(b) => {
            assert_eq!(b.entries.len(), 15);
            // every surviving child was a single leaf, so all of them
            // were inlined during demotion
            assert!(b.entries.iter().all(|e| matches!(e, Entry::Leaf(_))));
        }
        _ => panic!("fifteen children should demote the root to a bitmap"),
    }

    for i in 2..17 {
        assert_eq!(map.get(&DirectKey(i)), Some(&i));
    }
    assert_eq!(map.len(), 15);
}

#[test]
fn same_window_different_hash_splits_into_subtree() {
    // both keys sit in root window 3; their hashes differ at the second
    // window, so the split creates a bitmap child one level down
    let k1 = DirectKey(3);
    let k2 = DirectKey(3 | (1 << 5));

    let map = DirectMap::default().insert(k1, 10).insert(k2, 20);

    let Node::Bitmap(root) = &**map.root() else {
        panic!("expected a bitmap root");
    };
    assert_eq!(root.entries.len(), 1);
    let Entry::Child(child) = &root.entries[0] else {
        panic!("clashing windows should push both bindings into a subtree");
    };
    let Node::Bitmap(sub) = &**child else {
        panic!("distinct hashes should split into a bitmap, not a collision");
    };
    assert_eq!(sub.entries.len(), 2);

    assert_eq!(map.get(&k1), Some(&10));
    assert_eq!(map.get(&k2), Some(&20));
}

#[test]
fn removing_from_split_subtree_inlines_survivor() {
    let k1 = DirectKey(3);
    let k2 = DirectKey(3 | (1 << 5));
    let map = DirectMap::default().insert(k1, 10).insert(k2, 20);

    let map = map.remove(&k1).unwrap();
    let Node::Bitmap(root) = &**map.root() else {
        panic!("expected a bitmap root");
    };
    // the one-leaf subtree must have been folded back into the root
    assert_eq!(root.entries.len(), 1);
    assert!(matches!(root.entries[0], Entry::Leaf(_)));
    assert_eq!(map.get(&k2), Some(&20));
}

#[test]
fn deep_chain_resolves_at_the_last_window() {
    // identical in windows 0..=4, different only at shift 25
    let base = 0b11111_11111_11111_11111_11111_u64;
    let k1 = DirectKey(base);
    let k2 = DirectKey(base | (1 << 25));

    let map = DirectMap::default().insert(k1, 1).insert(k2, 2);
    assert_eq!(map.get(&k1), Some(&1));
    assert_eq!(map.get(&k2), Some(&2));
    assert_eq!(map.len(), 2);

    let map = map.remove(&k1).unwrap();
    assert_eq!(map.get(&k1), None);
    assert_eq!(map.get(&k2), Some(&2));
}

#[test]
fn promotion_below_the_root() {
    // 17 keys sharing root window 7, spread across distinct second windows:
    // the child of root slot 7 must itself promote to an array node
    let mut map = DirectMap::default();
    for i in 0..17_u64 {
        map = map.insert(DirectKey(7 | (i << 5)), i);
    }
    assert_eq!(map.len(), 17);

    let Node::Bitmap(root) = &**map.root() else {
        panic!("expected a bitmap root");
    };
    assert_eq!(root.entries.len(), 1);
    let Entry::Child(child) = &root.entries[0] else {
        panic!("expected a subtree under root window 7");
    };
    match &**child {
        Node::Array(a) => assert_eq!(a.count, 17),
        _ => panic!("expected the second-level node to have promoted"),
    }

    for i in 0..17_u64 {
        assert_eq!(map.get(&DirectKey(7 | (i << 5))), Some(&i));
    }
}
