//! Order-independent equality and content hashing.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::HamtMap;

fn std_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

#[test]
fn insertion_order_does_not_matter() {
    let m1 = HamtMap::new().insert("x", 1).insert("y", 2);
    let m2 = HamtMap::new().insert("y", 2).insert("x", 1);
    assert_eq!(m1, m2);
    assert_eq!(std_hash(&m1), std_hash(&m2));
    assert_eq!(m1.content_hash(), m2.content_hash());
}

#[test]
fn equal_larger_maps_hash_equal() {
    let forward: HamtMap<u32, u32> = (0..200).map(|i| (i, i * 7)).collect();
    let backward: HamtMap<u32, u32> = (0..200).rev().map(|i| (i, i * 7)).collect();
    assert_eq!(forward, backward);
    assert_eq!(forward.content_hash(), backward.content_hash());
}

#[test]
fn different_value_breaks_equality() {
    let m1 = HamtMap::new().insert("x", 1).insert("y", 2);
    let m2 = HamtMap::new().insert("x", 1).insert("y", 3);
    assert_ne!(m1, m2);
}

#[test]
fn different_key_breaks_equality() {
    let m1 = HamtMap::new().insert("x", 1);
    let m2 = HamtMap::new().insert("z", 1);
    assert_ne!(m1, m2);
}

#[test]
fn subset_is_not_equal() {
    let m1 = HamtMap::new().insert("x", 1);
    let m2 = m1.insert("y", 2);
    assert_ne!(m1, m2);
    assert_ne!(m2, m1);
}

#[test]
fn empty_maps_are_equal() {
    let m1: HamtMap<&str, i32> = HamtMap::new();
    let m2: HamtMap<&str, i32> = HamtMap::new();
    assert_eq!(m1, m2);
    assert_eq!(m1.content_hash(), m2.content_hash());
}

#[test]
fn content_hash_is_memoised() {
    let map = HamtMap::new().insert("a", 1).insert("b", 2);
    assert_eq!(map.content_hash(), map.content_hash());
}

#[test]
fn replaced_value_changes_content_hash() {
    let m1 = HamtMap::new().insert("k", 1);
    let m2 = m1.insert("k", 2);
    assert_ne!(m1.content_hash(), m2.content_hash());
}

#[test]
fn map_usable_as_a_key() {
    let inner1 = HamtMap::new().insert("a", 1);
    let inner2 = HamtMap::new().insert("a", 1);
    let outer = HamtMap::new().insert(inner1, "payload");
    assert_eq!(outer.get(&inner2), Some(&"payload"));
}
