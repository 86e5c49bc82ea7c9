//! Property tests checked against a `HashMap` model.

use std::collections::HashMap;

use proptest::prelude::*;

use crate::HamtMap;

#[derive(Debug, Clone)]
enum Action {
    Insert(u16, i32),
    Remove(u16),
}

fn action() -> impl Strategy<Value = Action> {
    prop_oneof![
        (any::<u16>(), any::<i32>()).prop_map(|(k, v)| Action::Insert(k, v)),
        any::<u16>().prop_map(Action::Remove),
    ]
}

proptest! {
    #[test]
    fn behaves_like_hashmap(actions in prop::collection::vec(action(), 0..200)) {
        let mut model: HashMap<u16, i32> = HashMap::new();
        let mut map: HamtMap<u16, i32> = HamtMap::new();

        for a in actions {
            match a {
                Action::Insert(k, v) => {
                    model.insert(k, v);
                    map = map.insert(k, v);
                }
                Action::Remove(k) => {
                    let was_present = model.remove(&k).is_some();
                    match map.remove(&k) {
                        Ok(next) => {
                            prop_assert!(was_present);
                            map = next;
                        }
                        Err(_) => prop_assert!(!was_present),
                    }
                }
            }
            prop_assert_eq!(map.len(), model.len());
        }

        for (k, v) in &model {
            prop_assert_eq!(map.get(k), Some(v));
        }
        prop_assert_eq!(map.iter().count(), model.len());
    }

    #[test]
    fn insert_binds_and_preserves_others(
        pairs in prop::collection::vec((any::<u16>(), any::<i32>()), 0..50),
        key in any::<u16>(),
        value in any::<i32>(),
        probe in any::<u16>(),
    ) {
        let base: HamtMap<u16, i32> = pairs.iter().copied().collect();
        let updated = base.insert(key, value);

        prop_assert_eq!(updated.get(&key), Some(&value));
        if probe != key {
            prop_assert_eq!(updated.get(&probe), base.get(&probe));
        }
        let grew = usize::from(!base.contains_key(&key));
        prop_assert_eq!(updated.len(), base.len() + grew);
    }

    #[test]
    fn remove_undoes_a_fresh_insert(
        pairs in prop::collection::vec((any::<u16>(), any::<i32>()), 0..50),
        key in any::<u16>(),
        value in any::<i32>(),
    ) {
        let base: HamtMap<u16, i32> = pairs.iter().copied().collect();
        prop_assume!(!base.contains_key(&key));

        let roundtrip = base.insert(key, value).remove(&key).unwrap();
        prop_assert_eq!(&roundtrip, &base);
        prop_assert_eq!(roundtrip.content_hash(), base.content_hash());
    }

    #[test]
    fn last_insert_wins(
        key in any::<u16>(),
        v1 in any::<i32>(),
        v2 in any::<i32>(),
    ) {
        let twice = HamtMap::new().insert(key, v1).insert(key, v2);
        let once = HamtMap::new().insert(key, v2);
        prop_assert_eq!(twice, once);
    }

    #[test]
    fn equal_content_means_equal_hash(
        pairs in prop::collection::vec((any::<u16>(), any::<i32>()), 0..50),
    ) {
        let forward: HamtMap<u16, i32> = pairs.iter().copied().collect();
        let backward: HamtMap<u16, i32> = pairs.iter().rev().copied().collect();

        prop_assert_eq!(&forward, &backward);
        prop_assert_eq!(forward.content_hash(), backward.content_hash());
    }

    #[test]
    fn iteration_yields_len_distinct_keys(
        pairs in prop::collection::vec((any::<u16>(), any::<i32>()), 0..100),
    ) {
        let map: HamtMap<u16, i32> = pairs.iter().copied().collect();
        let keys: std::collections::HashSet<u16> = map.keys().copied().collect();
        prop_assert_eq!(keys.len(), map.len());
    }

    #[test]
    fn drafts_never_leak_into_the_source(
        base_pairs in prop::collection::vec((any::<u16>(), any::<i32>()), 0..50),
        edits in prop::collection::vec(action(), 0..50),
    ) {
        let source: HamtMap<u16, i32> = base_pairs.iter().copied().collect();
        let reference = source.clone();

        let mut draft = source.mutate();
        for e in edits {
            match e {
                Action::Insert(k, v) => draft.set(k, v).unwrap(),
                Action::Remove(k) => {
                    let _ = draft.remove(&k);
                }
            }
        }
        let _ = draft.finish();

        prop_assert_eq!(&source, &reference);
        prop_assert_eq!(source.len(), reference.len());
    }
}
