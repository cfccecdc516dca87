//! Property tests pitting the trie against straightforward models.

use std::collections::BTreeMap;

use proptest::prelude::*;

use crate::trie::Trie;

fn keys() -> impl Strategy<Value = Vec<Vec<u8>>> {
    prop::collection::vec(prop::collection::vec(any::<u8>(), 1..12), 1..32)
}

fn build(entries: &[Vec<u8>]) -> (Trie<u64>, BTreeMap<Vec<u8>, u64>) {
    let mut trie = Trie::new();
    let mut model = BTreeMap::new();
    for (position, key) in entries.iter().enumerate() {
        let value = position as u64;
        trie.put(key, value).unwrap();
        model.insert(key.clone(), value);
    }
    (trie, model)
}

fn walk_map(trie: &Trie<u64>) -> BTreeMap<Vec<u8>, u64> {
    let mut out = BTreeMap::new();
    trie.walk(|key, value| {
        out.insert(key.to_vec(), *value);
    });
    out
}

proptest! {
    #[test]
    fn prop_get_matches_model(
        entries in keys(),
        probe in prop::collection::vec(any::<u8>(), 1..12),
    ) {
        let (trie, model) = build(&entries);
        for (key, value) in &model {
            prop_assert_eq!(trie.get(key), Some(*value));
            prop_assert!(trie.has(key));
        }
        prop_assert_eq!(trie.get(&probe), model.get(&probe).copied());
    }

    #[test]
    fn prop_walk_matches_model(entries in keys()) {
        let (trie, model) = build(&entries);
        prop_assert_eq!(walk_map(&trie), model);
    }

    #[test]
    fn prop_recursive_roundtrip(entries in keys()) {
        let (trie, model) = build(&entries);
        let mut buf = Vec::new();
        trie.encode(&mut buf).unwrap();

        let decoded: Trie<u64> = Trie::decode(&mut buf.as_slice()).unwrap();
        prop_assert_eq!(walk_map(&decoded), model.clone());

        let concurrent: Trie<u64> = Trie::decode_concurrent(&mut buf.as_slice()).unwrap();
        prop_assert_eq!(walk_map(&concurrent), model);
    }

    #[test]
    fn prop_flat_roundtrip(entries in keys()) {
        let (trie, model) = build(&entries);
        let mut buf = Vec::new();
        trie.write(&mut buf).unwrap();

        let loaded: Trie<u64> = Trie::read(&mut buf.as_slice()).unwrap();
        prop_assert_eq!(walk_map(&loaded), model.clone());
        // Point lookups run straight off the flat buffer.
        for key in model.keys() {
            prop_assert!(loaded.has(key));
        }
    }

    #[test]
    fn prop_match_all_matches_brute_force(
        entries in keys(),
        input in prop::collection::vec(any::<u8>(), 0..48),
    ) {
        let (trie, model) = build(&entries);

        let mut expect = Vec::new();
        for start in 0..input.len() {
            for key in model.keys() {
                if input[start..].starts_with(key) {
                    expect.push(key.clone());
                }
            }
        }
        expect.sort();

        let mut actual = Vec::new();
        trie.match_all(&input, |key, _| {
            actual.push(key.to_vec());
            true
        });
        actual.sort();

        prop_assert_eq!(actual, expect);
    }
}
