#![no_main]

use std::time::Duration;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use vulnlens_engine::CacheStore;

#[derive(Arbitrary, Debug)]
enum Op {
    Add(Vec<(u8, u16)>),
    Get(Vec<u8>),
}

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    max_items: u8,
    ops: Vec<Op>,
}

fuzz_target!(|input: FuzzInput| {
    let mut store: CacheStore<u8, u16> =
        CacheStore::new(usize::from(input.max_items), Duration::from_secs(3600));

    for op in input.ops.iter().take(256) {
        match op {
            Op::Add(records) => {
                let mut last = std::collections::HashMap::new();
                for (k, v) in records {
                    last.insert(*k, *v);
                }
                store.add(records.iter().copied());

                // 용량은 항상 지켜진다
                assert!(store.len() <= store.capacity());

                // 마지막 삽입 키는 살아남은 경우 마지막 값을 가진다
                let keys: Vec<u8> = last.keys().copied().collect();
                for lookup in store.get(&keys) {
                    if let Some(value) = lookup.value {
                        assert_eq!(Some(&value), last.get(&lookup.key));
                    }
                }
            }
            Op::Get(keys) => {
                let lookups = store.get(keys);
                assert_eq!(lookups.len(), keys.len());
                for (lookup, key) in lookups.iter().zip(keys) {
                    assert_eq!(lookup.key, *key);
                }
            }
        }
    }
});
