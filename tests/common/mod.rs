#![allow(dead_code)]

use art_index::{alloc::NodeAllocator, ArtConfig, ArtIndex, BigEndianRowId, KeyLoader, RowId};
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use std::collections::BTreeSet;

/// Seed shared by the tests so that failures reproduce.
pub const SEED: u64 = 0x5EED_A27;

pub fn rng() -> StdRng {
    StdRng::seed_from_u64(SEED)
}

/// The big-endian key of `value`, `key_len` bytes long.
pub fn key(key_len: usize, value: u64) -> Vec<u8> {
    let mut key = vec![0; key_len];
    BigEndianRowId::encode(value, &mut key);
    key
}

/// An index over 8-byte keys whose row ids are the key values.
pub fn index_from_values(values: impl IntoIterator<Item = RowId>) -> ArtIndex<BigEndianRowId> {
    let mut index = ArtIndex::with_heap(ArtConfig::new(8), BigEndianRowId).unwrap();
    for value in values {
        assert!(index.insert(&key(8, value), value), "{value} inserted twice");
    }
    index
}

/// `1..=n` in random order.
pub fn shuffled(n: u64) -> Vec<u64> {
    let mut values: Vec<u64> = (1..=n).collect();
    values.shuffle(&mut rng());
    values
}

/// `count` distinct random 32-bit values, and one more value absent from them.
pub fn sparse_u32(count: usize) -> (Vec<u64>, u64) {
    let mut rng = rng();
    let mut seen = BTreeSet::new();
    let mut values = Vec::with_capacity(count);
    while values.len() < count {
        let value = u64::from(rng.random::<u32>());
        if seen.insert(value) {
            values.push(value);
        }
    }

    let absent = loop {
        let value = u64::from(rng.random::<u32>());
        if !seen.contains(&value) {
            break value;
        }
    };

    (values, absent)
}

/// Assert that every value resolves to its own row id with both lookups.
pub fn assert_all_found<L: KeyLoader, A: NodeAllocator>(
    index: &ArtIndex<L, A>,
    values: impl IntoIterator<Item = u64>,
) {
    let key_len = index.config().key_len;
    for value in values {
        let key = key(key_len, value);
        let leaf = index.lookup(&key);
        assert!(
            leaf.is_some_and(|leaf| leaf.contains(value)),
            "{value} was not found"
        );
        assert_eq!(
            leaf.map(|leaf| leaf.reference()),
            index.lookup_pessimistic(&key).map(|leaf| leaf.reference())
        );
    }
}
