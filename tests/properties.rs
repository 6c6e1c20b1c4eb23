mod common;

use art_index::{alloc::PoolArena, ArtConfig, ArtIndex, BigEndianRowId, LeafRef};
use common::key;
use proptest::prelude::*;
use std::collections::BTreeSet;

/// Values drawn from a narrow range so that keys share long prefixes, mixed
/// with values spread over the whole key space.
fn value_strategy() -> impl Strategy<Value = u64> {
    prop_oneof![
        0u64..4_096,
        (0u64..64).prop_map(|value| value << 40),
        any::<u64>(),
    ]
}

fn build(key_len: usize, values: &[u64]) -> ArtIndex<BigEndianRowId, PoolArena> {
    let mut index =
        ArtIndex::new(ArtConfig::new(key_len), BigEndianRowId, PoolArena::new()).unwrap();
    for &value in values {
        index.insert(&key(key_len, value), value);
    }
    index
}

fn lookup_all(
    index: &ArtIndex<BigEndianRowId, PoolArena>,
    probes: &[u64],
) -> Vec<Option<LeafRef>> {
    probes
        .iter()
        .map(|value| {
            index
                .lookup(&key(index.config().key_len, *value))
                .map(|leaf| leaf.reference())
        })
        .collect()
}

#[derive(Debug, Clone)]
enum Op {
    Insert(u64),
    Remove(u64),
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(
        prop_oneof![
            3 => value_strategy().prop_map(Op::Insert),
            1 => value_strategy().prop_map(Op::Remove),
        ],
        0..400,
    )
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    #[test]
    fn insertion_order_does_not_matter(
        values in prop::collection::vec(value_strategy(), 0..300).prop_shuffle(),
        probes in prop::collection::vec(value_strategy(), 0..50),
    ) {
        let mut sorted = values.clone();
        sorted.sort_unstable();
        let shuffled = build(8, &values);
        let ordered = build(8, &sorted);

        let probes: Vec<u64> = probes.into_iter().chain(values.iter().copied()).collect();
        prop_assert_eq!(lookup_all(&shuffled, &probes), lookup_all(&ordered, &probes));
        prop_assert_eq!(shuffled.num_keys(), ordered.num_keys());
    }

    #[test]
    fn lookup_variants_agree(
        values in prop::collection::vec(value_strategy(), 0..300),
        probes in prop::collection::vec(value_strategy(), 0..100),
        key_len in prop_oneof![Just(4usize), Just(8), Just(16), Just(24)],
    ) {
        let index = build(key_len, &values);

        for value in probes.iter().chain(&values) {
            let key = key(key_len, *value);
            prop_assert_eq!(
                index.lookup(&key).map(|leaf| leaf.reference()),
                index.lookup_pessimistic(&key).map(|leaf| leaf.reference())
            );
        }
    }

    #[test]
    fn reorganized_index_is_equivalent(
        values in prop::collection::vec(value_strategy(), 1..300),
        probes in prop::collection::vec(value_strategy(), 0..50),
    ) {
        let index = build(16, &values);
        let reorganized = index.reorganize(PoolArena::new()).unwrap();

        let probes: Vec<u64> = probes.into_iter().chain(values.iter().copied()).collect();
        prop_assert_eq!(lookup_all(&reorganized, &probes), lookup_all(&index, &probes));
        prop_assert_eq!(reorganized.stats(), index.stats());
        prop_assert_eq!(reorganized.check_well_formed(), Ok(index.num_keys()));
    }

    #[test]
    fn matches_a_set_model(
        ops in ops_strategy(),
        key_len in prop_oneof![Just(8usize), Just(16), Just(24)],
    ) {
        let mut index = build(key_len, &[]);
        let mut model = BTreeSet::new();

        for op in ops {
            match op {
                Op::Insert(value) => {
                    let key = key(key_len, value);
                    prop_assert_eq!(index.insert(&key, value), model.insert(value));
                },
                Op::Remove(value) => {
                    let key = key(key_len, value);
                    prop_assert_eq!(index.remove(&key, value), model.remove(&value));
                },
            }
        }

        prop_assert_eq!(index.check_well_formed(), Ok(model.len()));
        prop_assert_eq!(
            index.minimum().and_then(|leaf| leaf.first_row_id()),
            model.first().copied()
        );
        prop_assert_eq!(
            index.maximum().and_then(|leaf| leaf.first_row_id()),
            model.last().copied()
        );
        for value in &model {
            prop_assert!(index.contains(&key(key_len, *value), *value));
        }
    }
}
