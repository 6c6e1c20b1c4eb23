//! Helpers shared by the unit tests of the tree operations

use crate::{
    alloc::{BumpArena, HeapPages},
    raw::RawTree,
    BigEndianRowId, LeafMode, RowId,
};

/// Tree keyed by the big-endian encoding of its row ids.
pub(crate) type TestTree = RawTree<BigEndianRowId, BumpArena<HeapPages>>;

/// Page size used by test arenas, small enough to exercise page turnover.
pub(crate) const TEST_PAGE_SIZE: usize = 16 * 1024;

pub(crate) fn empty_tree(key_len: usize, leaf_mode: LeafMode) -> TestTree {
    let arena = BumpArena::new(HeapPages::with_page_size(TEST_PAGE_SIZE))
        .expect("heap page allocation should succeed");
    RawTree::new(key_len, leaf_mode, BigEndianRowId, arena)
}

/// Encode `value` as a `key_len` byte key.
pub(crate) fn key(key_len: usize, value: u64) -> Vec<u8> {
    let mut key = vec![0; key_len];
    BigEndianRowId::encode(value, &mut key);
    key
}

/// Build a unique-key tree where every value is both the key and the row id.
pub(crate) fn tree_from_values(
    key_len: usize,
    values: impl IntoIterator<Item = RowId>,
) -> TestTree {
    let mut tree = empty_tree(key_len, LeafMode::Unique);
    for value in values {
        assert!(tree
            .try_insert(&key(key_len, value), value)
            .expect("heap page allocation should succeed"));
    }
    tree
}
