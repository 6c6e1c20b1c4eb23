use crate::{
    raw::{
        tests_common::{empty_tree, key, tree_from_values, TestTree},
        InnerNode, InnerNode4, LeafRef, NodeArena, NodeRef,
    },
    LeafMode,
};

fn row(value: u64) -> NodeRef {
    NodeRef::Leaf(LeafRef::Row(value))
}

fn assert_found(tree: &TestTree, key: &[u8], expected: u64) {
    assert_eq!(tree.search_optimistic(key), Some(LeafRef::Row(expected)));
    assert_eq!(tree.search_pessimistic(key), Some(LeafRef::Row(expected)));
}

fn assert_missing(tree: &TestTree, key: &[u8]) {
    assert_eq!(tree.search_optimistic(key), None);
    assert_eq!(tree.search_pessimistic(key), None);
}

#[test]
fn lookup_on_leaf() {
    let mut tree = empty_tree(3, LeafMode::Unique);
    tree.root = Some(row(0x01_02_03));

    assert_found(&tree, &[1, 2, 3], 0x01_02_03);
    assert_missing(&tree, &[0, 0, 0]);
    assert_missing(&tree, &[1, 2, 4]);
}

#[test]
fn lookup_on_full_node4() {
    let mut tree = empty_tree(3, LeafMode::Unique);

    let mut inner_node = InnerNode4::from_prefix(&[1, 2], 2);
    inner_node.write_child(1, row(0x01_02_01));
    inner_node.write_child(2, row(0x01_02_02));
    inner_node.write_child(3, row(0x01_02_03));
    inner_node.write_child(4, row(0x01_02_04));
    let handle = tree.arena.alloc_node(inner_node).unwrap();
    tree.root = Some(NodeRef::Inner(handle));

    for last in 1..=4u8 {
        assert_found(&tree, &[1, 2, last], 0x01_02_00 | u64::from(last));
    }
    assert_missing(&tree, &[1, 2, 5]);
    assert_missing(&tree, &[1, 3, 1]);
    assert_missing(&tree, &[0, 2, 1]);
}

#[test]
fn lookup_with_wrong_key_length() {
    let tree = tree_from_values(4, [1, 2, 3]);

    assert_missing(&tree, &[0, 0, 1]);
    assert_missing(&tree, &[0, 0, 0, 0, 1]);
    assert_missing(&tree, &[]);
}

#[test]
fn lookup_on_empty_tree() {
    let tree = tree_from_values(8, []);
    assert_missing(&tree, &key(8, 0));
}

#[test]
fn mismatch_hidden_in_long_prefix() {
    // Every key shares 15 leading zero bytes, more than fit inline.
    let tree = tree_from_values(16, [1, 2, 3]);
    let root = match tree.root {
        Some(NodeRef::Inner(handle)) => handle,
        other => panic!("expected an inner root, got {other:?}"),
    };
    assert_eq!(tree.arena.header(root).prefix_len(), 15);

    let mut probe = key(16, 2);
    probe[12] = 7;
    assert_missing(&tree, &probe);

    assert_found(&tree, &key(16, 2), 2);
}

#[test]
fn lookup_variants_agree() {
    let values: Vec<u64> = (0..2_000).map(|value| value * 7919 % 65_521).collect();
    let tree = tree_from_values(8, values.iter().copied());

    for value in 0..70_000u64 {
        let key = key(8, value);
        assert_eq!(
            tree.search_optimistic(&key),
            tree.search_pessimistic(&key),
            "lookup variants disagree on {value}"
        );
    }
    for value in values {
        assert_found(&tree, &key(8, value), value);
    }
}
