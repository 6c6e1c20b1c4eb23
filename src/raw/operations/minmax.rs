use crate::{
    alloc::NodeAllocator,
    raw::{Leaf, LeafRef, NodeRef, RawTree},
    KeyLoader,
};

impl<L: KeyLoader, A: NodeAllocator> RawTree<L, A> {
    /// Search for the leaf with the minimum key below `node`, by lexicographic
    /// ordering.
    #[inline]
    pub(crate) fn minimum_leaf(&self, node: NodeRef) -> LeafRef {
        let mut current_node = node;

        loop {
            current_node = match current_node {
                NodeRef::Inner(handle) => self.min_child(handle).1,
                NodeRef::Leaf(leaf) => return leaf,
            }
        }
    }

    /// Search for the leaf with the maximum key below `node`, by lexicographic
    /// ordering.
    #[inline]
    pub(crate) fn maximum_leaf(&self, node: NodeRef) -> LeafRef {
        let mut current_node = node;

        loop {
            current_node = match current_node {
                NodeRef::Inner(handle) => self.max_child(handle).1,
                NodeRef::Leaf(leaf) => return leaf,
            }
        }
    }

    /// The leaf holding the smallest key, or `None` for an empty tree.
    pub(crate) fn minimum(&self) -> Option<Leaf<'_>> {
        let root = self.root?;
        Some(self.leaves.view(self.minimum_leaf(root)))
    }

    /// The leaf holding the largest key, or `None` for an empty tree.
    pub(crate) fn maximum(&self) -> Option<Leaf<'_>> {
        let root = self.root?;
        Some(self.leaves.view(self.maximum_leaf(root)))
    }
}

#[cfg(test)]
mod tests {
    use crate::raw::tests_common::tree_from_values;

    #[test]
    fn empty_tree_has_no_min_max() {
        let tree = tree_from_values(8, []);
        assert_eq!(tree.minimum(), None);
        assert_eq!(tree.maximum(), None);
    }

    #[test]
    fn leaf_tree_min_max_same() {
        let tree = tree_from_values(8, [77]);
        let min_leaf = tree.minimum().unwrap();
        let max_leaf = tree.maximum().unwrap();

        assert_eq!(min_leaf, max_leaf);
        assert_eq!(min_leaf.first_row_id(), Some(77));
    }

    #[test]
    fn large_tree_same_length_keys_min_max() {
        let tree = tree_from_values(4, 1..=5000);

        assert_eq!(tree.minimum().unwrap().first_row_id(), Some(1));
        assert_eq!(tree.maximum().unwrap().first_row_id(), Some(5000));
    }

    #[test]
    fn skewed_tree_min_max() {
        let values = (0..64).map(|shift| 1u64 << shift);
        let tree = tree_from_values(8, values);

        assert_eq!(tree.minimum().unwrap().first_row_id(), Some(1));
        assert_eq!(tree.maximum().unwrap().first_row_id(), Some(1 << 63));
    }
}
