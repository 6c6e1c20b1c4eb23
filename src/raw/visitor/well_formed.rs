use crate::{
    alloc::NodeAllocator,
    raw::{
        visitor::{LeafContext, NodeContext, Visitor},
        InnerNode, InnerNode16, InnerNode256, InnerNode4, InnerNode48, Leaf, LeafRef, NodeHandle,
        NodeKind, RawTree,
    },
    KeyLoader,
};

/// An issue with the well-formed-ness of the tree. See the documentation on
/// [`WellFormedChecker`] for more context.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedTreeError {
    /// An inner node had an incorrect number of children
    #[error(
        "inner node {handle:?} at depth [{depth}] has [{num_children}] children, outside the \
         capacity range of {kind:?}"
    )]
    WrongChildrenCount {
        /// The inner node
        handle: NodeHandle,
        /// The kind recorded in the node's handle
        kind: NodeKind,
        /// Number of key bytes consumed above the node
        depth: usize,
        /// The number of children found at the inner node
        num_children: usize,
    },
    /// The child count stored in a header disagrees with the children present
    #[error("inner node {handle:?} records [{recorded}] children but holds [{found}]")]
    ChildCountMismatch {
        /// The inner node
        handle: NodeHandle,
        /// The count stored in the header
        recorded: usize,
        /// The number of children found
        found: usize,
    },
    /// The kind stamped into a node header differs from the kind of its handle
    #[error("inner node {handle:?} carries a header of kind {header_kind:?}")]
    KindMismatch {
        /// The inner node
        handle: NodeHandle,
        /// The kind stored in the header
        header_kind: NodeKind,
    },
    /// The children of an inner node are not in ascending key byte order
    #[error("children of inner node {handle:?} are out of order: {key_bytes:?}")]
    UnsortedChildren {
        /// The inner node
        handle: NodeHandle,
        /// The key bytes in iteration order
        key_bytes: Vec<u8>,
    },
    /// An inner node whose prefix reaches the end of the key, leaving no key
    /// byte to select a child
    #[error(
        "inner node {handle:?} at depth [{depth}] with prefix length [{prefix_len}] covers the \
         whole key of length [{key_len}]"
    )]
    NodeCoversKey {
        /// The inner node
        handle: NodeHandle,
        /// Number of key bytes consumed above the node
        depth: usize,
        /// Length of the node prefix
        prefix_len: usize,
        /// Length of every key in the tree
        key_len: usize,
    },
    /// The key bytes implied by the path to a leaf do not match the leaf key
    #[error("leaf {leaf:?} has key {key:?}, which does not start with the path {path:?}")]
    PrefixMismatch {
        /// The leaf
        leaf: LeafRef,
        /// The entire key of the leaf
        key: Vec<u8>,
        /// The key bytes implied by the path to the leaf
        path: Vec<u8>,
    },
    /// A leaf without any row id is still reachable
    #[error("leaf {leaf:?} holds no row ids")]
    EmptyLeaf {
        /// The leaf
        leaf: LeafRef,
    },
    /// The number of keys recorded by the tree does not match the number of
    /// leaves
    #[error("tree records [{recorded}] keys but holds [{found}] leaves")]
    WrongKeyCount {
        /// The number of keys recorded by the tree
        recorded: usize,
        /// The number of leaves found
        found: usize,
    },
}

/// A visitor of the radix tree which checks that the tree is well-formed.
///
/// A tree is well-formed if:
///  - every inner node holds a number of children inside the capacity range of
///    its kind, and its header agrees with its handle and its children
///  - the children of every inner node are sorted by key byte
///  - no inner node consumes the whole key
///  - every leaf holds at least one row id, and its key starts with the key
///    bytes spelled out by the path from the root
///  - the number of leaves matches the number of keys recorded by the tree
///
/// This checker will only return a single issue at a time.
#[derive(Debug)]
pub struct WellFormedChecker {
    key_len: usize,
}

impl WellFormedChecker {
    /// Traverse the given tree and check that it is well-formed. Returns the
    /// number of leaves in the tree.
    ///
    /// # Errors
    ///
    /// Returns an error if the given tree is not well-formed.
    pub(crate) fn check<L: KeyLoader, A: NodeAllocator>(
        tree: &RawTree<L, A>,
    ) -> Result<usize, MalformedTreeError> {
        let mut checker = WellFormedChecker {
            key_len: tree.key_len,
        };

        let found = tree.visit(&mut checker)?;
        if found != tree.num_keys {
            return Err(MalformedTreeError::WrongKeyCount {
                recorded: tree.num_keys,
                found,
            });
        }

        Ok(found)
    }

    fn visit_inner_node<N: InnerNode>(
        &self,
        inner_node: &N,
        ctx: NodeContext,
    ) -> Result<usize, MalformedTreeError> {
        let NodeContext { handle, depth, .. } = ctx;
        let header = inner_node.header();

        if header.kind() != handle.kind || N::KIND != handle.kind {
            return Err(MalformedTreeError::KindMismatch {
                handle,
                header_kind: header.kind(),
            });
        }

        let key_bytes: Vec<u8> = inner_node.iter().map(|(key_byte, _)| key_byte).collect();
        if key_bytes.len() != header.num_children() {
            return Err(MalformedTreeError::ChildCountMismatch {
                handle,
                recorded: header.num_children(),
                found: key_bytes.len(),
            });
        }
        if !N::KIND.capacity_range().contains(&key_bytes.len()) {
            return Err(MalformedTreeError::WrongChildrenCount {
                handle,
                kind: N::KIND,
                depth,
                num_children: key_bytes.len(),
            });
        }
        if !key_bytes.windows(2).all(|pair| pair[0] < pair[1]) {
            return Err(MalformedTreeError::UnsortedChildren { handle, key_bytes });
        }
        if depth + header.prefix_len() >= self.key_len {
            return Err(MalformedTreeError::NodeCoversKey {
                handle,
                depth,
                prefix_len: header.prefix_len(),
                key_len: self.key_len,
            });
        }

        Ok(0)
    }
}

impl Visitor for WellFormedChecker {
    type Output = Result<usize, MalformedTreeError>;

    fn default_output(&self) -> Self::Output {
        // Chose zero so that any places that call `default_output` don't influence the
        // overall count
        Ok(0)
    }

    fn combine_output(&self, o1: Self::Output, o2: Self::Output) -> Self::Output {
        Ok(o1? + o2?)
    }

    fn visit_node4(&mut self, t: &InnerNode4, ctx: NodeContext) -> Self::Output {
        self.visit_inner_node(t, ctx)
    }

    fn visit_node16(&mut self, t: &InnerNode16, ctx: NodeContext) -> Self::Output {
        self.visit_inner_node(t, ctx)
    }

    fn visit_node48(&mut self, t: &InnerNode48, ctx: NodeContext) -> Self::Output {
        self.visit_inner_node(t, ctx)
    }

    fn visit_node256(&mut self, t: &InnerNode256, ctx: NodeContext) -> Self::Output {
        self.visit_inner_node(t, ctx)
    }

    fn visit_leaf(&mut self, t: Leaf<'_>, key: &[u8], ctx: LeafContext<'_>) -> Self::Output {
        if t.is_empty() {
            return Err(MalformedTreeError::EmptyLeaf {
                leaf: t.reference(),
            });
        }

        if !key.starts_with(ctx.path) {
            return Err(MalformedTreeError::PrefixMismatch {
                leaf: t.reference(),
                key: key.to_vec(),
                path: ctx.path.to_vec(),
            });
        }

        Ok(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        raw::{
            tests_common::{empty_tree, tree_from_values},
            NodeArena, NodeRef,
        },
        LeafMode,
    };

    #[test]
    fn check_well_formed_tree() {
        let values: Vec<u64> = (0..5_000).map(|value| value * 7_777 % 100_003).collect();
        let tree = tree_from_values(8, values.iter().copied());

        assert_eq!(WellFormedChecker::check(&tree), Ok(5_000));
    }

    #[test]
    fn check_well_formed_tree_long_prefix() {
        let tree = tree_from_values(32, [1, 2, 1 << 40, (1 << 40) + 1, 1 << 56]);

        assert_eq!(WellFormedChecker::check(&tree), Ok(5));
    }

    #[test]
    fn check_empty_tree() {
        let tree = empty_tree(8, LeafMode::Unique);
        assert_eq!(WellFormedChecker::check(&tree), Ok(0));

        let mut tree = empty_tree(8, LeafMode::Unique);
        tree.num_keys = 3;
        assert_eq!(
            WellFormedChecker::check(&tree),
            Err(MalformedTreeError::WrongKeyCount {
                recorded: 3,
                found: 0
            })
        );
    }

    #[test]
    fn check_tree_with_mismatched_key_prefix() {
        let mut tree = tree_from_values(4, [0x0102_0304, 0x0102_0305, 0x0102_0306]);
        let root = match tree.root {
            Some(NodeRef::Inner(handle)) => handle,
            other => panic!("expected an inner root, got {other:?}"),
        };
        tree.arena.header_mut(root).set_prefix(&[1, 9, 3], 3);

        let err = WellFormedChecker::check(&tree).unwrap_err();
        assert_eq!(
            err,
            MalformedTreeError::PrefixMismatch {
                leaf: LeafRef::Row(0x0102_0304),
                key: vec![1, 2, 3, 4],
                path: vec![1, 9, 3, 4],
            }
        );
    }

    #[test]
    fn check_tree_with_wrong_child_count() {
        let mut tree = tree_from_values(4, [0x0102_0304, 0x0102_0305]);
        let root = match tree.root {
            Some(NodeRef::Inner(handle)) => handle,
            other => panic!("expected an inner root, got {other:?}"),
        };
        tree.arena.node_mut::<InnerNode4>(root.addr).remove_child(5);

        let err = WellFormedChecker::check(&tree).unwrap_err();
        assert!(
            matches!(
                err,
                MalformedTreeError::WrongChildrenCount {
                    kind: NodeKind::Node4,
                    num_children: 1,
                    ..
                }
            ),
            "{err}"
        );
    }
}
