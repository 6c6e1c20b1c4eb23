//! Utilities for inspecting the trie structure.

mod tree_stats;
mod well_formed;

use crate::{
    alloc::NodeAllocator,
    raw::{
        with_node, InnerNode, InnerNode16, InnerNode256, InnerNode4, InnerNode48, KeyBuf, Leaf,
        NodeArena, NodeHandle, NodeKind, NodeRef, RawTree, PREFIX_LEN,
    },
    KeyLoader, MAX_KEY_LEN,
};
pub use tree_stats::*;
pub use well_formed::*;

/// Where an inner node was found during a traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeContext {
    /// The node being visited.
    pub handle: NodeHandle,
    /// Number of inner nodes above this one.
    pub level: usize,
    /// Number of key bytes consumed above this node.
    pub depth: usize,
}

/// Where a leaf was found during a traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeafContext<'a> {
    /// Number of inner nodes above this leaf.
    pub level: usize,
    /// Key bytes spelled out by the prefixes and key bytes on the path to the
    /// leaf.
    ///
    /// Prefix bytes that are not stored inline are taken from the minimum leaf
    /// of the node that compresses them.
    pub path: &'a [u8],
}

/// The `Visitor` trait allows creating new operations on the tree by
/// implementing hooks for the different node types.
///
/// The tree drives the traversal in key order: the hook of an inner node runs
/// before any of its children, and the outputs of all children are folded
/// into the output of the parent with [`Visitor::combine_output`].
pub trait Visitor {
    /// The type of value that the visitor will produce.
    type Output;

    /// Produce the default value of the output type.
    ///
    /// This value is used for empty trees and by the hooks a visitor does not
    /// override.
    fn default_output(&self) -> Self::Output;

    /// Combine two output values into a single value.
    fn combine_output(&self, o1: Self::Output, o2: Self::Output) -> Self::Output;

    /// Visit a [`InnerNode4`].
    fn visit_node4(&mut self, _node: &InnerNode4, _ctx: NodeContext) -> Self::Output {
        self.default_output()
    }

    /// Visit a [`InnerNode16`].
    fn visit_node16(&mut self, _node: &InnerNode16, _ctx: NodeContext) -> Self::Output {
        self.default_output()
    }

    /// Visit a [`InnerNode48`].
    fn visit_node48(&mut self, _node: &InnerNode48, _ctx: NodeContext) -> Self::Output {
        self.default_output()
    }

    /// Visit a [`InnerNode256`].
    fn visit_node256(&mut self, _node: &InnerNode256, _ctx: NodeContext) -> Self::Output {
        self.default_output()
    }

    /// Visit a leaf, along with its full key.
    fn visit_leaf(&mut self, _leaf: Leaf<'_>, _key: &[u8], _ctx: LeafContext<'_>) -> Self::Output {
        self.default_output()
    }
}

impl<L: KeyLoader, A: NodeAllocator> RawTree<L, A> {
    /// Run `visitor` over every node of the tree.
    pub(crate) fn visit<V: Visitor>(&self, visitor: &mut V) -> V::Output {
        match self.root {
            Some(root) => {
                let mut path = Vec::with_capacity(self.key_len);
                self.visit_node(root, 0, &mut path, visitor)
            },
            None => visitor.default_output(),
        }
    }

    fn visit_node<V: Visitor>(
        &self,
        node: NodeRef,
        level: usize,
        path: &mut Vec<u8>,
        visitor: &mut V,
    ) -> V::Output {
        let handle = match node {
            NodeRef::Inner(handle) => handle,
            NodeRef::Leaf(leaf) => {
                let mut buf: KeyBuf = [0; MAX_KEY_LEN];
                let key = self.load_leaf_key(leaf, &mut buf);
                let ctx = LeafContext {
                    level,
                    path: path.as_slice(),
                };
                return visitor.visit_leaf(self.leaves.view(leaf), key, ctx);
            },
        };

        let depth = path.len();
        let ctx = NodeContext {
            handle,
            level,
            depth,
        };
        let mut output = match handle.kind {
            NodeKind::Node4 => visitor.visit_node4(self.arena.node(handle.addr), ctx),
            NodeKind::Node16 => visitor.visit_node16(self.arena.node(handle.addr), ctx),
            NodeKind::Node48 => visitor.visit_node48(self.arena.node(handle.addr), ctx),
            NodeKind::Node256 => visitor.visit_node256(self.arena.node(handle.addr), ctx),
        };

        let header = self.arena.header(handle);
        path.extend_from_slice(header.read_prefix());
        if header.has_implicit_bytes() {
            let mut buf: KeyBuf = [0; MAX_KEY_LEN];
            let leaf_key = self.load_leaf_key(self.minimum_leaf(node), &mut buf);
            let end = (depth + header.prefix_len()).min(leaf_key.len());
            path.extend_from_slice(&leaf_key[(depth + PREFIX_LEN).min(end)..end]);
        }

        // A node that consumes the whole key has no valid children.
        if path.len() < self.key_len {
            with_node!(&self.arena, handle, |node| {
                for (key_byte, child) in node.iter() {
                    path.push(key_byte);
                    let child_output = self.visit_node(child, level + 1, path, visitor);
                    output = visitor.combine_output(output, child_output);
                    path.pop();
                }
            });
        }

        path.truncate(depth);
        output
    }
}
