use crate::{
    alloc::NodeAllocator,
    raw::{with_node, with_node_type, InnerNode, NodeArena, NodeHandle, NodeRef, RawTree},
    AllocError, KeyLoader,
};
use std::{collections::HashMap, mem};
use tracing::debug;

impl<L: KeyLoader, A: NodeAllocator> RawTree<L, A> {
    /// Every inner node of the tree, in preorder.
    pub(crate) fn inner_nodes_preorder(&self) -> Vec<NodeHandle> {
        let mut preorder = Vec::new();
        let Some(NodeRef::Inner(root)) = self.root else {
            return preorder;
        };

        let mut stack = vec![root];
        while let Some(handle) = stack.pop() {
            preorder.push(handle);
            with_node!(&self.arena, handle, |node| {
                stack.extend(node.iter().rev().filter_map(|(_, child)| match child {
                    NodeRef::Inner(child) => Some(child),
                    NodeRef::Leaf(_) => None,
                }))
            });
        }

        preorder
    }

    /// Copy every inner node into `arena`, allocating the copies in preorder,
    /// and return the image of the root.
    ///
    /// Leaf references are copied verbatim. This tree is left untouched.
    ///
    /// # Errors
    ///  - Returns an error if `arena` cannot provide a node.
    pub(crate) fn relocate_into<B: NodeAllocator>(
        &self,
        arena: &mut B,
    ) -> Result<Option<NodeRef>, AllocError> {
        let Some(root) = self.root else {
            return Ok(None);
        };
        let NodeRef::Inner(root_handle) = root else {
            return Ok(Some(root));
        };

        let preorder = self.inner_nodes_preorder();
        let mut relocated = HashMap::with_capacity(preorder.len());
        for &old in &preorder {
            let new = with_node_type!(old.kind, N => {
                arena.alloc_node(*self.arena.node::<N>(old.addr))?
            });
            relocated.insert(old, new);
        }

        for old in &preorder {
            let new = relocated[old];
            with_node_type!(old.kind, N => {
                let old_node = self.arena.node::<N>(old.addr);
                let new_node = arena.node_mut::<N>(new.addr);
                for (key_byte, child) in old_node.iter() {
                    if let NodeRef::Inner(child) = child {
                        new_node.write_child(key_byte, NodeRef::Inner(relocated[&child]));
                    }
                }
            });
        }

        debug!(
            inner_nodes = preorder.len(),
            old_pages = self.arena.num_pages(),
            new_pages = arena.num_pages(),
            "relocated tree nodes in preorder"
        );

        Ok(Some(NodeRef::Inner(relocated[&root_handle])))
    }

    /// Build a copy of this tree whose inner nodes live in `arena`, laid out
    /// in preorder.
    ///
    /// # Errors
    ///  - Returns an error if `arena` cannot provide a node.
    pub(crate) fn reorganize<B: NodeAllocator>(
        &self,
        mut arena: B,
    ) -> Result<RawTree<L, B>, AllocError>
    where
        L: Clone,
    {
        let root = self.relocate_into(&mut arena)?;
        Ok(RawTree {
            root,
            arena,
            leaves: self.leaves.clone(),
            loader: self.loader.clone(),
            key_len: self.key_len,
            leaf_mode: self.leaf_mode,
            num_keys: self.num_keys,
            num_rows: self.num_rows,
        })
    }

    /// Move every inner node into `arena` in preorder and swap it in, then drop
    /// the old arena as a whole.
    ///
    /// # Errors
    ///  - Returns an error if `arena` cannot provide a node. The tree keeps its
    ///    current arena in that case.
    pub(crate) fn compact(&mut self, mut arena: A) -> Result<(), AllocError> {
        let root = self.relocate_into(&mut arena)?;
        let old_arena = mem::replace(&mut self.arena, arena);
        self.root = root;
        drop(old_arena);
        Ok(())
    }
}
