use crate::{
    alloc::NodeAllocator,
    raw::{
        with_node_type, ChildSlot, InnerNode, KeyBuf, LeafRef, NodeArena, NodeHandle, NodeRef,
        RawTree,
    },
    AllocError, KeyLoader, RowId, MAX_KEY_LEN,
};

/// The inner node holding the leaf that will be deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DeleteParent {
    /// Where the reference to the parent node is stored.
    pub slot: ChildSlot,
    /// The parent node.
    pub node: NodeHandle,
    /// The number of key bytes consumed above the parent node.
    pub depth: usize,
    /// The key byte of the leaf inside the parent node.
    pub child_key_byte: u8,
}

/// This struct represents a location in the trie that can be deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DeletePoint {
    /// The parent of the leaf, or `None` when the leaf is the root.
    pub parent: Option<DeleteParent>,
    /// The leaf stored under the key.
    pub leaf: LeafRef,
}

impl<L: KeyLoader, A: NodeAllocator> RawTree<L, A> {
    /// Remove `row_id` from the leaf stored under `key`.
    ///
    /// Returns `Ok(false)` if the key is absent or does not hold `row_id`.
    ///
    /// # Errors
    ///  - Returns an error if shrinking an inner node needs a slot that the
    ///    arena cannot provide. The tree is left unchanged in that case.
    pub(crate) fn try_remove(&mut self, key: &[u8], row_id: RowId) -> Result<bool, AllocError> {
        match self.search_for_delete_point(key) {
            Some(delete_point) => self.apply_delete(delete_point, row_id),
            None => Ok(false),
        }
    }

    /// Search in the tree for the leaf to delete, returning `None` if it does
    /// not exist.
    ///
    /// This function also returns the parent of the leaf, which is the only
    /// node a deletion restructures.
    pub(crate) fn search_for_delete_point(&self, key: &[u8]) -> Option<DeletePoint> {
        if key.len() != self.key_len {
            return None;
        }

        let mut current_node = self.root?;
        let mut slot = ChildSlot::Root;
        let mut parent = None;
        let mut current_depth = 0;

        loop {
            let handle = match current_node {
                NodeRef::Inner(handle) => handle,
                NodeRef::Leaf(leaf) => {
                    let mut buf: KeyBuf = [0; MAX_KEY_LEN];
                    let leaf_key = self.load_leaf_key(leaf, &mut buf);
                    return (leaf_key[current_depth..] == key[current_depth..])
                        .then_some(DeletePoint { parent, leaf });
                },
            };

            let prefix_len = self.arena.header(handle).prefix_len();
            if self.prefix_mismatch(handle, key, current_depth) != prefix_len {
                return None;
            }

            let child_key_byte = *key.get(current_depth + prefix_len)?;
            let child = self.lookup_child(handle, child_key_byte)?;

            parent = Some(DeleteParent {
                slot,
                node: handle,
                depth: current_depth,
                child_key_byte,
            });
            slot = ChildSlot::Child {
                parent: handle,
                key_byte: child_key_byte,
            };
            current_node = child;
            current_depth += prefix_len + 1;
        }
    }

    /// Handle the logic of deleting a row id from the tree, after its leaf has
    /// been found.
    pub(crate) fn apply_delete(
        &mut self,
        delete_point: DeletePoint,
        row_id: RowId,
    ) -> Result<bool, AllocError> {
        let DeletePoint { parent, leaf } = delete_point;

        let leaf_emptied = match leaf {
            LeafRef::Row(stored) if stored == row_id => true,
            LeafRef::Row(_) => return Ok(false),
            LeafRef::List(id) => {
                let rows = self.leaves.list(id).as_slice();
                if !rows.contains(&row_id) {
                    return Ok(false);
                }
                rows.len() == 1
            },
        };

        if leaf_emptied {
            match parent {
                None => self.root = None,
                Some(parent) => self.remove_child_and_compress(parent)?,
            }
            self.num_keys -= 1;
        }

        if let LeafRef::List(id) = leaf {
            self.leaves.remove_row(id, row_id);
        }
        self.num_rows -= 1;
        Ok(true)
    }

    /// Remove a leaf from its parent, then restore the node invariants.
    ///
    /// A parent left with a single child is replaced by that child, with the
    /// parent's prefix and the child's key byte merged into the child's
    /// prefix. A parent whose child count dropped into the range of the next
    /// smaller kind is shrunk.
    fn remove_child_and_compress(&mut self, parent: DeleteParent) -> Result<(), AllocError> {
        let DeleteParent {
            slot,
            node: handle,
            depth,
            child_key_byte,
        } = parent;

        with_node_type!(handle.kind, N => {
            let mut node = *self.arena.node::<N>(handle.addr);
            node.remove_child(child_key_byte);
            let num_children = node.header().num_children();

            if num_children == 1 {
                let (_, child) = node.min();
                if let NodeRef::Inner(child_handle) = child {
                    // Construct the new prefix by concatenating the parent prefix, the
                    // child key byte and the child prefix.
                    let merged_len = node.header().prefix_len()
                        + 1
                        + self.arena.header(child_handle).prefix_len();
                    let leaf = self.minimum_leaf(child);
                    let mut buf: KeyBuf = [0; MAX_KEY_LEN];
                    let leaf_key = &self.load_leaf_key(leaf, &mut buf)[depth..];
                    self.arena
                        .header_mut(child_handle)
                        .set_prefix(leaf_key, merged_len);
                }
                self.write_slot(slot, child);
                self.arena.release(N::KIND, handle.addr);
            } else if N::KIND.should_shrink_inner_node(num_children) {
                let shrunk = self.arena.alloc_node(node.shrink())?;
                self.write_slot(slot, NodeRef::Inner(shrunk));
                self.arena.release(N::KIND, handle.addr);
            } else {
                *self.arena.node_mut::<N>(handle.addr) = node;
            }
        });

        Ok(())
    }
}
