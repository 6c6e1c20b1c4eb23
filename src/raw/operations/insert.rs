use crate::{
    alloc::NodeAllocator,
    raw::{
        common_prefix_len, with_node_type, ChildSlot, InnerNode, InnerNode4, KeyBuf, LeafRef,
        NodeArena, NodeHandle, NodeRef, RawTree,
    },
    AllocError, KeyLoader, LeafMode, RowId, MAX_KEY_LEN,
};
use tracing::trace;

/// The type of insert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InsertSearchResultType {
    /// The tree is empty.
    ///
    /// This insert type writes the new leaf as the root.
    IntoEmpty,
    /// An insert where an inner node had a differing prefix from the key.
    ///
    /// This insert type will create a new Node4 with the portion of the prefix
    /// that did match, and trim the matched bytes and the branching byte off
    /// the existing inner node.
    MismatchPrefix {
        /// The inner node which had a mismatched prefix
        mismatched_inner_node: NodeHandle,
        /// Number of prefix bytes that matched the key
        matched: usize,
    },
    /// An insert where the key matched all the way up to a leaf with a
    /// different key.
    ///
    /// This insert type will create a new Node4, and assign the existing leaf
    /// and the new leaf as children to that node.
    SplitLeaf {
        /// The leaf that will be split
        leaf: LeafRef,
        /// Number of bytes shared by both keys after the leaf's depth
        common: usize,
    },
    /// Exact match of the leaf was found
    ///
    /// This insert type appends to the leaf in duplicate-key mode and is a
    /// collision otherwise.
    Exact {
        /// The leaf stored under the key
        leaf: LeafRef,
    },
    /// An insert where the search terminated at an existing inner node that
    /// did not have a child with the key byte.
    ///
    /// If the inner node is full, it will be grown to the next largest size.
    IntoExisting {
        /// The existing inner node which will be updated to contain the new
        /// leaf
        inner_node: NodeHandle,
        /// The key byte of the new leaf
        key_byte: u8,
    },
}

/// This struct contains the results from searching for an insert point for
/// a new row id in the tree.
///
/// It contains all the relevant information needed to perform the insert
/// and update the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct InsertPoint {
    /// Where the reference to the node found by the search is stored.
    pub slot: ChildSlot,
    /// The type of operation that needs to be performed to insert the key
    pub insert_type: InsertSearchResultType,
    /// The number of key bytes consumed above the node found by the search.
    pub depth: usize,
}

impl<L: KeyLoader, A: NodeAllocator> RawTree<L, A> {
    /// Insert `row_id` under `key`.
    ///
    /// Returns `Ok(false)` without touching the tree when the key is already
    /// present in unique-key mode.
    ///
    /// # Errors
    ///  - Returns an error if the arena cannot provide a node. The tree is left
    ///    unchanged in that case.
    pub(crate) fn try_insert(&mut self, key: &[u8], row_id: RowId) -> Result<bool, AllocError> {
        debug_assert_eq!(key.len(), self.key_len);

        let insert_point = self.search_for_insert_point(key);
        self.apply_insert(insert_point, key, row_id)
    }

    /// Perform an iterative search for the insert point for the given key.
    pub(crate) fn search_for_insert_point(&self, key: &[u8]) -> InsertPoint {
        let mut slot = ChildSlot::Root;
        let mut depth = 0;
        let Some(mut current_node) = self.root else {
            return InsertPoint {
                slot,
                insert_type: InsertSearchResultType::IntoEmpty,
                depth,
            };
        };

        loop {
            let handle = match current_node {
                NodeRef::Inner(handle) => handle,
                NodeRef::Leaf(leaf) => {
                    let mut buf: KeyBuf = [0; MAX_KEY_LEN];
                    let leaf_key = self.load_leaf_key(leaf, &mut buf);
                    let common = common_prefix_len(&leaf_key[depth..], &key[depth..]);

                    let insert_type = if depth + common == key.len() {
                        InsertSearchResultType::Exact { leaf }
                    } else {
                        InsertSearchResultType::SplitLeaf { leaf, common }
                    };
                    return InsertPoint {
                        slot,
                        insert_type,
                        depth,
                    };
                },
            };

            let prefix_len = self.arena.header(handle).prefix_len();
            let matched = self.prefix_mismatch(handle, key, depth);
            if matched != prefix_len {
                return InsertPoint {
                    slot,
                    insert_type: InsertSearchResultType::MismatchPrefix {
                        mismatched_inner_node: handle,
                        matched,
                    },
                    depth,
                };
            }

            let key_byte = match key.get(depth + prefix_len) {
                Some(key_byte) => *key_byte,
                None => panic!(
                    "inner node {handle:?} at depth [{depth}] consumes the whole key of length \
                     [{}]",
                    key.len()
                ),
            };

            match self.lookup_child(handle, key_byte) {
                Some(child) => {
                    slot = ChildSlot::Child {
                        parent: handle,
                        key_byte,
                    };
                    current_node = child;
                    depth += prefix_len + 1;
                },
                None => {
                    return InsertPoint {
                        slot,
                        insert_type: InsertSearchResultType::IntoExisting {
                            inner_node: handle,
                            key_byte,
                        },
                        depth,
                    };
                },
            }
        }
    }

    /// Use the [`InsertPoint`] information to insert `row_id` under `key`.
    ///
    /// Every node allocation happens before the first write that is visible
    /// from the root.
    pub(crate) fn apply_insert(
        &mut self,
        insert_point: InsertPoint,
        key: &[u8],
        row_id: RowId,
    ) -> Result<bool, AllocError> {
        let InsertPoint {
            slot,
            insert_type,
            depth,
        } = insert_point;

        match insert_type {
            InsertSearchResultType::IntoEmpty => {
                let new_leaf = self.new_leaf(row_id);
                self.write_slot(slot, new_leaf);
            },
            InsertSearchResultType::Exact { leaf } => {
                return Ok(self.insert_duplicate(leaf, key, row_id));
            },
            InsertSearchResultType::SplitLeaf { leaf, common } => {
                let branch_depth = depth + common;
                let mut buf: KeyBuf = [0; MAX_KEY_LEN];
                let existing_key_byte = self.load_leaf_key(leaf, &mut buf)[branch_depth];

                let new_node = self
                    .arena
                    .alloc_node(InnerNode4::from_prefix(&key[depth..], common))?;
                let new_leaf = self.new_leaf(row_id);

                self.write_child(new_node, existing_key_byte, NodeRef::Leaf(leaf));
                self.write_child(new_node, key[branch_depth], new_leaf);
                self.write_slot(slot, NodeRef::Inner(new_node));
            },
            InsertSearchResultType::MismatchPrefix {
                mismatched_inner_node,
                matched,
            } => {
                let mut header = *self.arena.header(mismatched_inner_node);
                let existing_key_byte = if header.has_implicit_bytes() {
                    let leaf = self.minimum_leaf(NodeRef::Inner(mismatched_inner_node));
                    let mut buf: KeyBuf = [0; MAX_KEY_LEN];
                    let leaf_key = &self.load_leaf_key(leaf, &mut buf)[depth..];
                    header.ltrim_by_with_key(matched + 1, leaf_key);
                    leaf_key[matched]
                } else {
                    let existing_key_byte = header.read_prefix()[matched];
                    header.ltrim_by(matched + 1);
                    existing_key_byte
                };

                let new_node = self
                    .arena
                    .alloc_node(InnerNode4::from_prefix(&key[depth..], matched))?;
                *self.arena.header_mut(mismatched_inner_node) = header;
                let new_leaf = self.new_leaf(row_id);

                self.write_child(
                    new_node,
                    existing_key_byte,
                    NodeRef::Inner(mismatched_inner_node),
                );
                self.write_child(new_node, key[depth + matched], new_leaf);
                self.write_slot(slot, NodeRef::Inner(new_node));
            },
            InsertSearchResultType::IntoExisting {
                inner_node,
                key_byte,
            } => {
                let is_full = with_node_type!(inner_node.kind, N => {
                    self.arena.node::<N>(inner_node.addr).is_full()
                });

                if is_full {
                    // The old node is abandoned in the arena.
                    let grown_node = with_node_type!(inner_node.kind, N => {
                        let grown = self.arena.node::<N>(inner_node.addr).grow();
                        self.arena.alloc_node(grown)?
                    });
                    let new_leaf = self.new_leaf(row_id);
                    self.write_child(grown_node, key_byte, new_leaf);
                    self.write_slot(slot, NodeRef::Inner(grown_node));
                } else {
                    let new_leaf = self.new_leaf(row_id);
                    self.write_child(inner_node, key_byte, new_leaf);
                }
            },
        }

        self.num_keys += 1;
        self.num_rows += 1;
        Ok(true)
    }

    /// Handle an insert under a key that is already present.
    fn insert_duplicate(&mut self, leaf: LeafRef, key: &[u8], row_id: RowId) -> bool {
        match (self.leaf_mode, leaf) {
            (LeafMode::Duplicates, LeafRef::List(id)) => {
                self.leaves.append(id, row_id);
                self.num_rows += 1;
                true
            },
            (LeafMode::Unique, _) => {
                trace!(?key, row_id, "rejected insert of an existing key");
                false
            },
            (LeafMode::Duplicates, LeafRef::Row(existing)) => {
                panic!("duplicate-key tree holds the single-row leaf [{existing}]")
            },
        }
    }

    /// Create the leaf for a newly inserted key.
    fn new_leaf(&mut self, row_id: RowId) -> NodeRef {
        let leaf = match self.leaf_mode {
            LeafMode::Unique => LeafRef::Row(row_id),
            LeafMode::Duplicates => LeafRef::List(self.leaves.push_list(row_id)),
        };
        NodeRef::Leaf(leaf)
    }
}
