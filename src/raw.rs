//! The untyped tree: a root reference plus the arena, leaf store and key
//! loader needed to interpret it.

use crate::{alloc::NodeAllocator, KeyLoader, LeafMode, MAX_KEY_LEN};

mod leaf;
pub use leaf::*;

mod representation;
pub use representation::*;
pub(crate) use representation::{with_node, with_node_type, NodeArena};

mod operations;

pub mod visitor;

#[cfg(test)]
pub(crate) mod tests_common;

/// Stack buffer large enough for any configured key.
pub(crate) type KeyBuf = [u8; MAX_KEY_LEN];

/// Where a node reference is stored, so that it can be replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ChildSlot {
    /// The root reference of the tree.
    Root,
    /// The child of `parent` at `key_byte`.
    Child {
        /// The inner node holding the reference.
        parent: NodeHandle,
        /// The key byte the reference is stored under.
        key_byte: u8,
    },
}

/// An adaptive radix tree over fixed-length keys.
///
/// Inner nodes live in the arena `A`, duplicate-key row lists in a
/// [`LeafStore`], and keys are only ever stored implicitly: they are
/// reconstructed from row ids through the loader `L`.
#[derive(Debug)]
pub(crate) struct RawTree<L, A> {
    pub(crate) root: Option<NodeRef>,
    pub(crate) arena: A,
    pub(crate) leaves: LeafStore,
    pub(crate) loader: L,
    pub(crate) key_len: usize,
    pub(crate) leaf_mode: LeafMode,
    /// Number of distinct keys.
    pub(crate) num_keys: usize,
    /// Number of stored row ids, counting every duplicate.
    pub(crate) num_rows: usize,
}

impl<L: KeyLoader, A: NodeAllocator> RawTree<L, A> {
    /// Create an empty tree.
    pub(crate) fn new(key_len: usize, leaf_mode: LeafMode, loader: L, arena: A) -> Self {
        debug_assert!(key_len > 0 && key_len <= MAX_KEY_LEN);
        Self {
            root: None,
            arena,
            leaves: LeafStore::default(),
            loader,
            key_len,
            leaf_mode,
            num_keys: 0,
            num_rows: 0,
        }
    }

    /// Reconstruct the full key of `leaf` into `buf`.
    pub(crate) fn load_leaf_key<'b>(&self, leaf: LeafRef, buf: &'b mut KeyBuf) -> &'b [u8] {
        let key = &mut buf[..self.key_len];
        self.loader
            .load_key(self.leaves.representative_row(leaf), key);
        key
    }

    /// Search `handle` for the child at `key_fragment`.
    #[inline]
    pub(crate) fn lookup_child(&self, handle: NodeHandle, key_fragment: u8) -> Option<NodeRef> {
        with_node!(&self.arena, handle, |node| node.lookup_child(key_fragment))
    }

    /// Smallest child of an inner node.
    #[inline]
    pub(crate) fn min_child(&self, handle: NodeHandle) -> (u8, NodeRef) {
        with_node!(&self.arena, handle, |node| node.min())
    }

    /// Largest child of an inner node.
    #[inline]
    pub(crate) fn max_child(&self, handle: NodeHandle) -> (u8, NodeRef) {
        with_node!(&self.arena, handle, |node| node.max())
    }

    /// Write a child into an inner node that has room for it, or already
    /// holds `key_fragment`.
    pub(crate) fn write_child(&mut self, handle: NodeHandle, key_fragment: u8, child: NodeRef) {
        with_node_type!(handle.kind, N => {
            self.arena
                .node_mut::<N>(handle.addr)
                .write_child(key_fragment, child)
        })
    }

    /// Redirect the reference stored at `slot` to `node`.
    pub(crate) fn write_slot(&mut self, slot: ChildSlot, node: NodeRef) {
        match slot {
            ChildSlot::Root => self.root = Some(node),
            ChildSlot::Child { parent, key_byte } => self.write_child(parent, key_byte, node),
        }
    }

    /// Count how many bytes of the compressed path of `handle` match `key`
    /// starting at `depth`.
    ///
    /// Bytes beyond the inline buffer are compared against the key of the
    /// minimum leaf below the node, which shares the whole path by
    /// construction.
    pub(crate) fn prefix_mismatch(&self, handle: NodeHandle, key: &[u8], depth: usize) -> usize {
        let header = self.arena.header(handle);
        let prefix_len = header.prefix_len();
        let key = key.get(depth..).unwrap_or_default();

        let inline_matched = common_prefix_len(header.read_prefix(), key);
        if inline_matched < header.capped_prefix_len() || !header.has_implicit_bytes() {
            return inline_matched;
        }

        let mut buf = [0; MAX_KEY_LEN];
        let leaf = self.minimum_leaf(NodeRef::Inner(handle));
        let leaf_key = &self.load_leaf_key(leaf, &mut buf)[depth..depth + prefix_len];
        PREFIX_LEN + common_prefix_len(&leaf_key[PREFIX_LEN..], key.get(PREFIX_LEN..).unwrap_or_default())
    }
}

/// Number of leading bytes shared by `a` and `b`.
#[inline]
pub(crate) fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(a, b)| a == b).count()
}
