//! Trie node representation

use crate::{
    alloc::{NodeAllocator, SlotAddr},
    raw::{LeafRef, ListId},
    AllocError, RowId,
};
use bytemuck::{Pod, Zeroable};
use core::{fmt, mem, ops::Range};

mod header;
pub use header::*;

mod inner_node_256;
pub use inner_node_256::*;

mod inner_node_48;
pub use inner_node_48::*;

mod inner_node_compressed;
pub use inner_node_compressed::*;

/// The representation of inner nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum NodeKind {
    /// Node that references between 2 and 4 children
    Node4 = 1,
    /// Node that references between 5 and 16 children
    Node16 = 2,
    /// Node that references between 17 and 48 children
    Node48 = 3,
    /// Node that references between 49 and 256 children
    Node256 = 4,
}

impl NodeKind {
    /// Every variant, smallest first.
    pub const ALL: [NodeKind; 4] = [
        NodeKind::Node4,
        NodeKind::Node16,
        NodeKind::Node48,
        NodeKind::Node256,
    ];

    /// The upper bound on the number of child nodes that this
    /// NodeKind can have.
    pub const fn upper_capacity(self) -> usize {
        match self {
            NodeKind::Node4 => 4,
            NodeKind::Node16 => 16,
            NodeKind::Node48 => 48,
            NodeKind::Node256 => 256,
        }
    }

    /// Size in bytes of the node struct stored in an arena slot.
    pub const fn slot_size(self) -> usize {
        match self {
            NodeKind::Node4 => mem::size_of::<InnerNode4>(),
            NodeKind::Node16 => mem::size_of::<InnerNode16>(),
            NodeKind::Node48 => mem::size_of::<InnerNode48>(),
            NodeKind::Node256 => mem::size_of::<InnerNode256>(),
        }
    }

    /// Position of the variant in [`NodeKind::ALL`].
    pub const fn index(self) -> usize {
        self as usize - 1
    }

    /// Convert a stored discriminant back into a [`NodeKind`].
    pub const fn from_u8(src: u8) -> Option<NodeKind> {
        match src {
            1 => Some(NodeKind::Node4),
            2 => Some(NodeKind::Node16),
            3 => Some(NodeKind::Node48),
            4 => Some(NodeKind::Node256),
            _ => None,
        }
    }

    /// Return true if an [`InnerNode`] with the given [`NodeKind`] and
    /// specified number of children should be shrunk.
    pub fn should_shrink_inner_node(self, num_children: usize) -> bool {
        match self {
            NodeKind::Node4 => false,
            NodeKind::Node16 => num_children <= 4,
            NodeKind::Node48 => num_children <= 16,
            NodeKind::Node256 => num_children <= 48,
        }
    }

    /// Return the range of number of children that each node kind accepts.
    pub const fn capacity_range(self) -> Range<usize> {
        match self {
            NodeKind::Node4 => Range { start: 2, end: 5 },
            NodeKind::Node16 => Range { start: 5, end: 17 },
            NodeKind::Node48 => Range { start: 17, end: 49 },
            NodeKind::Node256 => Range {
                start: 49,
                end: 257,
            },
        }
    }
}

/// Handle to an inner node living in an arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeHandle {
    /// Variant of the node, which fixes the slot layout.
    pub kind: NodeKind,
    /// Location of the slot.
    pub addr: SlotAddr,
}

impl NodeHandle {
    /// Create a new handle.
    pub const fn new(kind: NodeKind, addr: SlotAddr) -> Self {
        Self { kind, addr }
    }
}

/// A child of an inner node, or the root of a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeRef {
    /// An inner node.
    Inner(NodeHandle),
    /// A leaf.
    Leaf(LeafRef),
}

impl NodeRef {
    /// Returns true if this references a leaf.
    pub fn is_leaf(&self) -> bool {
        matches!(self, NodeRef::Leaf(_))
    }
}

impl From<NodeHandle> for NodeRef {
    fn from(handle: NodeHandle) -> Self {
        NodeRef::Inner(handle)
    }
}

impl From<LeafRef> for NodeRef {
    fn from(leaf: LeafRef) -> Self {
        NodeRef::Leaf(leaf)
    }
}

/// In-arena encoding of an optional [`NodeRef`].
///
/// The `tag` field is the discriminant: `0` is an empty slot, `1..=4` are the
/// inner node variants (same values as [`NodeKind`]), `5` is a row id stored
/// inline and `6` is a row id list.
///
/// Inner node references keep the page index in `page` and split the 64-bit
/// slot offset over `lo` and `hi`.
#[derive(Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct RawRef {
    tag: u32,
    page: u32,
    lo: u32,
    hi: u32,
}

impl RawRef {
    const TAG_EMPTY: u32 = 0;
    const TAG_ROW: u32 = 5;
    const TAG_LIST: u32 = 6;

    /// The empty slot.
    pub const EMPTY: RawRef = RawRef {
        tag: Self::TAG_EMPTY,
        page: 0,
        lo: 0,
        hi: 0,
    };

    /// Encode a child reference.
    pub const fn new(node: NodeRef) -> Self {
        match node {
            NodeRef::Inner(NodeHandle { kind, addr }) => RawRef {
                tag: kind as u32,
                page: addr.page,
                lo: addr.offset as u32,
                hi: (addr.offset >> 32) as u32,
            },
            NodeRef::Leaf(LeafRef::Row(row_id)) => RawRef {
                tag: Self::TAG_ROW,
                page: 0,
                lo: row_id as u32,
                hi: (row_id >> 32) as u32,
            },
            NodeRef::Leaf(LeafRef::List(ListId(id))) => RawRef {
                tag: Self::TAG_LIST,
                page: 0,
                lo: id,
                hi: 0,
            },
        }
    }

    /// Returns true for the empty slot.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tag == Self::TAG_EMPTY
    }

    /// Decode the reference.
    ///
    /// # Panics
    ///  - Panics on an unknown tag, which means the arena was corrupted.
    #[inline]
    pub fn get(self) -> Option<NodeRef> {
        match self.tag {
            Self::TAG_EMPTY => None,
            Self::TAG_ROW => Some(NodeRef::Leaf(LeafRef::Row(
                RowId::from(self.lo) | (RowId::from(self.hi) << 32),
            ))),
            Self::TAG_LIST => Some(NodeRef::Leaf(LeafRef::List(ListId(self.lo)))),
            tag => match NodeKind::from_u8(tag as u8) {
                Some(kind) if tag <= u32::from(u8::MAX) => Some(NodeRef::Inner(NodeHandle::new(
                    kind,
                    SlotAddr::new(self.page, u64::from(self.lo) | (u64::from(self.hi) << 32)),
                ))),
                _ => panic!("corrupted child reference with tag [{tag}]"),
            },
        }
    }

    /// Decode a reference that must be occupied.
    ///
    /// # Panics
    ///  - Panics if the slot is empty or corrupted.
    #[inline]
    pub fn child(self) -> NodeRef {
        match self.get() {
            Some(node) => node,
            None => panic!("occupied child slot holds an empty reference"),
        }
    }
}

impl fmt::Debug for RawRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(node) => fmt::Debug::fmt(&node, f),
            None => f.write_str("Empty"),
        }
    }
}

/// Common methods implemented by all inner node.
///
/// Inner nodes are plain-old-data so that they can be viewed in place inside
/// arena slots.
pub trait InnerNode: Pod + fmt::Debug {
    /// The variant of this node type.
    const KIND: NodeKind;

    /// The type of the next larger node type.
    type GrownNode: InnerNode;

    /// The type of the next smaller node type.
    type ShrunkNode: InnerNode;

    /// Create an empty [`InnerNode`], with no children and no prefix
    #[inline]
    fn empty() -> Self {
        Self::from_header(Header::empty())
    }

    /// Create a new [`InnerNode`] using
    /// `prefix` as the node prefix and
    /// `prefix_len` as the node prefix length.
    ///
    /// The prefix length may be larger than `prefix.len()` when the node
    /// compresses more bytes than the header can store.
    fn from_prefix(prefix: &[u8], prefix_len: usize) -> Self {
        Self::from_header(Header::new(prefix, prefix_len))
    }

    /// Create a new [`InnerNode`] using a `Header`. The header is stamped with
    /// this node's kind and its child count is reset.
    fn from_header(header: Header) -> Self;

    /// Get the `Header` from the [`InnerNode`]
    fn header(&self) -> &Header;

    /// Get the `Header` from the [`InnerNode`], mutably
    fn header_mut(&mut self) -> &mut Header;

    /// Search through this node for a child node that corresponds to the given
    /// key fragment.
    fn lookup_child(&self, key_fragment: u8) -> Option<NodeRef>;

    /// Write a child pointer with key fragment to this inner node.
    ///
    /// If the key fragment already exists in the node, overwrite the existing
    /// child pointer.
    ///
    /// # Panics
    ///  - Panics when the node is full.
    fn write_child(&mut self, key_fragment: u8, child: NodeRef);

    /// Attempt to remove a child pointer at the key fragment from this inner
    /// node.
    ///
    /// If the key fragment does not exist in this node, return `None`.
    fn remove_child(&mut self, key_fragment: u8) -> Option<NodeRef>;

    /// Grow this node into the next larger class, copying over children and
    /// prefix information.
    fn grow(&self) -> Self::GrownNode;

    /// Shrink this node into the next smaller class, copying over children and
    /// prefix information.
    ///
    /// # Panics
    ///  - Panics if the new, smaller node size does not have enough capacity to
    ///    hold all the children.
    fn shrink(&self) -> Self::ShrunkNode;

    /// Returns true if this node has no more space to store children.
    fn is_full(&self) -> bool {
        self.header().num_children() >= Self::KIND.upper_capacity()
    }

    /// Iterate over all `(key byte, child)` pairs in ascending key byte order.
    fn iter(&self) -> impl DoubleEndedIterator<Item = (u8, NodeRef)> + '_;

    /// Returns the minimum child and its key byte.
    ///
    /// # Panics
    ///  - Panics if the node has no children.
    fn min(&self) -> (u8, NodeRef) {
        match self.iter().next() {
            Some(child) => child,
            None => panic!("inner node {:?} has no children", Self::KIND),
        }
    }

    /// Returns the maximum child and its key byte.
    ///
    /// # Panics
    ///  - Panics if the node has no children.
    fn max(&self) -> (u8, NodeRef) {
        match self.iter().next_back() {
            Some(child) => child,
            None => panic!("inner node {:?} has no children", Self::KIND),
        }
    }
}

/// Typed access to nodes stored in a [`NodeAllocator`].
pub(crate) trait NodeArena: NodeAllocator {
    /// View the node at `addr`.
    #[inline]
    fn node<N: InnerNode>(&self, addr: SlotAddr) -> &N {
        bytemuck::from_bytes(self.slot(N::KIND, addr))
    }

    /// View the node at `addr`, mutably.
    #[inline]
    fn node_mut<N: InnerNode>(&mut self, addr: SlotAddr) -> &mut N {
        bytemuck::from_bytes_mut(self.slot_mut(N::KIND, addr))
    }

    /// View the header of any node.
    #[inline]
    fn header(&self, handle: NodeHandle) -> &Header {
        bytemuck::from_bytes(&self.slot(handle.kind, handle.addr)[..mem::size_of::<Header>()])
    }

    /// View the header of any node, mutably.
    #[inline]
    fn header_mut(&mut self, handle: NodeHandle) -> &mut Header {
        bytemuck::from_bytes_mut(
            &mut self.slot_mut(handle.kind, handle.addr)[..mem::size_of::<Header>()],
        )
    }

    /// Move `node` into a fresh slot.
    #[inline]
    fn alloc_node<N: InnerNode>(&mut self, node: N) -> Result<NodeHandle, AllocError> {
        let addr = self.allocate(N::KIND)?;
        *self.node_mut::<N>(addr) = node;
        Ok(NodeHandle::new(N::KIND, addr))
    }
}

impl<A: NodeAllocator + ?Sized> NodeArena for A {}

/// Run `$body` with `$node` bound to the typed view of `$handle`.
macro_rules! with_node {
    ($arena:expr, $handle:expr, |$node:ident| $body:expr) => {{
        let handle: $crate::raw::NodeHandle = $handle;
        match handle.kind {
            $crate::raw::NodeKind::Node4 => {
                let $node = $crate::raw::NodeArena::node::<$crate::raw::InnerNode4>(
                    $arena,
                    handle.addr,
                );
                $body
            },
            $crate::raw::NodeKind::Node16 => {
                let $node = $crate::raw::NodeArena::node::<$crate::raw::InnerNode16>(
                    $arena,
                    handle.addr,
                );
                $body
            },
            $crate::raw::NodeKind::Node48 => {
                let $node = $crate::raw::NodeArena::node::<$crate::raw::InnerNode48>(
                    $arena,
                    handle.addr,
                );
                $body
            },
            $crate::raw::NodeKind::Node256 => {
                let $node = $crate::raw::NodeArena::node::<$crate::raw::InnerNode256>(
                    $arena,
                    handle.addr,
                );
                $body
            },
        }
    }};
}

pub(crate) use with_node;

/// Run `$body` with the node type of `$kind` bound to the type alias `$ty`.
macro_rules! with_node_type {
    ($kind:expr, $ty:ident => $body:expr) => {
        match $kind {
            $crate::raw::NodeKind::Node4 => {
                type $ty = $crate::raw::InnerNode4;
                $body
            },
            $crate::raw::NodeKind::Node16 => {
                type $ty = $crate::raw::InnerNode16;
                $body
            },
            $crate::raw::NodeKind::Node48 => {
                type $ty = $crate::raw::InnerNode48;
                $body
            },
            $crate::raw::NodeKind::Node256 => {
                type $ty = $crate::raw::InnerNode256;
                $body
            },
        }
    };
}

pub(crate) use with_node_type;
