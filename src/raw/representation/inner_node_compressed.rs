use crate::raw::{Header, InnerNode, InnerNode48, NodeKind, NodeRef, RawRef};
use bytemuck::{Pod, Zeroable};
use core::fmt;

/// Where a write should happen inside the node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WritePoint {
    /// In an already existing key fragment
    Existing(usize),
    /// As the last key fragment
    Last(usize),
    /// Shift the key fragments to the right
    Shift(usize),
}

/// Common methods for searching in an [`InnerNodeCompressed`]
trait SearchInnerNodeCompressed {
    /// Mask applied to key bytes before they are stored in `keys`.
    const KEY_MASK: u8;

    /// Get the index of the child if it exists
    fn lookup_child_index(&self, key_fragment: u8) -> Option<usize>;

    /// Find the write point for `key_fragment`
    fn find_write_point(&self, key_fragment: u8) -> WritePoint;
}

/// Node type that has a compact representation for key bytes and children
/// pointers.
///
/// Keys are kept sorted, and `children[i]` belongs to `keys[i]`. A Node16
/// stores its keys with the sign bit flipped so that a signed byte compare
/// orders them the same way as an unsigned compare of the original bytes.
///
/// Only the [`InnerNode4`] and [`InnerNode16`] layouts are plain-old-data;
/// other sizes may contain padding.
///
/// ```compile_fail
/// fn assert_pod<T: bytemuck::Pod>() {}
///
/// assert_pod::<art_index::InnerNodeCompressed<5>>();
/// ```
#[derive(Clone, Copy)]
#[repr(C)]
pub struct InnerNodeCompressed<const SIZE: usize> {
    /// The common node fields.
    pub header: Header,
    /// Stored key bytes, only the first `header.num_children` are live.
    pub keys: [u8; SIZE],
    /// Child references matching `keys`.
    pub children: [RawRef; SIZE],
}

/// Node that references between 2 and 4 children
pub type InnerNode4 = InnerNodeCompressed<4>;

/// Node that references between 5 and 16 children
pub type InnerNode16 = InnerNodeCompressed<16>;

impl<const SIZE: usize> fmt::Debug for InnerNodeCompressed<SIZE> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let num_children = self.header.num_children();
        f.debug_struct("InnerNodeCompressed")
            .field("SIZE", &SIZE)
            .field("header", &self.header)
            .field("keys", &&self.keys[..num_children])
            .field("children", &&self.children[..num_children])
            .finish()
    }
}

impl<const SIZE: usize> InnerNodeCompressed<SIZE> {
    /// Return the initialized portions of the stored keys and children.
    pub fn initialized_portion(&self) -> (&[u8], &[RawRef]) {
        let num_children = self.header.num_children();
        (&self.keys[..num_children], &self.children[..num_children])
    }
}

impl<const SIZE: usize> InnerNodeCompressed<SIZE>
where
    Self: SearchInnerNodeCompressed,
{
    fn empty_with(header: Header, kind: NodeKind) -> Self {
        let mut header = header;
        header.reset_for(kind);
        Self {
            header,
            keys: [0; SIZE],
            children: [RawRef::EMPTY; SIZE],
        }
    }

    /// The live key bytes, converted back from their stored form.
    fn key_bytes(&self) -> impl DoubleEndedIterator<Item = u8> + ExactSizeIterator + '_ {
        self.initialized_portion()
            .0
            .iter()
            .map(|key| key ^ Self::KEY_MASK)
    }

    /// Writes a child to the node by check the order of insertion
    ///
    /// # Panics
    ///  - Panics if a new key must be added and the node is full.
    fn write_child_inner(&mut self, key_fragment: u8, child: NodeRef) {
        let num_children = self.header.num_children();
        let idx = match self.find_write_point(key_fragment) {
            WritePoint::Existing(child_index) => child_index,
            WritePoint::Last(child_index) => {
                assert!(child_index < SIZE, "node is full");
                self.header.inc_num_children();
                child_index
            },
            WritePoint::Shift(child_index) => {
                assert!(num_children < SIZE, "node is full");
                self.keys
                    .copy_within(child_index..num_children, child_index + 1);
                self.children
                    .copy_within(child_index..num_children, child_index + 1);
                self.header.inc_num_children();
                child_index
            },
        };
        self.keys[idx] = key_fragment ^ Self::KEY_MASK;
        self.children[idx] = RawRef::new(child);
    }

    /// Removes child if it exists
    fn remove_child_inner(&mut self, key_fragment: u8) -> Option<NodeRef> {
        let child_index = self.lookup_child_index(key_fragment)?;
        let child = self.children[child_index].child();
        let num_children = self.header.num_children();

        // Copy all the child and key values in higher indices down by one.
        self.children
            .copy_within((child_index + 1)..num_children, child_index);
        self.keys
            .copy_within((child_index + 1)..num_children, child_index);
        self.children[num_children - 1] = RawRef::EMPTY;

        self.header.dec_num_children();
        Some(child)
    }

    /// Grows or shrinks the node
    fn change_block_size<const NEW_SIZE: usize>(&self) -> InnerNodeCompressed<NEW_SIZE>
    where
        InnerNodeCompressed<NEW_SIZE>: InnerNode,
    {
        assert!(
            self.header.num_children() <= NEW_SIZE,
            "Cannot change InnerNodeCompressed<{}> to size {} when it has more than {} children. \
             Currently has [{}] children.",
            SIZE,
            NEW_SIZE,
            NEW_SIZE,
            self.header.num_children()
        );

        let mut new_node = InnerNodeCompressed::<NEW_SIZE>::from_header(self.header);
        for (key, child) in self.iter_inner() {
            new_node.write_child(key, child);
        }
        new_node
    }

    /// Transform node into a [`InnerNode48`]
    fn grow_node48(&self) -> InnerNode48 {
        let mut node = InnerNode48::from_header(self.header);
        for (key, child) in self.iter_inner() {
            node.write_child(key, child);
        }
        node
    }

    /// Iterate over the children in key order.
    fn iter_inner(&self) -> impl DoubleEndedIterator<Item = (u8, NodeRef)> + '_ {
        let (_, children) = self.initialized_portion();
        self.key_bytes()
            .zip(children.iter().map(|child| child.child()))
    }
}

impl SearchInnerNodeCompressed for InnerNode4 {
    const KEY_MASK: u8 = 0;

    fn lookup_child_index(&self, key_fragment: u8) -> Option<usize> {
        let (keys, _) = self.initialized_portion();
        keys.iter().position(|key| *key == key_fragment)
    }

    fn find_write_point(&self, key_fragment: u8) -> WritePoint {
        let (keys, _) = self.initialized_portion();
        for (child_index, key) in keys.iter().enumerate() {
            if key_fragment == *key {
                return WritePoint::Existing(child_index);
            }
            if key_fragment < *key {
                return WritePoint::Shift(child_index);
            }
        }
        WritePoint::Last(keys.len())
    }
}

impl SearchInnerNodeCompressed for InnerNode16 {
    const KEY_MASK: u8 = 0x80;

    #[inline]
    fn lookup_child_index(&self, key_fragment: u8) -> Option<usize> {
        let matches = node16_search::equal_mask(
            &self.keys,
            key_fragment ^ Self::KEY_MASK,
            self.header.num_children(),
        );
        (matches != 0).then(|| matches.trailing_zeros() as usize)
    }

    fn find_write_point(&self, key_fragment: u8) -> WritePoint {
        if let Some(child_index) = self.lookup_child_index(key_fragment) {
            return WritePoint::Existing(child_index);
        }

        let num_children = self.header.num_children();
        let greater = node16_search::greater_mask(
            &self.keys,
            key_fragment ^ Self::KEY_MASK,
            num_children,
        );
        if greater == 0 {
            WritePoint::Last(num_children)
        } else {
            WritePoint::Shift(greater.trailing_zeros() as usize)
        }
    }
}

/// Search over the 16 sign-flipped keys of a Node16.
///
/// Both functions return a bitmask with bit `i` set for each live key
/// (`i < num_children`) that satisfies the comparison.
mod node16_search {
    #[cfg(target_arch = "x86_64")]
    mod imp {
        use core::arch::x86_64::{
            __m128i, _mm_cmpeq_epi8, _mm_cmplt_epi8, _mm_loadu_si128, _mm_movemask_epi8,
            _mm_set1_epi8,
        };

        fn live_mask(num_children: usize) -> u32 {
            (1u32 << num_children) - 1
        }

        #[inline]
        pub fn equal_mask(keys: &[u8; 16], needle: u8, num_children: usize) -> u32 {
            // SAFETY: SSE2 is part of the x86_64 baseline and `keys` is exactly 16
            // readable bytes
            let bits = unsafe {
                let keys = _mm_loadu_si128(keys.as_ptr().cast::<__m128i>());
                _mm_movemask_epi8(_mm_cmpeq_epi8(_mm_set1_epi8(needle as i8), keys))
            };
            bits as u32 & live_mask(num_children)
        }

        #[inline]
        pub fn greater_mask(keys: &[u8; 16], needle: u8, num_children: usize) -> u32 {
            // SAFETY: SSE2 is part of the x86_64 baseline and `keys` is exactly 16
            // readable bytes
            let bits = unsafe {
                let keys = _mm_loadu_si128(keys.as_ptr().cast::<__m128i>());
                _mm_movemask_epi8(_mm_cmplt_epi8(_mm_set1_epi8(needle as i8), keys))
            };
            bits as u32 & live_mask(num_children)
        }
    }

    #[cfg(target_arch = "x86_64")]
    pub use imp::{equal_mask, greater_mask};

    #[cfg_attr(target_arch = "x86_64", allow(dead_code))]
    pub mod scalar {
        pub fn equal_mask(keys: &[u8; 16], needle: u8, num_children: usize) -> u32 {
            mask_where(keys, num_children, |key| key == needle as i8)
        }

        pub fn greater_mask(keys: &[u8; 16], needle: u8, num_children: usize) -> u32 {
            mask_where(keys, num_children, |key| key > needle as i8)
        }

        fn mask_where(keys: &[u8; 16], num_children: usize, pred: impl Fn(i8) -> bool) -> u32 {
            keys[..num_children]
                .iter()
                .enumerate()
                .filter(|(_, key)| pred(**key as i8))
                .fold(0, |mask, (idx, _)| mask | (1 << idx))
        }
    }

    #[cfg(not(target_arch = "x86_64"))]
    pub use scalar::{equal_mask, greater_mask};
}

macro_rules! impl_compressed_inner_node {
    ($size:literal, $kind:expr, $grown:ty, $shrunk:ty, grow => $grow:expr, shrink => $shrink:expr) => {
        const _: () = assert!(
            core::mem::size_of::<InnerNodeCompressed<$size>>()
                == core::mem::size_of::<Header>() + $size + $size * core::mem::size_of::<RawRef>()
        );

        // SAFETY: Every field is `Pod` and the struct is `repr(C)`. The key array
        // length is a multiple of the alignment of `RawRef`, so there is no
        // padding, which the size assertion above checks.
        unsafe impl Zeroable for InnerNodeCompressed<$size> {}
        // SAFETY: See above
        unsafe impl Pod for InnerNodeCompressed<$size> {}

        impl InnerNode for InnerNodeCompressed<$size> {
            const KIND: NodeKind = $kind;
            type GrownNode = $grown;
            type ShrunkNode = $shrunk;

            fn from_header(header: Header) -> Self {
                Self::empty_with(header, Self::KIND)
            }

            fn header(&self) -> &Header {
                &self.header
            }

            fn header_mut(&mut self) -> &mut Header {
                &mut self.header
            }

            #[inline]
            fn lookup_child(&self, key_fragment: u8) -> Option<NodeRef> {
                let idx = self.lookup_child_index(key_fragment)?;
                Some(self.children[idx].child())
            }

            fn write_child(&mut self, key_fragment: u8, child: NodeRef) {
                self.write_child_inner(key_fragment, child)
            }

            fn remove_child(&mut self, key_fragment: u8) -> Option<NodeRef> {
                self.remove_child_inner(key_fragment)
            }

            fn grow(&self) -> Self::GrownNode {
                let grow: fn(&Self) -> Self::GrownNode = $grow;
                grow(self)
            }

            fn shrink(&self) -> Self::ShrunkNode {
                let shrink: fn(&Self) -> Self::ShrunkNode = $shrink;
                shrink(self)
            }

            fn iter(&self) -> impl DoubleEndedIterator<Item = (u8, NodeRef)> + '_ {
                self.iter_inner()
            }
        }
    };
}

impl_compressed_inner_node!(
    4,
    NodeKind::Node4,
    InnerNode16,
    InnerNode4,
    grow => |node| node.change_block_size::<16>(),
    shrink => |_| panic!("unable to shrink a Node4, something went wrong!")
);

impl_compressed_inner_node!(
    16,
    NodeKind::Node16,
    InnerNode48,
    InnerNode4,
    grow => |node| node.grow_node48(),
    shrink => |node| node.change_block_size::<4>()
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{alloc::SlotAddr, raw::LeafRef};

    fn leaf(row: u64) -> NodeRef {
        NodeRef::Leaf(LeafRef::Row(row))
    }

    #[test]
    fn node4_keeps_keys_sorted() {
        let mut node = InnerNode4::empty();
        for key in [200u8, 3, 100, 7] {
            node.write_child(key, leaf(u64::from(key)));
        }
        assert!(node.is_full());
        assert_eq!(node.initialized_portion().0, &[3, 7, 100, 200]);
        assert_eq!(node.lookup_child(100), Some(leaf(100)));
        assert_eq!(node.lookup_child(4), None);
        assert_eq!(node.min(), (3, leaf(3)));
        assert_eq!(node.max(), (200, leaf(200)));
    }

    #[test]
    fn write_existing_key_overwrites() {
        let mut node = InnerNode4::empty();
        node.write_child(1, leaf(1));
        node.write_child(2, leaf(2));
        let inner = NodeRef::Inner(crate::raw::NodeHandle::new(
            NodeKind::Node48,
            SlotAddr::new(3, 64),
        ));
        node.write_child(1, inner);
        assert_eq!(node.header.num_children(), 2);
        assert_eq!(node.lookup_child(1), Some(inner));
    }

    #[test]
    fn pod_views_cover_the_whole_node() {
        let mut node = InnerNode16::empty();
        node.write_child(9, leaf(9));

        let bytes = bytemuck::bytes_of(&node);
        assert_eq!(bytes.len(), core::mem::size_of::<InnerNode16>());
        let copy: &InnerNode16 = bytemuck::from_bytes(bytes);
        assert_eq!(copy.initialized_portion(), node.initialized_portion());

        let zeroed = InnerNode4::zeroed();
        assert_eq!(zeroed.initialized_portion(), (&[][..], &[][..]));
        assert_eq!(bytemuck::bytes_of(&zeroed).len(), core::mem::size_of::<InnerNode4>());
    }

    #[test]
    #[should_panic = "node is full"]
    fn node4_overflow_panics() {
        let mut node = InnerNode4::empty();
        for key in 0..5u8 {
            node.write_child(key, leaf(u64::from(key)));
        }
    }

    #[test]
    fn node16_orders_bytes_across_sign_bit() {
        let mut node = InnerNode16::empty();
        let keys = [0x80u8, 0x00, 0xFF, 0x7F, 0x81, 0x01, 0x40, 0xC0];
        for key in keys {
            node.write_child(key, leaf(u64::from(key)));
        }
        let mut sorted = keys;
        sorted.sort_unstable();
        assert_eq!(node.iter().map(|(key, _)| key).collect::<Vec<_>>(), sorted);
        for key in keys {
            assert_eq!(node.lookup_child(key), Some(leaf(u64::from(key))));
        }
        assert_eq!(node.lookup_child(0x02), None);
        assert_eq!(node.min().0, 0x00);
        assert_eq!(node.max().0, 0xFF);
    }

    #[test]
    fn node16_ignores_stale_keys_past_count() {
        let mut node = InnerNode16::empty();
        node.write_child(5, leaf(5));
        node.write_child(6, leaf(6));
        node.remove_child(6);
        assert_eq!(node.lookup_child(6), None);
        // zeroed key slots decode to 0x80 and must not match either
        assert_eq!(node.lookup_child(0x80), None);
    }

    #[test]
    fn scalar_search_agrees_with_vector_search() {
        let mut node = InnerNode16::empty();
        for key in (0..=255u8).step_by(17) {
            node.write_child(key, leaf(u64::from(key)));
        }
        let count = node.header.num_children();
        for needle in 0..=255u8 {
            let flipped = needle ^ 0x80;
            assert_eq!(
                node16_search::scalar::equal_mask(&node.keys, flipped, count),
                node16_search::equal_mask(&node.keys, flipped, count),
            );
            assert_eq!(
                node16_search::scalar::greater_mask(&node.keys, flipped, count),
                node16_search::greater_mask(&node.keys, flipped, count),
            );
        }
    }

    #[test]
    fn grow_node4_to_node16_and_back() {
        let mut node = InnerNode4::from_prefix(&[1, 2, 3], 3);
        for key in [9u8, 250, 128, 0] {
            node.write_child(key, leaf(u64::from(key)));
        }
        let grown = node.grow();
        assert_eq!(grown.header().kind(), NodeKind::Node16);
        assert_eq!(grown.header().read_prefix(), &[1, 2, 3]);
        assert_eq!(grown.iter().collect::<Vec<_>>(), node.iter().collect::<Vec<_>>());

        let shrunk = grown.shrink();
        assert_eq!(shrunk.header().kind(), NodeKind::Node4);
        assert_eq!(shrunk.initialized_portion().0, &[0, 9, 128, 250]);
    }

    #[test]
    fn grow_node16_to_node48() {
        let mut node = InnerNode16::from_prefix(&[7; 12], 12);
        for key in 0..16u8 {
            node.write_child(key * 16, leaf(u64::from(key)));
        }
        let grown = node.grow();
        assert_eq!(grown.header().kind(), NodeKind::Node48);
        assert_eq!(grown.header().prefix_len(), 12);
        assert_eq!(grown.header().num_children(), 16);
        for key in 0..16u8 {
            assert_eq!(grown.lookup_child(key * 16), Some(leaf(u64::from(key))));
        }
    }

    #[test]
    fn remove_shifts_children() {
        let mut node = InnerNode4::empty();
        for key in [1u8, 2, 3] {
            node.write_child(key, leaf(u64::from(key)));
        }
        assert_eq!(node.remove_child(2), Some(leaf(2)));
        assert_eq!(node.remove_child(2), None);
        assert_eq!(node.initialized_portion().0, &[1, 3]);
        assert_eq!(node.lookup_child(3), Some(leaf(3)));
    }
}
