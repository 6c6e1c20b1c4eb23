//! Header shared by every inner node

use crate::raw::NodeKind;
use bytemuck::{Pod, Zeroable};
use core::fmt::{self, Debug};

/// Number of compressed path bytes stored inline in a [`Header`].
///
/// Longer prefixes keep only their length and first bytes; the remainder is
/// recovered from the key of any leaf below the node.
pub const PREFIX_LEN: usize = 9;

/// The common header for all inner nodes
#[derive(Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct Header {
    /// Number of bytes used by the prefix, which may exceed [`PREFIX_LEN`].
    prefix_len: u32,
    /// Number of children of this inner node.
    ///
    /// This needs to be a [`u16`], since a node 256 can hold up to 256 children
    /// if this was a [`u8`] (0-255) it would overflow when adding the last
    /// element
    num_children: u16,
    /// Discriminant of the node kind, see [`NodeKind`].
    kind: u8,
    /// The key prefix for this node.
    prefix: [u8; PREFIX_LEN],
}

impl Header {
    /// Create a header holding up to [`PREFIX_LEN`] bytes of `prefix` inline
    /// for a compressed path of `prefix_len` bytes.
    #[inline]
    pub fn new(prefix: &[u8], prefix_len: usize) -> Self {
        let mut header = Self::empty();
        header.set_prefix(prefix, prefix_len);
        header
    }

    /// Create a new `Header` for an empty node.
    #[inline]
    pub fn empty() -> Self {
        Self::zeroed()
    }

    /// The kind stamped into this header.
    ///
    /// # Panics
    ///  - Panics if the stored discriminant is not a node kind.
    #[inline]
    pub fn kind(&self) -> NodeKind {
        match NodeKind::from_u8(self.kind) {
            Some(kind) => kind,
            None => panic!("corrupted node header with kind [{}]", self.kind),
        }
    }

    /// Stamp the header with the node kind and reset the child count.
    #[inline]
    pub(crate) fn reset_for(&mut self, kind: NodeKind) {
        self.kind = kind as u8;
        self.num_children = 0;
    }

    /// Read the initialized portion of the prefix present in the header.
    #[inline]
    pub fn read_prefix(&self) -> &[u8] {
        &self.prefix[0..self.capped_prefix_len()]
    }

    /// Get the number of bytes in the prefix.
    #[inline]
    pub fn prefix_len(&self) -> usize {
        self.prefix_len as usize
    }

    /// Minimum between [`Self::prefix_len`] and [`PREFIX_LEN`].
    #[inline]
    pub fn capped_prefix_len(&self) -> usize {
        (self.prefix_len as usize).min(PREFIX_LEN)
    }

    /// Returns true if part of the prefix is only recoverable from a leaf.
    #[inline]
    pub fn has_implicit_bytes(&self) -> bool {
        self.prefix_len() > PREFIX_LEN
    }

    /// Return the number of children of this node.
    #[inline]
    pub fn num_children(&self) -> usize {
        usize::from(self.num_children)
    }

    /// Replace the prefix with `prefix_len` bytes whose first bytes are read
    /// from `bytes`.
    ///
    /// # Panics
    ///  - Panics if `bytes` is shorter than the inline portion of the new
    ///    prefix.
    #[inline]
    pub fn set_prefix(&mut self, bytes: &[u8], prefix_len: usize) {
        self.prefix_len = prefix_len as u32;
        let capped = self.capped_prefix_len();
        self.prefix[..capped].copy_from_slice(&bytes[..capped]);
    }

    /// Left trim by `len`, copies the remaining data to the beginning of the
    /// prefix
    ///
    /// Only valid while the whole prefix is stored inline.
    ///
    /// # Panics
    ///  - If `len` > length of the prefix
    #[inline]
    pub fn ltrim_by(&mut self, len: usize) {
        assert!(
            (len as u32) <= self.prefix_len,
            "given length [{len}] must be less than or equal to the prefix length [{}]",
            self.prefix_len
        );
        debug_assert!(!self.has_implicit_bytes());
        self.prefix_len -= len as u32;

        let begin = len;
        let end = begin + self.capped_prefix_len();
        self.prefix.copy_within(begin..end, 0);
    }

    /// Left trim by `len`, refilling the inline prefix from the key of a leaf
    /// below this node.
    ///
    /// `leaf_key` must be the leaf key starting at the depth of this node.
    ///
    /// # Panics
    ///  - If `len` > length of the prefix
    #[inline]
    pub fn ltrim_by_with_key(&mut self, len: usize, leaf_key: &[u8]) {
        assert!(
            (len as u32) <= self.prefix_len,
            "given length [{len}] must be less than or equal to the prefix length [{}]",
            self.prefix_len
        );
        let remaining = self.prefix_len() - len;
        self.set_prefix(&leaf_key[len..], remaining);
    }

    /// Increments the number of children
    #[inline]
    pub fn inc_num_children(&mut self) {
        self.num_children += 1;
    }

    /// Decrements the number of children
    #[inline]
    pub fn dec_num_children(&mut self) {
        self.num_children -= 1;
    }
}

impl Debug for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Header")
            .field("kind", &NodeKind::from_u8(self.kind))
            .field("num_children", &self.num_children)
            .field("prefix_len", &self.prefix_len)
            .field("prefix", &self.read_prefix())
            .finish()
    }
}
