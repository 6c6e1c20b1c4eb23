use crate::raw::{Header, InnerNode, InnerNode16, InnerNode256, NodeKind, NodeRef, RawRef};
use bytemuck::{Pod, Zeroable};
use core::fmt;

/// Node that references between 17 and 48 children
#[derive(Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct InnerNode48 {
    /// The common node fields.
    pub header: Header,
    /// An array that maps key bytes (as the index) to the index value in
    /// the `children` array.
    ///
    /// Unused key bytes hold [`InnerNode48::EMPTY`].
    pub child_index: [u8; 256],
    /// Child slots. A slot is in use if some entry of `child_index` points to
    /// it, and unused slots hold [`RawRef::EMPTY`].
    pub children: [RawRef; 48],
}

const _: () = assert!(core::mem::size_of::<InnerNode48>() == 16 + 256 + 48 * 16);

impl InnerNode48 {
    /// A placeholder index value that indicates that the key byte has no
    /// child
    pub const EMPTY: u8 = 48;

    /// Return the child slot used by `key_fragment`, if any.
    #[inline]
    fn slot_of(&self, key_fragment: u8) -> Option<usize> {
        let idx = self.child_index[usize::from(key_fragment)];
        (idx != Self::EMPTY).then_some(usize::from(idx))
    }

    /// Find a child slot that is not in use.
    ///
    /// After removals the used slots are no longer a dense prefix, so the
    /// slot right after the last child is tried first and the array is
    /// scanned only when it is taken.
    fn free_slot(&self) -> usize {
        let num_children = self.header.num_children();
        if self.children[num_children].is_empty() {
            return num_children;
        }
        match self.children.iter().position(RawRef::is_empty) {
            Some(slot) => slot,
            None => panic!("InnerNode48 with [{num_children}] children has no free slot"),
        }
    }
}

impl fmt::Debug for InnerNode48 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InnerNode48")
            .field("header", &self.header)
            .field("children", &self.iter().collect::<Vec<_>>())
            .finish()
    }
}

impl InnerNode for InnerNode48 {
    const KIND: NodeKind = NodeKind::Node48;
    type GrownNode = InnerNode256;
    type ShrunkNode = InnerNode16;

    fn from_header(mut header: Header) -> Self {
        header.reset_for(Self::KIND);
        InnerNode48 {
            header,
            child_index: [Self::EMPTY; 256],
            children: [RawRef::EMPTY; 48],
        }
    }

    fn header(&self) -> &Header {
        &self.header
    }

    fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }

    #[inline]
    fn lookup_child(&self, key_fragment: u8) -> Option<NodeRef> {
        let slot = self.slot_of(key_fragment)?;
        Some(self.children[slot].child())
    }

    fn write_child(&mut self, key_fragment: u8, child: NodeRef) {
        let slot = match self.slot_of(key_fragment) {
            Some(slot) => slot,
            None => {
                assert!(!self.is_full(), "node is full");
                let slot = self.free_slot();
                self.child_index[usize::from(key_fragment)] = slot as u8;
                self.header.inc_num_children();
                slot
            },
        };
        self.children[slot] = RawRef::new(child);
    }

    fn remove_child(&mut self, key_fragment: u8) -> Option<NodeRef> {
        let slot = self.slot_of(key_fragment)?;
        let child = self.children[slot].child();
        self.children[slot] = RawRef::EMPTY;
        self.child_index[usize::from(key_fragment)] = Self::EMPTY;
        self.header.dec_num_children();
        Some(child)
    }

    fn grow(&self) -> Self::GrownNode {
        let mut node = InnerNode256::from_header(self.header);
        for (key_fragment, child) in self.iter() {
            node.write_child(key_fragment, child);
        }
        node
    }

    fn shrink(&self) -> Self::ShrunkNode {
        assert!(
            self.header.num_children() <= NodeKind::Node16.upper_capacity(),
            "Cannot shrink a Node48 when it has more than 16 children. Currently has [{}] \
             children.",
            self.header.num_children()
        );

        let mut node = InnerNode16::from_header(self.header);
        for (key_fragment, child) in self.iter() {
            node.write_child(key_fragment, child);
        }
        node
    }

    fn iter(&self) -> impl DoubleEndedIterator<Item = (u8, NodeRef)> + '_ {
        (0..=u8::MAX).filter_map(move |key_fragment| {
            self.slot_of(key_fragment)
                .map(|slot| (key_fragment, self.children[slot].child()))
        })
    }
}
