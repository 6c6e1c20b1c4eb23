use crate::raw::{Header, InnerNode, InnerNode48, NodeKind, NodeRef, RawRef};
use bytemuck::{Pod, Zeroable};
use core::fmt;

/// Node that references between 49 and 256 children
#[derive(Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct InnerNode256 {
    /// The common node fields.
    pub header: Header,
    /// An array that directly maps a key byte (as index) to a child node.
    pub children: [RawRef; 256],
}

const _: () = assert!(core::mem::size_of::<InnerNode256>() == 16 + 256 * 16);

impl fmt::Debug for InnerNode256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InnerNode256")
            .field("header", &self.header)
            .field("children", &self.iter().collect::<Vec<_>>())
            .finish()
    }
}

impl InnerNode for InnerNode256 {
    const KIND: NodeKind = NodeKind::Node256;
    type GrownNode = Self;
    type ShrunkNode = InnerNode48;

    fn from_header(mut header: Header) -> Self {
        header.reset_for(Self::KIND);
        InnerNode256 {
            header,
            children: [RawRef::EMPTY; 256],
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
        self.children[usize::from(key_fragment)].get()
    }

    fn write_child(&mut self, key_fragment: u8, child: NodeRef) {
        let slot = &mut self.children[usize::from(key_fragment)];
        if slot.is_empty() {
            self.header.inc_num_children();
        }
        *slot = RawRef::new(child);
    }

    fn remove_child(&mut self, key_fragment: u8) -> Option<NodeRef> {
        let slot = &mut self.children[usize::from(key_fragment)];
        let child = slot.get()?;
        *slot = RawRef::EMPTY;
        self.header.dec_num_children();
        Some(child)
    }

    fn grow(&self) -> Self::GrownNode {
        panic!("unable to grow a Node256, something went wrong!")
    }

    fn shrink(&self) -> Self::ShrunkNode {
        assert!(
            self.header.num_children() <= NodeKind::Node48.upper_capacity(),
            "Cannot shrink a Node256 when it has more than 48 children. Currently has [{}] \
             children.",
            self.header.num_children()
        );

        let mut node = InnerNode48::from_header(self.header);
        for (key_fragment, child) in self.iter() {
            node.write_child(key_fragment, child);
        }
        node
    }

    fn iter(&self) -> impl DoubleEndedIterator<Item = (u8, NodeRef)> + '_ {
        (0..=u8::MAX).filter_map(move |key_fragment| {
            self.children[usize::from(key_fragment)]
                .get()
                .map(|child| (key_fragment, child))
        })
    }
}
