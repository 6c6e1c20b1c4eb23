use crate::{
    alloc::{slot_stride, HeapPages, NodeAllocator, Page, PageSource, SlotAddr},
    raw::NodeKind,
    AllocError,
};

/// Bump allocator that carves node slots of every variant sequentially out
/// of the current page.
///
/// When the current page cannot fit the requested slot a new page is taken
/// from the [`PageSource`] and the bump offset is reset; the tail of the old
/// page is abandoned. Slots are never reused, except that the most recent
/// allocation can be handed back.
#[derive(Debug)]
pub struct BumpArena<S: PageSource = HeapPages> {
    source: S,
    pages: Vec<Page>,
    /// Bump offset inside the last page.
    offset: usize,
    allocated_bytes: usize,
}

impl<S: PageSource> BumpArena<S> {
    /// Create an arena and map its first page.
    ///
    /// The first page is requested eagerly so that an unavailable page size
    /// or NUMA node is reported here rather than on the first insert.
    pub fn new(source: S) -> Result<Self, AllocError> {
        let first = source.allocate_page(source.page_size())?;
        Ok(Self {
            source,
            pages: vec![first],
            offset: 0,
            allocated_bytes: 0,
        })
    }

    /// The page source backing this arena.
    pub fn source(&self) -> &S {
        &self.source
    }

    fn current_page_len(&self) -> usize {
        self.pages.last().map_or(0, Page::len)
    }

    fn page_index(&self) -> u32 {
        (self.pages.len() - 1) as u32
    }

    fn slot_range(kind: NodeKind, addr: SlotAddr) -> core::ops::Range<usize> {
        let start = addr.offset as usize;
        start..start + kind.slot_size()
    }
}

impl<S: PageSource> NodeAllocator for BumpArena<S> {
    fn allocate(&mut self, kind: NodeKind) -> Result<SlotAddr, AllocError> {
        let stride = slot_stride(kind);
        if self.offset + stride > self.current_page_len() {
            let page = self.source.allocate_page(stride)?;
            tracing::trace!(
                pages = self.pages.len() + 1,
                page_len = page.len(),
                "bump arena started a new page"
            );
            self.pages.push(page);
            self.offset = 0;
        }

        let addr = SlotAddr::new(self.page_index(), self.offset as u64);
        self.offset += stride;
        self.allocated_bytes += stride;
        Ok(addr)
    }

    fn release(&mut self, kind: NodeKind, addr: SlotAddr) -> bool {
        let stride = slot_stride(kind);
        if addr.page == self.page_index() && addr.offset as usize + stride == self.offset {
            self.offset -= stride;
            self.allocated_bytes -= stride;
            true
        } else {
            false
        }
    }

    fn slot(&self, kind: NodeKind, addr: SlotAddr) -> &[u8] {
        &self.pages[addr.page as usize].as_slice()[Self::slot_range(kind, addr)]
    }

    fn slot_mut(&mut self, kind: NodeKind, addr: SlotAddr) -> &mut [u8] {
        &mut self.pages[addr.page as usize].as_mut_slice()[Self::slot_range(kind, addr)]
    }

    fn num_pages(&self) -> usize {
        self.pages.len()
    }

    fn allocated_bytes(&self) -> usize {
        self.allocated_bytes
    }
}

impl<S: PageSource> Drop for BumpArena<S> {
    fn drop(&mut self) {
        for page in self.pages.drain(..) {
            // SAFETY: Every page came from `self.source`, and the arena is the
            // only owner of slot memory
            unsafe { self.source.release_page(page) };
        }
    }
}
