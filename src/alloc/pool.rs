use crate::{
    alloc::{do_alloc_zeroed, slot_stride, Allocator, Global, NodeAllocator, Page, SlotAddr, SLOT_ALIGN},
    raw::NodeKind,
    AllocError,
};
use allocator_api2::alloc::Layout;

/// Size of the first chunk of every [`Pool`].
pub const INITIAL_CHUNK_LEN: usize = 4096 * 4;

/// Slab of equally sized slots carved out of a chain of chunks.
///
/// Each chunk is twice as large as the previous one and is filled by bumping
/// an offset. Only the most recently handed out slot can be given back.
#[derive(Debug)]
pub struct Pool {
    stride: usize,
    chunks: Vec<Page>,
    /// Bump offset inside the last chunk.
    used: usize,
    next_chunk_len: usize,
    allocated_bytes: usize,
}

impl Pool {
    /// An empty pool of `stride` byte slots. No memory is taken until the
    /// first allocation.
    ///
    /// # Panics
    ///  - Panics if `stride` is zero or not a multiple of [`SLOT_ALIGN`].
    pub fn new(stride: usize) -> Self {
        assert!(
            stride > 0 && stride % SLOT_ALIGN == 0,
            "slot stride [{stride}] must be a non-zero multiple of [{SLOT_ALIGN}]"
        );
        Self {
            stride,
            chunks: Vec::new(),
            used: 0,
            next_chunk_len: INITIAL_CHUNK_LEN.max(stride),
            allocated_bytes: 0,
        }
    }

    /// Size of each slot.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Number of chunks currently owned.
    pub fn num_chunks(&self) -> usize {
        self.chunks.len()
    }

    fn chunk_layout(len: usize) -> Result<Layout, AllocError> {
        Layout::from_size_align(len, SLOT_ALIGN).map_err(|_| AllocError::OutOfMemory { len })
    }

    /// Reserve one slot, growing the chunk chain if needed.
    pub fn allocate<A: Allocator>(&mut self, alloc: &A) -> Result<SlotAddr, AllocError> {
        let current_len = self.chunks.last().map_or(0, Page::len);
        if self.used + self.stride > current_len {
            let len = self.next_chunk_len;
            let ptr = do_alloc_zeroed(alloc, Self::chunk_layout(len)?)?;
            // SAFETY: The chunk was just allocated with `len` zeroed bytes
            self.chunks.push(unsafe { Page::from_raw_parts(ptr, len) });
            self.used = 0;
            self.next_chunk_len = len.saturating_mul(2);
            tracing::trace!(
                stride = self.stride,
                chunks = self.chunks.len(),
                chunk_len = len,
                "pool grew a new chunk"
            );
        }

        let addr = SlotAddr::new((self.chunks.len() - 1) as u32, self.used as u64);
        self.used += self.stride;
        self.allocated_bytes += self.stride;
        Ok(addr)
    }

    /// Give back the most recently allocated slot.
    pub fn release(&mut self, addr: SlotAddr) -> bool {
        let is_last = !self.chunks.is_empty()
            && addr.page as usize == self.chunks.len() - 1
            && addr.offset as usize + self.stride == self.used;
        if is_last {
            self.used -= self.stride;
            self.allocated_bytes -= self.stride;
        }
        is_last
    }

    fn slot(&self, addr: SlotAddr, len: usize) -> &[u8] {
        let start = addr.offset as usize;
        &self.chunks[addr.page as usize].as_slice()[start..start + len]
    }

    fn slot_mut(&mut self, addr: SlotAddr, len: usize) -> &mut [u8] {
        let start = addr.offset as usize;
        &mut self.chunks[addr.page as usize].as_mut_slice()[start..start + len]
    }

    /// Free every chunk.
    ///
    /// # Safety
    ///  - Every chunk must have been allocated from `alloc`.
    unsafe fn release_chunks<A: Allocator>(&mut self, alloc: &A) {
        for chunk in self.chunks.drain(..) {
            if let Ok(layout) = Self::chunk_layout(chunk.len()) {
                // SAFETY: Covered by the caller contract
                unsafe { alloc.deallocate(chunk.as_ptr(), layout) };
            }
        }
        self.used = 0;
    }
}

/// Arena keeping one [`Pool`] per node variant.
///
/// Slots of a variant are packed densely next to each other, which keeps
/// nodes of the same size together at the cost of one chunk chain per
/// variant.
#[derive(Debug)]
pub struct PoolArena<A: Allocator = Global> {
    alloc: A,
    pools: [Pool; NodeKind::ALL.len()],
}

impl PoolArena {
    /// Pool arena backed by the global heap.
    pub fn new() -> Self {
        Self::new_in(Global)
    }
}

impl Default for PoolArena {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Allocator> PoolArena<A> {
    /// Pool arena backed by the given allocator.
    pub fn new_in(alloc: A) -> Self {
        Self {
            alloc,
            pools: NodeKind::ALL.map(|kind| Pool::new(slot_stride(kind))),
        }
    }

    /// The pool serving the given variant.
    pub fn pool(&self, kind: NodeKind) -> &Pool {
        &self.pools[kind.index()]
    }
}

impl<A: Allocator> NodeAllocator for PoolArena<A> {
    fn allocate(&mut self, kind: NodeKind) -> Result<SlotAddr, AllocError> {
        self.pools[kind.index()].allocate(&self.alloc)
    }

    fn release(&mut self, kind: NodeKind, addr: SlotAddr) -> bool {
        self.pools[kind.index()].release(addr)
    }

    fn slot(&self, kind: NodeKind, addr: SlotAddr) -> &[u8] {
        self.pools[kind.index()].slot(addr, kind.slot_size())
    }

    fn slot_mut(&mut self, kind: NodeKind, addr: SlotAddr) -> &mut [u8] {
        self.pools[kind.index()].slot_mut(addr, kind.slot_size())
    }

    fn num_pages(&self) -> usize {
        self.pools.iter().map(Pool::num_chunks).sum()
    }

    fn allocated_bytes(&self) -> usize {
        self.pools.iter().map(|pool| pool.allocated_bytes).sum()
    }
}

impl<A: Allocator> Drop for PoolArena<A> {
    fn drop(&mut self) {
        for pool in &mut self.pools {
            // SAFETY: Every chunk of every pool came from `self.alloc`
            unsafe { pool.release_chunks(&self.alloc) };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_is_lazy() {
        let arena = PoolArena::new();
        assert_eq!(arena.num_pages(), 0);
        assert_eq!(arena.allocated_bytes(), 0);
    }

    #[test]
    fn chunks_double_in_size() {
        let mut pool = Pool::new(4096);
        let mut addrs = Vec::new();
        // 4 slots in the first chunk, 8 in the second
        for _ in 0..13 {
            addrs.push(pool.allocate(&Global).unwrap());
        }
        assert_eq!(pool.num_chunks(), 3);
        assert_eq!(addrs[3], SlotAddr::new(0, 3 * 4096));
        assert_eq!(addrs[4], SlotAddr::new(1, 0));
        assert_eq!(addrs[11], SlotAddr::new(1, 7 * 4096));
        assert_eq!(addrs[12], SlotAddr::new(2, 0));
        unsafe { pool.release_chunks(&Global) };
    }

    #[test]
    fn variants_use_separate_pools() {
        let mut arena = PoolArena::new();
        let a = arena.allocate(NodeKind::Node4).unwrap();
        let b = arena.allocate(NodeKind::Node256).unwrap();
        let c = arena.allocate(NodeKind::Node4).unwrap();

        assert_eq!(a, SlotAddr::new(0, 0));
        assert_eq!(b, SlotAddr::new(0, 0));
        assert_eq!(c.offset as usize, slot_stride(NodeKind::Node4));
        assert_eq!(arena.num_pages(), 2);
        assert_eq!(arena.pool(NodeKind::Node4).stride(), slot_stride(NodeKind::Node4));
    }

    #[test]
    fn release_last_slot_only() {
        let mut arena = PoolArena::new();
        let a = arena.allocate(NodeKind::Node16).unwrap();
        let b = arena.allocate(NodeKind::Node16).unwrap();
        assert!(!arena.release(NodeKind::Node16, a));
        assert!(!arena.release(NodeKind::Node4, b));
        assert!(arena.release(NodeKind::Node16, b));
        assert_eq!(arena.allocate(NodeKind::Node16).unwrap(), b);
    }

    #[test]
    fn slots_from_bump_allocator() {
        let bump = bumpalo::Bump::new();
        let mut arena = PoolArena::new_in(&bump);
        let addr = arena.allocate(NodeKind::Node48).unwrap();
        arena.slot_mut(NodeKind::Node48, addr)[0] = 1;
        assert_eq!(arena.slot(NodeKind::Node48, addr)[0], 1);
    }
}
