//! Memory arenas that hold the inner nodes of a tree.
//!
//! An arena hands out address-stable, fixed-size slots for each node variant
//! and reclaims memory only when it is dropped as a whole. Slots are named by
//! [`SlotAddr`] values rather than raw pointers, and nodes are read and written
//! in place as plain-old-data views of the slot bytes.

use crate::{raw::NodeKind, AllocError};
use allocator_api2::alloc::Layout;
use core::ptr::NonNull;

pub use allocator_api2::alloc::{Allocator, Global};

mod bump;
pub use bump::*;

mod huge_page;
pub use huge_page::*;

mod page;
pub use page::*;

mod pool;
pub use pool::*;

/// Alignment of every slot handed out by the arenas in this module.
pub const SLOT_ALIGN: usize = 8;

/// Location of a node slot inside an arena.
///
/// The meaning of `page` is private to the arena that produced the address: a
/// [`BumpArena`] numbers its pages, a [`PoolArena`] numbers the chunks of the
/// pool for the node variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotAddr {
    /// Index of the page or chunk holding the slot.
    pub page: u32,
    /// Byte offset of the slot inside its page.
    ///
    /// Pages may be larger than 4 GiB, so the offset is kept at full width.
    pub offset: u64,
}

impl SlotAddr {
    /// Create a new slot address.
    pub const fn new(page: u32, offset: u64) -> Self {
        Self { page, offset }
    }
}

/// Source of node storage used by a tree.
///
/// Each call to [`allocate`](NodeAllocator::allocate) returns a slot of exactly
/// [`NodeKind::slot_size`] bytes, aligned to [`SLOT_ALIGN`], whose address stays
/// valid until the arena is dropped.
pub trait NodeAllocator {
    /// Reserve a slot for a node of the given variant.
    fn allocate(&mut self, kind: NodeKind) -> Result<SlotAddr, AllocError>;

    /// Give back a slot.
    ///
    /// Only the most recently allocated slot can be reclaimed. Returns `false`
    /// and leaves the slot abandoned in place for any other address.
    fn release(&mut self, kind: NodeKind, addr: SlotAddr) -> bool;

    /// The bytes of a previously allocated slot.
    ///
    /// # Panics
    ///  - Panics if `addr` was not produced by this arena for `kind`.
    fn slot(&self, kind: NodeKind, addr: SlotAddr) -> &[u8];

    /// The bytes of a previously allocated slot, mutably.
    ///
    /// # Panics
    ///  - Panics if `addr` was not produced by this arena for `kind`.
    fn slot_mut(&mut self, kind: NodeKind, addr: SlotAddr) -> &mut [u8];

    /// Number of pages (or chunks) currently owned by the arena.
    fn num_pages(&self) -> usize;

    /// Number of bytes handed out as slots, including abandoned ones.
    fn allocated_bytes(&self) -> usize;
}

/// Size of `kind`'s slot rounded up to the slot alignment.
#[inline]
pub(crate) const fn slot_stride(kind: NodeKind) -> usize {
    kind.slot_size().next_multiple_of(SLOT_ALIGN)
}

/// Allocate a zeroed block that fits the given layout using the given
/// allocator.
pub(crate) fn do_alloc_zeroed<A: Allocator>(
    alloc: &A,
    layout: Layout,
) -> Result<NonNull<u8>, AllocError> {
    match alloc.allocate_zeroed(layout) {
        Ok(ptr) => Ok(ptr.cast()),
        Err(_) => Err(AllocError::OutOfMemory {
            len: layout.size(),
        }),
    }
}
