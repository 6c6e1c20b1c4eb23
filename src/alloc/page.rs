use crate::{
    alloc::{do_alloc_zeroed, Allocator, Global},
    AllocError,
};
use allocator_api2::alloc::Layout;
use core::{fmt, ptr::NonNull, slice};

/// Default size of a page handed out by [`HeapPages`].
pub const DEFAULT_PAGE_SIZE: usize = 2 * 1024 * 1024;

/// Alignment of every heap page.
pub const PAGE_ALIGN: usize = 4096;

/// A zero-initialised block of memory owned by an arena.
///
/// A `Page` does not free itself; it must be handed back to the
/// [`PageSource`] that produced it.
pub struct Page {
    ptr: NonNull<u8>,
    len: usize,
}

impl Page {
    /// Wrap a raw block of memory.
    ///
    /// # Safety
    ///  - `ptr` must be valid for reads and writes of `len` bytes, and those
    ///    bytes must be initialised.
    ///  - The memory must not be accessed through any other pointer while the
    ///    `Page` exists.
    pub unsafe fn from_raw_parts(ptr: NonNull<u8>, len: usize) -> Self {
        Self { ptr, len }
    }

    /// Size of the page in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the page has no bytes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Start of the page.
    #[inline]
    pub fn as_ptr(&self) -> NonNull<u8> {
        self.ptr
    }

    /// View the whole page.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: `from_raw_parts` requires the block to be valid, initialised and
        // exclusively owned by this page
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    /// View the whole page mutably.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: Same as `as_slice`, and `&mut self` guarantees exclusivity
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .finish()
    }
}

/// Supplier of coarse, zero-initialised pages to an arena.
pub trait PageSource {
    /// The preferred page size. Every page is a multiple of it.
    fn page_size(&self) -> usize;

    /// Obtain a zeroed page of at least `min_len` bytes.
    fn allocate_page(&self, min_len: usize) -> Result<Page, AllocError>;

    /// Return a page to the source.
    ///
    /// # Safety
    ///  - `page` must have been returned by [`PageSource::allocate_page`] on
    ///    this same source, and nothing may reference its memory afterwards.
    unsafe fn release_page(&self, page: Page);
}

/// Round `min_len` up to a whole number of `page_size` pages, at least one.
#[inline]
pub(crate) fn round_to_pages(min_len: usize, page_size: usize) -> usize {
    min_len.max(1).div_ceil(page_size) * page_size
}

/// Pages taken from an [`Allocator`], the global heap by default.
#[derive(Debug, Clone)]
pub struct HeapPages<A: Allocator = Global> {
    alloc: A,
    page_size: usize,
}

impl HeapPages {
    /// Heap pages of [`DEFAULT_PAGE_SIZE`] bytes.
    pub fn new() -> Self {
        Self::new_in(Global)
    }

    /// Heap pages of `page_size` bytes.
    ///
    /// # Panics
    ///  - Panics if `page_size` is zero.
    pub fn with_page_size(page_size: usize) -> Self {
        Self::with_page_size_in(page_size, Global)
    }
}

impl Default for HeapPages {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Allocator> HeapPages<A> {
    /// Pages of [`DEFAULT_PAGE_SIZE`] bytes from the given allocator.
    pub fn new_in(alloc: A) -> Self {
        Self::with_page_size_in(DEFAULT_PAGE_SIZE, alloc)
    }

    /// Pages of `page_size` bytes from the given allocator.
    ///
    /// # Panics
    ///  - Panics if `page_size` is zero.
    pub fn with_page_size_in(page_size: usize, alloc: A) -> Self {
        assert!(page_size > 0, "page size must be non-zero");
        Self { alloc, page_size }
    }

    fn layout(len: usize) -> Result<Layout, AllocError> {
        Layout::from_size_align(len, PAGE_ALIGN).map_err(|_| AllocError::OutOfMemory { len })
    }
}

impl<A: Allocator> PageSource for HeapPages<A> {
    fn page_size(&self) -> usize {
        self.page_size
    }

    fn allocate_page(&self, min_len: usize) -> Result<Page, AllocError> {
        let len = round_to_pages(min_len, self.page_size);
        let ptr = do_alloc_zeroed(&self.alloc, Self::layout(len)?)?;
        tracing::trace!(len, "allocated heap page");

        // SAFETY: The block was just allocated with `len` zeroed bytes and is only
        // reachable through the returned page
        Ok(unsafe { Page::from_raw_parts(ptr, len) })
    }

    unsafe fn release_page(&self, page: Page) {
        // The layout was accepted when the page was allocated
        if let Ok(layout) = Self::layout(page.len()) {
            // SAFETY: Covered by the caller contract, the page came from this
            // allocator with this layout
            unsafe { self.alloc.deallocate(page.as_ptr(), layout) };
        }
    }
}
