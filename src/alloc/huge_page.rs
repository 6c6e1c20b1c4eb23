use crate::{
    alloc::{page::round_to_pages, Page, PageSource},
    AllocError,
};

/// Page sizes that a [`HugePages`] source can map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HugePageSize {
    /// Regular 2 MiB mappings advised as transparent huge pages.
    Transparent,
    /// Explicit 2 MiB huge pages.
    Size2M,
    /// Explicit 16 MiB huge pages.
    Size16M,
    /// Explicit 1 GiB huge pages.
    Size1G,
    /// Explicit 16 GiB huge pages.
    Size16G,
}

impl HugePageSize {
    /// Base-2 logarithm of the page size.
    pub const fn shift(self) -> u32 {
        match self {
            HugePageSize::Transparent | HugePageSize::Size2M => 21,
            HugePageSize::Size16M => 24,
            HugePageSize::Size1G => 30,
            HugePageSize::Size16G => 34,
        }
    }

    /// Page size in bytes.
    pub fn bytes(self) -> usize {
        1usize << self.shift()
    }
}

/// Pages mapped anonymously from the kernel, backed by huge pages and
/// optionally pinned to one NUMA node.
///
/// Every failure is reported as an [`AllocError`]; the source never falls
/// back to a smaller page size or another node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HugePages {
    size: HugePageSize,
    numa_node: Option<u32>,
}

impl HugePages {
    /// Huge pages of the given size on any node.
    pub const fn new(size: HugePageSize) -> Self {
        Self {
            size,
            numa_node: None,
        }
    }

    /// Bind every page to `node`.
    pub const fn on_numa_node(mut self, node: u32) -> Self {
        self.numa_node = Some(node);
        self
    }

    /// The configured page size.
    pub const fn size(&self) -> HugePageSize {
        self.size
    }

    /// The NUMA node pages are bound to, if any.
    pub const fn numa_node(&self) -> Option<u32> {
        self.numa_node
    }
}

impl PageSource for HugePages {
    fn page_size(&self) -> usize {
        self.size.bytes()
    }

    fn allocate_page(&self, min_len: usize) -> Result<Page, AllocError> {
        let len = round_to_pages(min_len, self.page_size());
        sys::map(len, self.size, self.numa_node)
    }

    unsafe fn release_page(&self, page: Page) {
        // SAFETY: Covered by the caller contract, the page was mapped by `sys::map`
        unsafe { sys::unmap(page) }
    }
}

#[cfg(target_os = "linux")]
mod sys {
    use super::HugePageSize;
    use crate::{alloc::Page, AllocError};
    use core::ptr::{self, NonNull};
    use std::{fs, io};

    /// `MPOL_BIND` from `<linux/mempolicy.h>`.
    const MPOL_BIND: libc::c_int = 2;
    /// `MPOL_MF_STRICT` from `<linux/mempolicy.h>`.
    const MPOL_MF_STRICT: libc::c_uint = 1;
    /// Number of `c_ulong` words in the node mask passed to `mbind`.
    const NODE_MASK_WORDS: usize = 16;

    pub(super) fn map(
        len: usize,
        size: HugePageSize,
        numa_node: Option<u32>,
    ) -> Result<Page, AllocError> {
        if let Some(node) = numa_node {
            if !numa_node_allowed(node) {
                return Err(AllocError::NumaNodeUnavailable { node });
            }
        }

        let mut flags = libc::MAP_PRIVATE | libc::MAP_ANONYMOUS;
        if size != HugePageSize::Transparent {
            flags |= libc::MAP_HUGETLB | ((size.shift() as libc::c_int) << libc::MAP_HUGE_SHIFT);
        }

        // SAFETY: Anonymous mapping with no address hint, no file descriptor involved
        let addr = unsafe {
            libc::mmap(
                ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                flags,
                -1,
                0,
            )
        };
        if addr == libc::MAP_FAILED {
            return Err(AllocError::Map {
                len,
                source: io::Error::last_os_error(),
            });
        }
        let Some(ptr) = NonNull::new(addr.cast::<u8>()) else {
            return Err(AllocError::Map {
                len,
                source: io::Error::from_raw_os_error(libc::EFAULT),
            });
        };
        // SAFETY: The mapping is `len` bytes of zeroed memory only reachable from here
        let page = unsafe { Page::from_raw_parts(ptr, len) };

        if size == HugePageSize::Transparent {
            // SAFETY: The range is exactly the mapping created above
            if unsafe { libc::madvise(addr, len, libc::MADV_HUGEPAGE) } != 0 {
                let source = io::Error::last_os_error();
                // SAFETY: The page is not referenced anywhere else yet
                unsafe { unmap(page) };
                return Err(AllocError::Advise { source });
            }
        }

        if let Some(node) = numa_node {
            if let Err(source) = bind(addr, len, node) {
                // SAFETY: The page is not referenced anywhere else yet
                unsafe { unmap(page) };
                return Err(AllocError::NumaBind { node, source });
            }
        }

        tracing::debug!(len, ?size, ?numa_node, "mapped huge page");
        Ok(page)
    }

    /// # Safety
    ///  - `page` must have been created by [`map`] and not be referenced
    ///    afterwards.
    pub(super) unsafe fn unmap(page: Page) {
        // SAFETY: Covered by the caller contract
        let rc = unsafe { libc::munmap(page.as_ptr().as_ptr().cast(), page.len()) };
        if rc != 0 {
            tracing::warn!(
                len = page.len(),
                error = %io::Error::last_os_error(),
                "failed to unmap huge page"
            );
        }
    }

    fn bind(addr: *mut libc::c_void, len: usize, node: u32) -> io::Result<()> {
        let mut mask = [0 as libc::c_ulong; NODE_MASK_WORDS];
        let bits = libc::c_ulong::BITS as usize;
        mask[node as usize / bits] |= 1 << (node as usize % bits);

        // SAFETY: `addr..addr + len` is a live mapping and the mask is large enough
        // for the advertised number of nodes
        let rc = unsafe {
            libc::syscall(
                libc::SYS_mbind,
                addr,
                len as libc::c_ulong,
                MPOL_BIND,
                mask.as_ptr(),
                (NODE_MASK_WORDS * bits) as libc::c_ulong,
                MPOL_MF_STRICT,
            )
        };
        if rc == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }

    fn numa_node_allowed(node: u32) -> bool {
        if node as usize >= NODE_MASK_WORDS * libc::c_ulong::BITS as usize {
            return false;
        }

        fs::read_to_string("/proc/self/status")
            .ok()
            .and_then(|status| {
                status
                    .lines()
                    .find_map(|line| line.strip_prefix("Mems_allowed_list:"))
                    .map(|list| super::node_list_contains(list.trim(), node))
            })
            .unwrap_or(false)
    }
}

#[cfg(not(target_os = "linux"))]
mod sys {
    use super::HugePageSize;
    use crate::{alloc::Page, AllocError};

    pub(super) fn map(
        _len: usize,
        _size: HugePageSize,
        _numa_node: Option<u32>,
    ) -> Result<Page, AllocError> {
        Err(AllocError::Unsupported("huge page mapping"))
    }

    pub(super) unsafe fn unmap(_page: Page) {}
}

/// Test `node` against a kernel node list such as `0-3,8,10-11`.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn node_list_contains(list: &str, node: u32) -> bool {
    list.split(',').filter(|part| !part.is_empty()).any(|part| {
        let (start, end) = part.split_once('-').unwrap_or((part, part));
        match (start.trim().parse::<u32>(), end.trim().parse::<u32>()) {
            (Ok(start), Ok(end)) => (start..=end).contains(&node),
            _ => false,
        }
    })
}
