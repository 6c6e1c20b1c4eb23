//! Error types returned by the index and its arenas.

use std::io;

/// Failure to obtain memory for tree nodes.
///
/// None of these are recoverable inside the index: there is no fallback to a
/// smaller page size or another NUMA node.
#[derive(Debug, thiserror::Error)]
pub enum AllocError {
    /// The backing allocator refused a request.
    #[error("out of memory while allocating [{len}] bytes")]
    OutOfMemory {
        /// Size of the refused request.
        len: usize,
    },
    /// An anonymous mapping could not be created, for example because the
    /// host has no huge pages of the requested size reserved.
    #[error("failed to map [{len}] bytes of anonymous memory")]
    Map {
        /// Size of the refused mapping.
        len: usize,
        /// The OS error reported by `mmap`.
        #[source]
        source: io::Error,
    },
    /// `madvise` rejected the transparent huge page hint.
    #[error("failed to enable transparent huge pages on a mapping")]
    Advise {
        /// The OS error reported by `madvise`.
        #[source]
        source: io::Error,
    },
    /// The requested NUMA node is not in the set of nodes this process may
    /// allocate from.
    #[error("NUMA node [{node}] is not available to this process")]
    NumaNodeUnavailable {
        /// The requested node.
        node: u32,
    },
    /// `mbind` refused to pin a mapping to the requested node.
    #[error("failed to bind memory to NUMA node [{node}]")]
    NumaBind {
        /// The requested node.
        node: u32,
        /// The OS error reported by `mbind`.
        #[source]
        source: io::Error,
    },
    /// The page source cannot work on this platform.
    #[error("{0} is not supported on this platform")]
    Unsupported(&'static str),
}

/// Errors surfaced by the fallible [`ArtIndex`](crate::ArtIndex) operations.
#[derive(Debug, thiserror::Error)]
pub enum ArtError {
    /// The node arena could not supply memory.
    #[error(transparent)]
    Alloc(#[from] AllocError),
    /// A key did not have the length the index was configured with.
    #[error("key has length [{actual}] but the index expects keys of length [{expected}]")]
    KeyLength {
        /// Configured key length.
        expected: usize,
        /// Length of the rejected key.
        actual: usize,
    },
    /// The configured key length is out of range.
    #[error("key length [{key_len}] must be between 1 and [{max}]")]
    InvalidKeyLength {
        /// The rejected key length.
        key_len: usize,
        /// Largest supported key length.
        max: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_error_converts_into_art_error() {
        let err: ArtError = AllocError::NumaNodeUnavailable { node: 3 }.into();
        assert!(matches!(
            err,
            ArtError::Alloc(AllocError::NumaNodeUnavailable { node: 3 })
        ));
        assert_eq!(
            err.to_string(),
            "NUMA node [3] is not available to this process"
        );
    }

    #[test]
    fn map_error_keeps_os_source() {
        let err = AllocError::Map {
            len: 4096,
            source: io::Error::from_raw_os_error(libc::ENOMEM),
        };
        assert_eq!(
            err.to_string(),
            "failed to map [4096] bytes of anonymous memory"
        );
        assert!(std::error::Error::source(&err).is_some());
    }
}
