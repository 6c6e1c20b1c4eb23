#![deny(
    // missing_docs,
    clippy::missing_safety_doc,
    unsafe_op_in_unsafe_fn,
    deprecated_in_future,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    rustdoc::invalid_codeblock_attributes
)]
#![doc(
    html_playground_url = "https://play.rust-lang.org/",
    test(attr(deny(warnings)))
)]

//! Adaptive radix tree index over fixed-length binary keys.
//!
//! The index maps keys to row ids of an external table. Keys are never stored
//! in the tree: a [`KeyLoader`] rebuilds the key of a row whenever a leaf has
//! to be compared. Inner nodes are plain-old-data living in a node arena from
//! the [`alloc`] module, backed by heap pages, per-kind pools or huge pages
//! pinned to a NUMA node.
//!
//! # References
//!
//!  - Leis, V., Kemper, A., & Neumann, T. (2013, April). The adaptive radix
//!    tree: ARTful indexing for main-memory databases. In 2013 IEEE 29th
//!    International Conference on Data Engineering (ICDE) (pp. 38-49). IEEE.
//!    [Link to PDF][ART paper]
//!
//! [ART paper]: https://www-db.in.tum.de/~leis/papers/ART.pdf

pub mod alloc;
mod config;
mod error;
mod index;
mod key;
mod raw;

pub use config::*;
pub use error::*;
pub use index::*;
pub use key::*;
pub use raw::{
    visitor, Header, InnerNode, InnerNode16, InnerNode256, InnerNode4, InnerNode48,
    InnerNodeCompressed, Leaf, LeafRef, LeafStore, ListId, NodeHandle, NodeKind, NodeRef, RawRef,
    RowList, PREFIX_LEN,
};

#[doc = include_str!("../README.md")]
#[cfg(doctest)]
pub struct ReadmeDoctests;
