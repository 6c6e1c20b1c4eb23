//! Per-index configuration.

use crate::ArtError;

/// Longest key, in bytes, that an index can be configured with.
///
/// Keys are reconstructed from row ids into a stack buffer of this size.
pub const MAX_KEY_LEN: usize = 256;

/// How leaves hold row ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LeafMode {
    /// Each key maps to exactly one row id, stored inline in the child
    /// reference. Inserting an existing key fails.
    #[default]
    Unique,
    /// Each key maps to a growable list of row ids. Inserting an existing key
    /// appends to its list.
    Duplicates,
}

/// Settings fixed for the lifetime of an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArtConfig {
    /// Length of every key in the index.
    pub key_len: usize,
    /// Leaf representation used by the index.
    pub leaf_mode: LeafMode,
}

impl ArtConfig {
    /// Configuration for a unique-key index over keys of `key_len` bytes.
    pub const fn new(key_len: usize) -> Self {
        Self {
            key_len,
            leaf_mode: LeafMode::Unique,
        }
    }

    /// Replace the leaf representation.
    pub const fn with_leaf_mode(mut self, leaf_mode: LeafMode) -> Self {
        self.leaf_mode = leaf_mode;
        self
    }

    /// Check that the configuration describes a buildable index.
    pub fn validate(&self) -> Result<(), ArtError> {
        if self.key_len == 0 || self.key_len > MAX_KEY_LEN {
            return Err(ArtError::InvalidKeyLength {
                key_len: self.key_len,
                max: MAX_KEY_LEN,
            });
        }

        Ok(())
    }
}

impl Default for ArtConfig {
    fn default() -> Self {
        Self::new(8)
    }
}
