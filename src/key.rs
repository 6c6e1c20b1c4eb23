//! The contract for recovering a key from a stored row id.
//!
//! Leaves only hold row ids. Whenever the tree needs the full key of a leaf
//! (to verify an optimistic lookup, to split a leaf, or to rebuild a prefix
//! longer than the inline buffer) it asks a [`KeyLoader`] to encode the key of
//! that row again.

/// Identifier of a row in the indexed table.
pub type RowId = u64;

/// Writes the key of a row into a buffer.
///
/// The buffer always has exactly the configured key length. Implementations
/// must be deterministic: a row id has to produce the same bytes every time,
/// and those bytes must be the key it was inserted with.
pub trait KeyLoader {
    /// Encode the key of `row_id` into `key`.
    fn load_key(&self, row_id: RowId, key: &mut [u8]);
}

impl<F> KeyLoader for F
where
    F: Fn(RowId, &mut [u8]),
{
    fn load_key(&self, row_id: RowId, key: &mut [u8]) {
        self(row_id, key)
    }
}

/// Loader for indexes whose key *is* the row id.
///
/// The row id is written big-endian and truncated to its low `key.len()`
/// bytes, so that byte order matches numeric order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BigEndianRowId;

impl BigEndianRowId {
    /// Encode `value` the same way the loader does, for building search keys.
    pub fn encode(value: u64, key: &mut [u8]) {
        let bytes = value.to_be_bytes();
        let len = key.len().min(bytes.len());
        key.fill(0);
        let start = key.len() - len;
        key[start..].copy_from_slice(&bytes[bytes.len() - len..]);
    }
}

impl KeyLoader for BigEndianRowId {
    #[inline]
    fn load_key(&self, row_id: RowId, key: &mut [u8]) {
        Self::encode(row_id, key)
    }
}
