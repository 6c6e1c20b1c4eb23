use crate::{
    alloc::NodeAllocator,
    raw::{KeyBuf, LeafRef, NodeArena, NodeRef, RawTree},
    KeyLoader, MAX_KEY_LEN,
};

impl<L: KeyLoader, A: NodeAllocator> RawTree<L, A> {
    /// Search for the leaf stored under `key`, checking only the inline part
    /// of each prefix on the way down.
    ///
    /// Prefixes longer than the inline buffer are skipped over entirely, and
    /// the whole key is compared against the leaf key at the end whenever
    /// something was skipped or the leaf sits above the last key byte.
    pub(crate) fn search_optimistic(&self, key: &[u8]) -> Option<LeafRef> {
        if key.len() != self.key_len {
            return None;
        }

        let mut current_node = self.root?;
        let mut current_depth = 0;
        let mut skipped_prefix = false;

        loop {
            let handle = match current_node {
                NodeRef::Inner(handle) => handle,
                NodeRef::Leaf(leaf) => {
                    if !skipped_prefix && current_depth == key.len() {
                        return Some(leaf);
                    }

                    let start = if skipped_prefix { 0 } else { current_depth };
                    return self.leaf_matches(leaf, key, start).then_some(leaf);
                },
            };

            let header = self.arena.header(handle);
            let prefix_len = header.prefix_len();
            if header.has_implicit_bytes() {
                skipped_prefix = true;
            } else if key.get(current_depth..current_depth + prefix_len)? != header.read_prefix() {
                return None;
            }
            current_depth += prefix_len;

            let key_fragment = *key.get(current_depth)?;
            current_node = self.lookup_child(handle, key_fragment)?;
            current_depth += 1;
        }
    }

    /// Search for the leaf stored under `key`, verifying every prefix byte on
    /// the way down.
    ///
    /// Long prefixes are checked against the key of the minimum leaf below the
    /// node, so only the bytes after the last branch remain to be compared
    /// once a leaf is reached.
    pub(crate) fn search_pessimistic(&self, key: &[u8]) -> Option<LeafRef> {
        if key.len() != self.key_len {
            return None;
        }

        let mut current_node = self.root?;
        let mut current_depth = 0;

        loop {
            let handle = match current_node {
                NodeRef::Inner(handle) => handle,
                NodeRef::Leaf(leaf) => {
                    return self.leaf_matches(leaf, key, current_depth).then_some(leaf);
                },
            };

            let prefix_len = self.arena.header(handle).prefix_len();
            if self.prefix_mismatch(handle, key, current_depth) != prefix_len {
                return None;
            }
            current_depth += prefix_len;

            let key_fragment = *key.get(current_depth)?;
            current_node = self.lookup_child(handle, key_fragment)?;
            current_depth += 1;
        }
    }

    /// Returns true if the key of `leaf` equals `key` from `start` onwards.
    fn leaf_matches(&self, leaf: LeafRef, key: &[u8], start: usize) -> bool {
        let mut buf: KeyBuf = [0; MAX_KEY_LEN];
        let leaf_key = self.load_leaf_key(leaf, &mut buf);
        leaf_key.get(start..) == key.get(start..)
    }
}

#[cfg(test)]
mod tests;
