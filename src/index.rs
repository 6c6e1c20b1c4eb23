//! The public index type.

use crate::{
    alloc::{BumpArena, HeapPages, NodeAllocator},
    raw::{
        visitor::{MalformedTreeError, TreeStats, TreeStatsCollector, Visitor, WellFormedChecker},
        Leaf, RawTree,
    },
    AllocError, ArtConfig, ArtError, KeyLoader, RowId,
};

/// An adaptive radix tree index from fixed-length binary keys to row ids.
///
/// Keys are never stored: leaves hold row ids, and the key of a leaf is
/// recovered through the [`KeyLoader`] whenever the tree needs it. Inner
/// nodes live in the arena `A`, which owns all of their memory until it is
/// dropped.
///
/// # Examples
///
/// ```rust
/// use art_index::{ArtConfig, ArtIndex, BigEndianRowId};
///
/// let mut index = ArtIndex::with_heap(ArtConfig::new(8), BigEndianRowId).unwrap();
///
/// let mut key = [0; 8];
/// for row_id in 1..=1000 {
///     BigEndianRowId::encode(row_id, &mut key);
///     assert!(index.insert(&key, row_id));
/// }
///
/// BigEndianRowId::encode(500, &mut key);
/// assert_eq!(index.lookup(&key).unwrap().first_row_id(), Some(500));
///
/// BigEndianRowId::encode(1001, &mut key);
/// assert!(index.lookup(&key).is_none());
/// ```
#[derive(Debug)]
pub struct ArtIndex<L, A = BumpArena<HeapPages>> {
    raw: RawTree<L, A>,
    config: ArtConfig,
}

impl<L: KeyLoader> ArtIndex<L> {
    /// Create an empty index whose nodes live in heap pages of the default
    /// size.
    ///
    /// # Errors
    ///  - Returns an error if the configuration is invalid or the first page
    ///    cannot be allocated.
    pub fn with_heap(config: ArtConfig, loader: L) -> Result<Self, ArtError> {
        let arena = BumpArena::new(HeapPages::new())?;
        Self::new(config, loader, arena)
    }
}

impl<L: KeyLoader, A: NodeAllocator> ArtIndex<L, A> {
    /// Create an empty index whose nodes are allocated from `arena`.
    ///
    /// # Errors
    ///  - Returns an error if the key length is zero or larger than
    ///    [`MAX_KEY_LEN`](crate::MAX_KEY_LEN).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use art_index::{alloc::PoolArena, ArtConfig, ArtIndex, LeafMode};
    ///
    /// let config = ArtConfig::new(4).with_leaf_mode(LeafMode::Duplicates);
    /// let loader = |row_id: u64, key: &mut [u8]| {
    ///     key.copy_from_slice(&((row_id / 10) as u32).to_be_bytes())
    /// };
    /// let mut index = ArtIndex::new(config, loader, PoolArena::new()).unwrap();
    ///
    /// assert!(index.insert(&7u32.to_be_bytes(), 70));
    /// assert!(index.insert(&7u32.to_be_bytes(), 71));
    /// assert_eq!(index.lookup(&7u32.to_be_bytes()).unwrap().row_ids(), &[70, 71]);
    /// ```
    pub fn new(config: ArtConfig, loader: L, arena: A) -> Result<Self, ArtError> {
        config.validate()?;
        Ok(Self {
            raw: RawTree::new(config.key_len, config.leaf_mode, loader, arena),
            config,
        })
    }

    fn check_key_len(&self, key: &[u8]) -> Result<(), ArtError> {
        if key.len() != self.config.key_len {
            return Err(ArtError::KeyLength {
                expected: self.config.key_len,
                actual: key.len(),
            });
        }

        Ok(())
    }

    /// Insert `row_id` under `key`.
    ///
    /// Returns `false` if the key is already present and the index holds
    /// unique keys; the index is unchanged in that case. In
    /// [`LeafMode::Duplicates`](crate::LeafMode::Duplicates) the row id is
    /// appended to the key's list instead.
    ///
    /// # Panics
    ///  - Panics if `key` does not have the configured length.
    ///  - Panics if the arena cannot allocate a node. Use
    ///    [`ArtIndex::try_insert`] to handle allocation failure.
    pub fn insert(&mut self, key: &[u8], row_id: RowId) -> bool {
        match self.try_insert(key, row_id) {
            Ok(inserted) => inserted,
            Err(err) => panic!("failed to insert row id [{row_id}]: {err}"),
        }
    }

    /// Insert `row_id` under `key`, reporting failures as errors.
    ///
    /// Returns `Ok(false)` on a unique-key collision.
    ///
    /// # Errors
    ///  - Returns [`ArtError::KeyLength`] if `key` does not have the configured
    ///    length.
    ///  - Returns [`ArtError::Alloc`] if the arena cannot allocate a node. The
    ///    index is unchanged in both cases.
    pub fn try_insert(&mut self, key: &[u8], row_id: RowId) -> Result<bool, ArtError> {
        self.check_key_len(key)?;
        Ok(self.raw.try_insert(key, row_id)?)
    }

    /// Find the leaf stored under `key`.
    ///
    /// Prefixes longer than the inline buffer of a node are skipped during the
    /// descent, and the key is verified once against the key of the leaf.
    /// Keys of the wrong length are never found.
    pub fn lookup(&self, key: &[u8]) -> Option<Leaf<'_>> {
        let leaf = self.raw.search_optimistic(key)?;
        Some(self.raw.leaves.view(leaf))
    }

    /// Find the leaf stored under `key`, verifying the whole prefix of every
    /// node on the way down.
    ///
    /// Always returns the same leaf as [`ArtIndex::lookup`].
    pub fn lookup_pessimistic(&self, key: &[u8]) -> Option<Leaf<'_>> {
        let leaf = self.raw.search_pessimistic(key)?;
        Some(self.raw.leaves.view(leaf))
    }

    /// Returns true if `row_id` is stored under `key`.
    pub fn contains(&self, key: &[u8], row_id: RowId) -> bool {
        self.lookup(key).is_some_and(|leaf| leaf.contains(row_id))
    }

    /// The leaf holding the smallest key.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use art_index::{ArtConfig, ArtIndex, BigEndianRowId};
    ///
    /// let mut index = ArtIndex::with_heap(ArtConfig::new(2), BigEndianRowId).unwrap();
    /// assert!(index.minimum().is_none());
    ///
    /// for row_id in [300, 2, 70] {
    ///     let mut key = [0; 2];
    ///     BigEndianRowId::encode(row_id, &mut key);
    ///     index.insert(&key, row_id);
    /// }
    /// assert_eq!(index.minimum().unwrap().first_row_id(), Some(2));
    /// assert_eq!(index.maximum().unwrap().first_row_id(), Some(300));
    /// ```
    pub fn minimum(&self) -> Option<Leaf<'_>> {
        self.raw.minimum()
    }

    /// The leaf holding the largest key.
    pub fn maximum(&self) -> Option<Leaf<'_>> {
        self.raw.maximum()
    }

    /// Remove `row_id` from the key `key`.
    ///
    /// Returns `false` if the key is absent or does not hold `row_id`. The key
    /// disappears with its last row id.
    ///
    /// # Panics
    ///  - Panics if the arena cannot allocate the smaller node a removal
    ///    shrinks into. Use [`ArtIndex::try_remove`] to handle allocation
    ///    failure.
    pub fn remove(&mut self, key: &[u8], row_id: RowId) -> bool {
        match self.try_remove(key, row_id) {
            Ok(removed) => removed,
            Err(err) => panic!("failed to remove row id [{row_id}]: {err}"),
        }
    }

    /// Remove `row_id` from the key `key`, reporting failures as errors.
    ///
    /// # Errors
    ///  - Returns [`ArtError::Alloc`] if the arena cannot allocate the smaller
    ///    node a removal shrinks into. The index is unchanged in that case.
    pub fn try_remove(&mut self, key: &[u8], row_id: RowId) -> Result<bool, ArtError> {
        Ok(self.raw.try_remove(key, row_id)?)
    }

    /// Build a copy of this index whose inner nodes are allocated in preorder
    /// from `arena`.
    ///
    /// Every key resolves to the same row ids in the copy, and the copy has
    /// exactly as many inner nodes as this index. This index is not modified.
    ///
    /// # Errors
    ///  - Returns an error if `arena` cannot allocate a node.
    pub fn reorganize<B: NodeAllocator>(&self, arena: B) -> Result<ArtIndex<L, B>, AllocError>
    where
        L: Clone,
    {
        Ok(ArtIndex {
            raw: self.raw.reorganize(arena)?,
            config: self.config,
        })
    }

    /// Move every inner node into `arena` in preorder and drop the current
    /// arena, releasing the memory of nodes abandoned by growth and removal.
    ///
    /// # Errors
    ///  - Returns an error if `arena` cannot allocate a node. The index keeps
    ///    its current arena in that case.
    pub fn compact(&mut self, arena: A) -> Result<(), AllocError> {
        self.raw.compact(arena)
    }

    /// Number of row ids stored, counting every duplicate.
    pub fn len(&self) -> usize {
        self.raw.num_rows
    }

    /// Number of distinct keys stored.
    pub fn num_keys(&self) -> usize {
        self.raw.num_keys
    }

    /// Returns true if the index holds no keys.
    pub fn is_empty(&self) -> bool {
        self.raw.root.is_none()
    }

    /// Number of pages held by the arena.
    pub fn num_pages(&self) -> usize {
        self.raw.arena.num_pages()
    }

    /// The configuration the index was built with.
    pub fn config(&self) -> &ArtConfig {
        &self.config
    }

    /// The arena holding the inner nodes.
    pub fn arena(&self) -> &A {
        &self.raw.arena
    }

    /// The loader used to recover keys from row ids.
    pub fn loader(&self) -> &L {
        &self.raw.loader
    }

    /// Count the nodes of the tree by kind and level.
    pub fn stats(&self) -> TreeStats {
        TreeStatsCollector::collect(&self.raw)
    }

    /// Check the structural invariants of the tree. Returns the number of
    /// keys.
    ///
    /// # Errors
    ///  - Returns the first violated invariant.
    pub fn check_well_formed(&self) -> Result<usize, MalformedTreeError> {
        WellFormedChecker::check(&self.raw)
    }

    /// Run a [`Visitor`] over every node of the tree, in key order.
    pub fn visit<V: Visitor>(&self, visitor: &mut V) -> V::Output {
        self.raw.visit(visitor)
    }
}
