//! Leaf values of the tree

use crate::RowId;
use core::slice;

/// Identifier of a [`RowList`] inside a [`LeafStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListId(pub(crate) u32);

impl ListId {
    /// Position of the list in its store.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A terminal child of an inner node, or the root of a one-key tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeafRef {
    /// A single row id stored directly in the reference.
    Row(RowId),
    /// A growable list of row ids for a key with duplicates.
    List(ListId),
}

/// The row ids stored under one key in duplicate-key mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowList {
    rows: Vec<RowId>,
}

impl RowList {
    /// Number of live row ids.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the list holds no row ids.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of row ids the list can hold before reallocating.
    pub fn capacity(&self) -> usize {
        self.rows.capacity()
    }

    /// The live row ids, in insertion order.
    pub fn as_slice(&self) -> &[RowId] {
        &self.rows
    }
}

/// Owner of every [`RowList`] of a tree.
///
/// Lists are addressed by [`ListId`]; ids are handed out sequentially and
/// never reused, so a list emptied by a removal stays allocated until the
/// store is dropped.
#[derive(Debug, Clone, Default)]
pub struct LeafStore {
    lists: Vec<RowList>,
}

impl LeafStore {
    /// Create a list holding one row id.
    pub fn push_list(&mut self, row_id: RowId) -> ListId {
        let id = ListId(self.lists.len() as u32);
        self.lists.push(RowList {
            rows: vec![row_id],
        });
        id
    }

    /// Look up a list.
    ///
    /// # Panics
    ///  - Panics if `id` was not produced by this store.
    pub fn list(&self, id: ListId) -> &RowList {
        &self.lists[id.index()]
    }

    /// Append a row id to a list.
    pub fn append(&mut self, id: ListId, row_id: RowId) {
        self.lists[id.index()].rows.push(row_id);
    }

    /// Remove one occurrence of `row_id` from a list, keeping the order of the
    /// remaining ids. Returns false if the row id was not in the list.
    pub fn remove_row(&mut self, id: ListId, row_id: RowId) -> bool {
        let rows = &mut self.lists[id.index()].rows;
        match rows.iter().position(|row| *row == row_id) {
            Some(idx) => {
                rows.remove(idx);
                true
            },
            None => false,
        }
    }

    /// Number of lists ever created.
    pub fn num_lists(&self) -> usize {
        self.lists.len()
    }

    /// Resolve a leaf reference into a [`Leaf`] view.
    pub fn view(&self, leaf: LeafRef) -> Leaf<'_> {
        match leaf {
            LeafRef::Row(row_id) => Leaf::Row(row_id),
            LeafRef::List(id) => Leaf::List {
                id,
                rows: self.list(id).as_slice(),
            },
        }
    }

    /// A row id stored under `leaf`, used to reload the leaf's key.
    ///
    /// # Panics
    ///  - Panics if a list leaf is empty, which the tree never leaves behind.
    pub fn representative_row(&self, leaf: LeafRef) -> RowId {
        match leaf {
            LeafRef::Row(row_id) => row_id,
            LeafRef::List(id) => match self.list(id).as_slice().first() {
                Some(row_id) => *row_id,
                None => panic!("leaf list {id:?} is empty but still in the tree"),
            },
        }
    }
}

/// The result of a successful lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leaf<'a> {
    /// A unique-key leaf.
    Row(RowId),
    /// A duplicate-key leaf.
    List {
        /// Id of the list in the tree's leaf store.
        id: ListId,
        /// The row ids stored under the key.
        rows: &'a [RowId],
    },
}

impl Leaf<'_> {
    /// Every row id stored under the key.
    pub fn row_ids(&self) -> &[RowId] {
        match self {
            Leaf::Row(row_id) => slice::from_ref(row_id),
            Leaf::List { rows, .. } => *rows,
        }
    }

    /// The first row id stored under the key.
    pub fn first_row_id(&self) -> Option<RowId> {
        self.row_ids().first().copied()
    }

    /// Returns true if `row_id` is stored under the key.
    pub fn contains(&self, row_id: RowId) -> bool {
        self.row_ids().contains(&row_id)
    }

    /// Number of row ids stored under the key.
    pub fn len(&self) -> usize {
        self.row_ids().len()
    }

    /// Returns true if no row id is stored under the key.
    pub fn is_empty(&self) -> bool {
        self.row_ids().is_empty()
    }

    /// The reference that identifies this leaf inside the tree.
    pub fn reference(&self) -> LeafRef {
        match self {
            Leaf::Row(row_id) => LeafRef::Row(*row_id),
            Leaf::List { id, .. } => LeafRef::List(*id),
        }
    }
}
