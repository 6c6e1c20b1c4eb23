//! Trie node lookup and manipulation

mod insert;

mod minmax;

mod lookup;

mod delete;

mod reorganize;
