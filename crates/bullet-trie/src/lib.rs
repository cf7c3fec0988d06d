//! The Verkle-style trie: `NodeId`, `Branch`/`Leaf` polymorphism, their
//! wire encoding, and the per-block copy-on-write discipline.
//!
//! This crate is generic over storage via the [`NodeAllocator`] trait;
//! `bullet-store` provides the concrete RocksDB+LRU-backed implementation.

pub mod branch;
pub mod error;
pub mod leaf;
pub mod node;
pub mod node_id;

pub use branch::{Branch, Child, BRANCH_ORDER};
pub use error::{TrieError, TrieResult};
pub use leaf::{Leaf, LEAF_ORDER};
pub use node::{Node, NodeAllocator, BRANCH_TAG, LEAF_TAG};
pub use node_id::{
    FnvHasher, NodeId, NodeIdHashBuilder, BLOCK_ID_BYTES, CANONICAL_BLOCK_ID, ID_SIZE,
    LEVEL_BYTES, PATH_BYTES,
};
