//! Error surface for the storage layer.

use thiserror::Error;

/// Errors from `BulletDb` and the `NodeAllocator` implementation built on
/// top of it.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The embedded KV engine reported a failure.
    #[error("storage engine error: {0}")]
    Db(#[from] rocksdb::Error),
    /// A node or value key was requested but not present.
    #[error("key not found")]
    NotFound,
    /// Bytes read back from storage failed to parse as a `Branch`/`Leaf`.
    #[error("failed to decode stored node: {0}")]
    Decode(#[from] bullet_trie::TrieError),
}

/// Convenience alias for storage-layer results.
pub type StoreResult<T> = Result<T, StoreError>;
