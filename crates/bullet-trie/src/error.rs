//! Error surface for the trie layer.
//!
//! Mirrors the exhaustive error code table of the external interface:
//! domain errors are expected outcomes callers branch on, infrastructure
//! errors interrupt the operation, and `Deleted` is an internal upward
//! signal a caller maps back to success after adjusting its own child
//! bookkeeping.

use thiserror::Error;

/// Errors returned by trie node operations.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TrieError {
    /// The requested key/value slot does not exist.
    #[error("key does not exist")]
    NotExist,
    /// A node failed to load from the backing allocator.
    #[error("failed to load node")]
    LoadNodeErr,
    /// A KZG proving step failed.
    #[error("KZG proof generation failed")]
    KzgProofErr,
    /// Internal signal: the subtree rooted at the callee was fully
    /// removed. Callers at the Ledger boundary map this back to success.
    #[error("subtree deleted")]
    Deleted,
    /// The target account/value was already deleted.
    #[error("already deleted")]
    AlreadyDeleted,
    /// Deleting a value from the backing store failed.
    #[error("failed to delete value")]
    DeleteValueErr,
    /// Replacing a value failed (e.g. the previous value hash didn't match).
    #[error("failed to replace value")]
    ReplaceValueErr,
    /// `val_idx` was outside `[0, LEAF_ORDER)`.
    #[error("val_idx out of range")]
    ValIdxRange,
    /// A node was not found during a recache operation.
    #[error("node not found during recache")]
    NotExistRecache,
}

/// Convenience alias for trie-layer results.
pub type TrieResult<T> = Result<T, TrieError>;
