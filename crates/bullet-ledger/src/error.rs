//! Error surface for the Ledger facade.
//!
//! Extends the trie layer's [`TrieError`] with the concerns that only make
//! sense once keys are mapped to shards and blocks: a key hashing outside
//! this shard's prefix, a root that failed to materialize, and the setup
//! validation errors surfaced at configuration time.

use bullet_trie::TrieError;
use thiserror::Error;

/// Errors returned by Ledger operations.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LedgerError {
    /// The requested key/value slot does not exist.
    #[error("key does not exist")]
    NotExist,
    /// The key hash falls outside this shard's prefix.
    #[error("key is not covered by this shard")]
    NotInShard,
    /// The block's root failed to load or materialize.
    #[error("root node error")]
    RootErr,
    /// The backing store reported a failure.
    #[error("storage engine error")]
    DbErr,
    /// A node failed to load from the allocator.
    #[error("failed to load node")]
    LoadNodeErr,
    /// A KZG proving or verification step failed.
    #[error("KZG proof error")]
    KzgProofErr,
    /// Internal signal that a subtree was fully removed.
    #[error("subtree deleted")]
    Deleted,
    /// The target account/value was already deleted.
    #[error("already deleted")]
    AlreadyDeleted,
    /// Deleting a stored value failed.
    #[error("failed to delete value")]
    DeleteValueErr,
    /// Replacing a value failed (the previous value hash didn't match).
    #[error("failed to replace value")]
    ReplaceValueErr,
    /// A required parameter was null/empty.
    #[error("required parameter was null")]
    NullParameter,
    /// A value hash argument wasn't exactly 32 bytes.
    #[error("value hash must be 32 bytes")]
    ValHashSize,
    /// `val_idx` was outside `[0, LEAF_ORDER)`.
    #[error("val_idx out of range")]
    ValIdxRange,
    /// An imported SRS blob had the wrong length for this setup size.
    #[error("invalid setup size")]
    InvalidSetupSize,
    /// A node was not found during a recache operation.
    #[error("node not found during recache")]
    NotExistRecache,
}

/// Convenience alias for Ledger-layer results.
pub type LedgerResult<T> = Result<T, LedgerError>;

impl From<TrieError> for LedgerError {
    fn from(e: TrieError) -> Self {
        match e {
            TrieError::NotExist => LedgerError::NotExist,
            TrieError::LoadNodeErr => LedgerError::LoadNodeErr,
            TrieError::KzgProofErr => LedgerError::KzgProofErr,
            TrieError::Deleted => LedgerError::Deleted,
            TrieError::AlreadyDeleted => LedgerError::AlreadyDeleted,
            TrieError::DeleteValueErr => LedgerError::DeleteValueErr,
            TrieError::ReplaceValueErr => LedgerError::ReplaceValueErr,
            TrieError::ValIdxRange => LedgerError::ValIdxRange,
            TrieError::NotExistRecache => LedgerError::NotExistRecache,
        }
    }
}

impl From<bullet_kzg::SrsError> for LedgerError {
    fn from(_: bullet_kzg::SrsError) -> Self {
        LedgerError::InvalidSetupSize
    }
}

impl From<bullet_kzg::KzgError> for LedgerError {
    fn from(_: bullet_kzg::KzgError) -> Self {
        LedgerError::KzgProofErr
    }
}
