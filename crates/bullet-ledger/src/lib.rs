//! The Ledger facade: block-hash bookkeeping, key hashing, and the trie
//! mutation/read/proof operations built on top of `bullet-trie` and
//! `bullet-store`.
//!
//! `bullet-kzg` and `bullet-trie` know nothing of blocks, shards, or
//! proofs as external concepts — this crate is where those meet the
//! cryptographic and storage layers.

pub mod block_processor;
pub mod error;
pub mod gadgets;
pub mod ledger;

pub use block_processor::{
    derive_zs_ys, finalize_block, generate_proof, justify_block, prune_block, valid_proof, Proof,
};
pub use error::{LedgerError, LedgerResult};
pub use gadgets::{Gadgets, KzgSettings};
pub use ledger::Ledger;
