//! Scalar/point arithmetic, NTT, polynomials, SRS, and KZG commitments over
//! BLS12-381.
//!
//! This crate has no I/O and no notion of a trie, block, or ledger: it is
//! the pure cryptographic layer that `bullet-trie` and `bullet-ledger`
//! build on.

pub mod hashing;
pub mod kzg;
pub mod ntt;
pub mod point;
pub mod poly;
pub mod scalar;
pub mod srs;

pub use hashing::{derive_hash, derive_kv_hash, hash_p1_to_scalar};
pub use kzg::{KzgError, batch_verify, prove_kzg, verify_kzg};
pub use ntt::NttRoots;
pub use point::{G1Point, G2Point};
pub use poly::Polynomial;
pub use scalar::{
    Scalar, equal_scalars, hash_to_sk, one_sk, scalar_from, scalar_is_zero, scalar_to_le_bytes,
    zero_sk,
};
pub use srs::{Srs, SrsError};

/// Polynomial length / branch fanout shared with `bullet-trie`.
pub const BRANCH_ORDER: usize = 256;
