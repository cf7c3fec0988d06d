//! Blake3-based hashing helpers used to fold curve points into scalars and
//! to derive key/value digests.

use crate::point::{G1Point, compress_g1};
use crate::scalar::{Scalar, hash_to_sk};

/// `H(p1, tag) = Blake3(tag \| compress_g1(p1)) -> Fr`, used to fold a
/// child's commitment into a branch-polynomial scalar, and to derive
/// Fiat-Shamir challenges over a commitment/proof pair.
pub fn hash_p1_to_scalar(p: &G1Point, tag: &[u8]) -> Scalar {
    let mut hasher = blake3::Hasher::new();
    hasher.update(tag);
    hasher.update(&compress_g1(p));
    hash_to_sk(hasher.finalize().as_bytes())
}

/// `derive_kv_hash(k, v) = Blake3(k \| v)`.
pub fn derive_kv_hash(key: &[u8], value: &[u8]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(key);
    hasher.update(value);
    *hasher.finalize().as_bytes()
}

/// `derive_hash(bytes) = Blake3(bytes)`.
pub fn derive_hash(bytes: &[u8]) -> [u8; 32] {
    *blake3::hash(bytes).as_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ec::AffineRepr;

    #[test]
    fn hash_p1_to_scalar_is_deterministic_and_tag_sensitive() {
        let p = G1Point::generator();
        let a = hash_p1_to_scalar(&p, b"TAG");
        let b = hash_p1_to_scalar(&p, b"TAG");
        let c = hash_p1_to_scalar(&p, b"OTHER");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn derive_hash_matches_blake3() {
        assert_eq!(derive_hash(b"hello"), *blake3::hash(b"hello").as_bytes());
    }

    #[test]
    fn derive_kv_hash_is_order_sensitive() {
        assert_ne!(derive_kv_hash(b"a", b"b"), derive_kv_hash(b"b", b"a"));
    }
}
