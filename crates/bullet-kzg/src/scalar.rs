//! Scalar field (`Fr`) helpers.

use ark_bls12_381::{Fr, G1Projective};
use ark_ec::{AffineRepr, CurveGroup, Group};
use ark_ff::{Field, PrimeField};
use ark_serialize::CanonicalSerialize;

/// Element of the BLS12-381 scalar field.
pub type Scalar = Fr;

/// Returns the additive identity of `Fr`.
pub fn zero_sk() -> Scalar {
    Scalar::from(0u64)
}

/// Returns the multiplicative identity of `Fr`.
pub fn one_sk() -> Scalar {
    Scalar::from(1u64)
}

/// Builds a scalar from a `u64`.
pub fn scalar_from(v: u64) -> Scalar {
    Scalar::from(v)
}

/// Builds a scalar from little-endian bytes, reducing modulo the field
/// order if the bytes represent an integer larger than it.
pub fn scalar_from_le_bytes(bytes: &[u8]) -> Scalar {
    Scalar::from_le_bytes_mod_order(bytes)
}

/// `a + b` in `Fr`.
pub fn scalar_add(a: &Scalar, b: &Scalar) -> Scalar {
    *a + *b
}

/// `a - b` in `Fr`.
pub fn scalar_sub(a: &Scalar, b: &Scalar) -> Scalar {
    *a - *b
}

/// `a * b` in `Fr`.
pub fn scalar_mul(a: &Scalar, b: &Scalar) -> Scalar {
    *a * *b
}

/// `-a` in `Fr`.
pub fn scalar_neg(a: &Scalar) -> Scalar {
    -*a
}

/// `a^-1` in `Fr`. `None` for zero, which has no inverse.
pub fn scalar_inverse(a: &Scalar) -> Option<Scalar> {
    a.inverse()
}

/// `a^e` in `Fr`.
pub fn scalar_exp(a: &Scalar, e: u64) -> Scalar {
    a.pow([e])
}

/// Checks whether `s` is the zero scalar by multiplying the G1 generator
/// by `s` and comparing against the point at infinity, rather than
/// comparing field bytes directly.
pub fn scalar_is_zero(s: &Scalar) -> bool {
    (G1Projective::generator() * s).into_affine().is_zero()
}

/// Constant-time equality over the canonical compressed byte encoding of
/// two scalars.
pub fn equal_scalars(a: &Scalar, b: &Scalar) -> bool {
    let mut ab = Vec::new();
    let mut bb = Vec::new();
    a.serialize_compressed(&mut ab).expect("scalar serializes");
    b.serialize_compressed(&mut bb).expect("scalar serializes");
    let mut diff = 0u8;
    for (x, y) in ab.iter().zip(bb.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Deserialises a 32-byte hash as an `Fr` scalar, reducing modulo the
/// field order.
pub fn hash_to_sk(h: &[u8; 32]) -> Scalar {
    scalar_from_le_bytes(h)
}

/// Canonical little-endian compressed encoding of a scalar, e.g. for
/// folding into a Fiat-Shamir transcript or returning a block's root hash
/// as raw bytes.
pub fn scalar_to_le_bytes(s: &Scalar) -> [u8; 32] {
    let mut out = [0u8; 32];
    s.serialize_compressed(&mut out[..]).expect("scalar is 32 bytes");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_zero() {
        assert!(scalar_is_zero(&zero_sk()));
        assert!(!scalar_is_zero(&one_sk()));
    }

    #[test]
    fn inverse_round_trips() {
        let a = scalar_from(7);
        let inv = scalar_inverse(&a).expect("nonzero has inverse");
        assert_eq!(scalar_mul(&a, &inv), one_sk());
    }

    #[test]
    fn equal_scalars_detects_mismatch() {
        let a = scalar_from(42);
        let b = scalar_from(42);
        let c = scalar_from(43);
        assert!(equal_scalars(&a, &b));
        assert!(!equal_scalars(&a, &c));
    }

    #[test]
    fn hash_to_sk_is_deterministic() {
        let h = [7u8; 32];
        assert_eq!(hash_to_sk(&h), hash_to_sk(&h));
    }
}
