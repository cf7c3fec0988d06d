//! G1/G2 group elements and their compressed byte encodings.

use ark_bls12_381::{G1Affine, G2Affine};
use ark_ec::AffineRepr;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize, SerializationError};
use thiserror::Error;

/// Errors from parsing a compressed curve point.
#[derive(Debug, Error)]
pub enum PointError {
    /// The byte slice was the wrong length for a compressed point.
    #[error("expected {expected} compressed bytes, got {actual}")]
    WrongLength {
        /// Expected length in bytes.
        expected: usize,
        /// Actual length in bytes.
        actual: usize,
    },
    /// The bytes did not decode to a point on the curve.
    #[error("invalid compressed point encoding: {0}")]
    Malformed(#[from] SerializationError),
}

/// A G1 group element. Used both as a `Commitment` and as a `Proof`, per
/// the component design.
pub type G1Point = G1Affine;
/// A G2 group element, used only in the SRS and the pairing check.
pub type G2Point = G2Affine;

/// Compressed byte length of a G1 point.
pub const G1_COMPRESSED_BYTES: usize = 48;
/// Compressed byte length of a G2 point.
pub const G2_COMPRESSED_BYTES: usize = 96;

/// The G1 point at infinity, used as the default commitment for a node
/// that has not been finalized yet.
pub fn identity_g1() -> G1Point {
    G1Point::zero()
}

/// Serialises `p` to its compressed 48-byte form.
pub fn compress_g1(p: &G1Point) -> [u8; G1_COMPRESSED_BYTES] {
    let mut out = [0u8; G1_COMPRESSED_BYTES];
    p.serialize_compressed(&mut out[..])
        .expect("G1 point always serializes to a fixed-size buffer");
    out
}

/// Parses a compressed 48-byte G1 point.
pub fn decompress_g1(bytes: &[u8]) -> Result<G1Point, PointError> {
    if bytes.len() != G1_COMPRESSED_BYTES {
        return Err(PointError::WrongLength {
            expected: G1_COMPRESSED_BYTES,
            actual: bytes.len(),
        });
    }
    Ok(G1Point::deserialize_compressed(bytes)?)
}

/// Serialises `p` to its compressed 96-byte form.
pub fn compress_g2(p: &G2Point) -> [u8; G2_COMPRESSED_BYTES] {
    let mut out = [0u8; G2_COMPRESSED_BYTES];
    p.serialize_compressed(&mut out[..])
        .expect("G2 point always serializes to a fixed-size buffer");
    out
}

/// Parses a compressed 96-byte G2 point.
pub fn decompress_g2(bytes: &[u8]) -> Result<G2Point, PointError> {
    if bytes.len() != G2_COMPRESSED_BYTES {
        return Err(PointError::WrongLength {
            expected: G2_COMPRESSED_BYTES,
            actual: bytes.len(),
        });
    }
    Ok(G2Point::deserialize_compressed(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ec::AffineRepr;

    #[test]
    fn g1_round_trips() {
        let p = G1Point::generator();
        let bytes = compress_g1(&p);
        assert_eq!(bytes.len(), G1_COMPRESSED_BYTES);
        assert_eq!(decompress_g1(&bytes).unwrap(), p);
    }

    #[test]
    fn g1_rejects_wrong_length() {
        let err = decompress_g1(&[0u8; 10]).unwrap_err();
        assert!(matches!(err, PointError::WrongLength { .. }));
    }

    #[test]
    fn g2_round_trips() {
        let p = G2Point::generator();
        let bytes = compress_g2(&p);
        assert_eq!(decompress_g2(&bytes).unwrap(), p);
    }
}
