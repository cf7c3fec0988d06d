//! Structured reference string: construction, commitment, and
//! import/export.

use crate::point::{
    G1Point, G2Point, G1_COMPRESSED_BYTES, G2_COMPRESSED_BYTES, compress_g1, compress_g2,
    decompress_g1, decompress_g2,
};
use crate::poly::Polynomial;
use crate::scalar::Scalar;
use ark_bls12_381::{G1Projective, G2Projective};
use ark_ec::{CurveGroup, Group};
use thiserror::Error;

/// Errors constructing or (de)serialising an [`Srs`].
#[derive(Debug, Error)]
pub enum SrsError {
    /// An imported SRS did not have exactly the expected byte length.
    #[error("invalid SRS size: expected {expected} bytes, got {actual}")]
    InvalidSetupSize {
        /// Expected byte length.
        expected: usize,
        /// Actual byte length.
        actual: usize,
    },
    /// A compressed point inside an imported SRS failed to parse.
    #[error("invalid SRS point encoding: {0}")]
    InvalidPoint(#[from] crate::point::PointError),
}

/// Structured reference string `{g1 * s^i}_{i=0..=degree}`,
/// `{g2 * s^i}_{i=0..=1}`.
///
/// `s` itself is never stored: [`Srs::new`] consumes it by value and it is
/// dropped once the powers are computed.
#[derive(Clone, Debug)]
pub struct Srs {
    /// `g1_powers[i] = g1 * s^i` for `i` in `0..=degree`.
    pub g1_powers: Vec<G1Point>,
    /// `g2_powers[i] = g2 * s^i` for `i` in `0..=1`.
    pub g2_powers: [G2Point; 2],
}

impl Srs {
    /// Builds the SRS for the given `degree`, consuming the toxic-waste
    /// scalar `s`.
    pub fn new(degree: usize, s: Scalar) -> Srs {
        let g1_gen = G1Projective::generator();
        let g2_gen = G2Projective::generator();

        let mut g1_powers = Vec::with_capacity(degree + 1);
        let mut cur = Scalar::from(1u64);
        for _ in 0..=degree {
            g1_powers.push((g1_gen * cur).into_affine());
            cur *= s;
        }

        let g2_powers = [g2_gen.into_affine(), (g2_gen * s).into_affine()];

        // `s` is dropped here at the end of scope; the caller never
        // receives it back.
        Srs {
            g1_powers,
            g2_powers,
        }
    }

    /// Highest supported polynomial degree.
    pub fn degree(&self) -> usize {
        self.g1_powers.len().saturating_sub(1)
    }

    /// `commit_g1(coeffs) = sum_i g1_powers[i] * coeffs[i]`.
    pub fn commit_g1(&self, poly: &Polynomial) -> G1Point {
        assert!(
            poly.len() <= self.g1_powers.len(),
            "polynomial degree exceeds SRS size"
        );
        let mut acc = G1Projective::generator() * Scalar::from(0u64);
        for (c, p) in poly.0.iter().zip(self.g1_powers.iter()) {
            acc += G1Projective::from(*p) * *c;
        }
        acc.into_affine()
    }

    /// `commit_g2` analogous to `commit_g1`, restricted to degree <= 1.
    pub fn commit_g2(&self, coeffs: &[Scalar]) -> G2Point {
        assert!(coeffs.len() <= self.g2_powers.len(), "degree exceeds g2 powers");
        let mut acc = G2Projective::generator() * Scalar::from(0u64);
        for (c, p) in coeffs.iter().zip(self.g2_powers.iter()) {
            acc += G2Projective::from(*p) * *c;
        }
        acc.into_affine()
    }

    /// Serialises the SRS as `degree+1` compressed G1 points followed by
    /// 2 compressed G2 points, per the external interface layout.
    pub fn export(&self) -> Vec<u8> {
        let mut out =
            Vec::with_capacity(self.g1_powers.len() * G1_COMPRESSED_BYTES + 2 * G2_COMPRESSED_BYTES);
        for p in &self.g1_powers {
            out.extend_from_slice(&compress_g1(p));
        }
        for p in &self.g2_powers {
            out.extend_from_slice(&compress_g2(p));
        }
        out
    }

    /// Parses a pregenerated SRS. `branch_order` is the expected number
    /// of G1 powers (`BRANCH_ORDER` in the trie layer); the byte length
    /// must match exactly.
    pub fn import(bytes: &[u8], branch_order: usize) -> Result<Srs, SrsError> {
        let expected = branch_order * G1_COMPRESSED_BYTES + 2 * G2_COMPRESSED_BYTES;
        if bytes.len() != expected {
            return Err(SrsError::InvalidSetupSize {
                expected,
                actual: bytes.len(),
            });
        }
        let mut g1_powers = Vec::with_capacity(branch_order);
        let mut offset = 0;
        for _ in 0..branch_order {
            g1_powers.push(decompress_g1(&bytes[offset..offset + G1_COMPRESSED_BYTES])?);
            offset += G1_COMPRESSED_BYTES;
        }
        let g2_0 = decompress_g2(&bytes[offset..offset + G2_COMPRESSED_BYTES])?;
        offset += G2_COMPRESSED_BYTES;
        let g2_1 = decompress_g2(&bytes[offset..offset + G2_COMPRESSED_BYTES])?;
        Ok(Srs {
            g1_powers,
            g2_powers: [g2_0, g2_1],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalar::scalar_from;

    #[test]
    fn commit_g1_is_linear() {
        let srs = Srs::new(4, scalar_from(13));
        let a = Polynomial::new(vec![scalar_from(1), scalar_from(2)]);
        let b = Polynomial::new(vec![scalar_from(3), scalar_from(4)]);
        let sum = a.add(&b);
        let lhs = srs.commit_g1(&sum);
        let rhs = (ark_bls12_381::G1Projective::from(srs.commit_g1(&a))
            + ark_bls12_381::G1Projective::from(srs.commit_g1(&b)))
        .into_affine();
        assert_eq!(lhs, rhs);
    }

    #[test]
    fn export_import_round_trips() {
        let srs = Srs::new(255, scalar_from(13));
        let bytes = srs.export();
        let parsed = Srs::import(&bytes, 256).unwrap();
        assert_eq!(parsed.g1_powers, srs.g1_powers);
        assert_eq!(parsed.g2_powers, srs.g2_powers);
    }

    #[test]
    fn import_rejects_wrong_size() {
        let err = Srs::import(&[0u8; 10], 256).unwrap_err();
        assert!(matches!(err, SrsError::InvalidSetupSize { .. }));
    }
}
