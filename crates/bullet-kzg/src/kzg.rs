//! KZG single-point prove/verify and Fiat-Shamir batched multi-proof
//! verification.

use crate::hashing::hash_p1_to_scalar;
use crate::ntt::{NttRoots, inverse_fft_in_place};
use crate::point::{G1Point, compress_g1};
use crate::poly::{Polynomial, derive_quotient};
use crate::scalar::{Scalar, equal_scalars, hash_to_sk, scalar_is_zero, zero_sk};
use crate::srs::Srs;
use ark_bls12_381::{Bls12_381, G1Projective, G2Projective};
use ark_ec::pairing::Pairing;
use ark_ec::{CurveGroup, Group};
use thiserror::Error;

/// Errors from KZG proving.
#[derive(Debug, Error)]
pub enum KzgError {
    /// `z` (the evaluation point requested by `eval_idx`) is not a root in
    /// the supplied domain.
    #[error("evaluation index {0} is out of range for the NTT domain")]
    EvalIndexOutOfRange(usize),
}

/// `prove_kzg`: opens `evals` (evaluation-basis) at domain index
/// `eval_idx`, returning the KZG opening proof.
pub fn prove_kzg(
    evals: &[Scalar],
    eval_idx: usize,
    roots: &NttRoots,
    srs: &Srs,
) -> Result<G1Point, KzgError> {
    if eval_idx >= roots.len() {
        return Err(KzgError::EvalIndexOutOfRange(eval_idx));
    }
    let z = roots.roots[eval_idx];
    let y = evals[eval_idx];

    let mut q_evals = derive_quotient(evals, &z, &y, roots)
        .expect("z = roots[eval_idx] is always in the domain");
    inverse_fft_in_place(&mut q_evals, &roots.inv_roots);
    let q = Polynomial::new(q_evals);

    Ok(srs.commit_g1(&q))
}

/// `verify_kzg`: checks `C` opens to `y` at `z` via the proof `pi`.
///
/// `lhs = C - [y]_1 + z * pi`; accepts iff `e(lhs, g2) == e(pi, g2 * s)`.
pub fn verify_kzg(c: &G1Point, z: &Scalar, y: &Scalar, pi: &G1Point, srs: &Srs) -> bool {
    let y_g1 = G1Projective::generator() * *y;
    let lhs = G1Projective::from(*c) - y_g1 + G1Projective::from(*pi) * *z;
    let g2 = G2Projective::from(srs.g2_powers[0]);
    let g2s = G2Projective::from(srs.g2_powers[1]);

    let left = Bls12_381::pairing(lhs.into_affine(), g2.into_affine());
    let right = Bls12_381::pairing(pi.into_affine(), g2s.into_affine());
    left == right
}

/// Fiat-Shamir batched verification of many `(C_i, z_i, y_i, pi_i)`
/// opening claims against a single pairing check.
///
/// `base_r` seeds the per-proof challenge derivation; the caller is
/// responsible for deriving it (`Blake3(tag)` at the block-processor
/// layer) so this crate stays agnostic of any higher-level tagging
/// scheme.
pub fn batch_verify(
    pis: &[G1Point],
    cs: &[G1Point],
    zs: &[Scalar],
    ys: &[Scalar],
    base_r: &[u8],
    srs: &Srs,
) -> bool {
    let n = pis.len();
    if cs.len() != n || zs.len() != n || ys.len() != n || n == 0 {
        return false;
    }

    let mut rs = Vec::with_capacity(n);
    for i in 0..n {
        let mut hasher = blake3::Hasher::new();
        hasher.update(base_r);
        hasher.update(&scalar_le_bytes(&zs[i]));
        hasher.update(&scalar_le_bytes(&ys[i]));
        hasher.update(&compress_g1(&cs[i]));
        hasher.update(&compress_g1(&pis[i]));
        let r_i = hash_to_sk(hasher.finalize().as_bytes());
        if scalar_is_zero(&r_i) {
            return false;
        }
        rs.push(r_i);
    }

    let mut agg_left = G1Projective::generator() * zero_sk();
    let mut agg_right = agg_left;
    for i in 0..n {
        agg_left += G1Projective::from(pis[i]) * rs[i];
        let c_minus_y = G1Projective::from(cs[i]) - G1Projective::generator() * ys[i];
        agg_right += c_minus_y * rs[i] + G1Projective::from(pis[i]) * (rs[i] * zs[i]);
    }

    let g2 = G2Projective::from(srs.g2_powers[0]);
    let g2s = G2Projective::from(srs.g2_powers[1]);
    let left = Bls12_381::pairing(agg_left.into_affine(), g2s.into_affine());
    let right = Bls12_381::pairing(agg_right.into_affine(), g2.into_affine());
    left == right
}

fn scalar_le_bytes(s: &Scalar) -> [u8; 32] {
    crate::scalar::scalar_to_le_bytes(s)
}

/// Re-exposed for callers that want to compare scalars the same way the
/// engine does (constant-time over the canonical encoding).
pub fn scalars_equal(a: &Scalar, b: &Scalar) -> bool {
    equal_scalars(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashing::hash_p1_to_scalar as h;
    use crate::ntt::{build_roots, fft_in_place};
    use crate::scalar::scalar_from;

    fn setup(n: usize) -> (NttRoots, Srs) {
        let roots = build_roots(n);
        let srs = Srs::new(n - 1, scalar_from(13));
        (roots, srs)
    }

    #[test]
    fn single_point_open_and_verify() {
        let n = 256;
        let (roots, srs) = setup(n);
        let mut evals: Vec<Scalar> = (0..n as u64).map(scalar_from).collect();
        fft_in_place(&mut evals, &roots.roots);

        let idx = 17;
        let z = roots.roots[idx];
        let y = evals[idx];
        let commit = srs.commit_g1(&{
            let mut coeffs = evals.clone();
            crate::ntt::inverse_fft_in_place(&mut coeffs, &roots.inv_roots);
            Polynomial::new(coeffs)
        });
        let pi = prove_kzg(&evals, idx, &roots, &srs).unwrap();
        assert!(verify_kzg(&commit, &z, &y, &pi, &srs));

        let wrong_y = y + scalar_from(1);
        assert!(!verify_kzg(&commit, &z, &wrong_y, &pi, &srs));
    }

    #[test]
    fn batch_verify_accepts_all_valid_and_rejects_corruption() {
        let n = 256;
        let (roots, srs) = setup(n);
        let mut evals: Vec<Scalar> = (0..n as u64).map(scalar_from).collect();
        fft_in_place(&mut evals, &roots.roots);
        let mut coeffs = evals.clone();
        crate::ntt::inverse_fft_in_place(&mut coeffs, &roots.inv_roots);
        let commit = srs.commit_g1(&Polynomial::new(coeffs));

        let idxs = [3usize, 9, 200];
        let mut cs = Vec::new();
        let mut zs = Vec::new();
        let mut ys = Vec::new();
        let mut pis = Vec::new();
        for &idx in &idxs {
            cs.push(commit);
            zs.push(roots.roots[idx]);
            ys.push(evals[idx]);
            pis.push(prove_kzg(&evals, idx, &roots, &srs).unwrap());
        }
        let base_r = h(&commit, b"TAG");
        let base_r_bytes = scalar_le_bytes(&base_r);
        assert!(batch_verify(&pis, &cs, &zs, &ys, &base_r_bytes, &srs));

        ys[0] = ys[0] + scalar_from(1);
        assert!(!batch_verify(&pis, &cs, &zs, &ys, &base_r_bytes, &srs));
    }
}
