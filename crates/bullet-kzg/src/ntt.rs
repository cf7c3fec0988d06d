//! Roots of unity and the number-theoretic transform over `Fr`.

use crate::scalar::{Scalar, scalar_inverse, scalar_mul};
use ark_ff::{FftField, Field};

/// Forward and inverse `n`th-root-of-unity tables for `Fr`.
#[derive(Clone, Debug)]
pub struct NttRoots {
    /// `roots[i] = ω^i` for `i` in `0..n`.
    pub roots: Vec<Scalar>,
    /// `inv_roots[i] = ω^-i` for `i` in `0..n`.
    pub inv_roots: Vec<Scalar>,
}

impl NttRoots {
    /// Domain size these roots were built for.
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    /// `true` iff the domain is empty (never constructed for `n = 0`).
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

/// Computes `ω`, a primitive `n`th root of unity in `Fr`, and the tables
/// `roots[i] = ω^i`, `inv_roots[i] = ω^-i`.
///
/// `n` must be a power of two dividing `q - 1`; `BRANCH_ORDER` (256)
/// always qualifies since BLS12-381's scalar field has 2-adicity 32.
pub fn build_roots(n: usize) -> NttRoots {
    assert!(n.is_power_of_two(), "NTT domain size must be a power of two");
    let omega: Scalar =
        Scalar::get_root_of_unity(n as u64).expect("n must divide q - 1 for Fr");
    debug_assert_eq!(omega.pow([n as u64]), Scalar::from(1u64), "ω^n = 1");
    if n > 1 {
        debug_assert_ne!(
            omega.pow([(n / 2) as u64]),
            Scalar::from(1u64),
            "ω^(n/2) must not be 1"
        );
    }

    let mut roots = Vec::with_capacity(n);
    let mut cur = Scalar::from(1u64);
    for _ in 0..n {
        roots.push(cur);
        cur = scalar_mul(&cur, &omega);
    }
    let omega_inv = scalar_inverse(&omega).expect("ω is never zero");
    let mut inv_roots = Vec::with_capacity(n);
    let mut cur = Scalar::from(1u64);
    for _ in 0..n {
        inv_roots.push(cur);
        cur = scalar_mul(&cur, &omega_inv);
    }
    NttRoots { roots, inv_roots }
}

fn bit_reverse_permute(a: &mut [Scalar]) {
    let n = a.len();
    let bits = n.trailing_zeros();
    for i in 0..n {
        let j = (i as u32).reverse_bits() >> (32 - bits);
        let j = j as usize;
        if j > i {
            a.swap(i, j);
        }
    }
}

/// In-place forward NTT: bit-reversal permutation followed by iterative
/// Cooley-Tukey butterflies using the supplied root table.
pub fn fft_in_place(a: &mut [Scalar], roots: &[Scalar]) {
    let n = a.len();
    assert!(n.is_power_of_two(), "NTT input length must be a power of two");
    assert_eq!(roots.len(), n, "root table must match transform length");

    bit_reverse_permute(a);

    let mut len = 2;
    while len <= n {
        let half = len / 2;
        let step = n / len;
        for start in (0..n).step_by(len) {
            for i in 0..half {
                let w = roots[i * step];
                let u = a[start + i];
                let v = scalar_mul(&a[start + i + half], &w);
                a[start + i] = u + v;
                a[start + i + half] = u - v;
            }
        }
        len *= 2;
    }
}

/// In-place inverse NTT: forward transform with the inverse root table,
/// then scale every element by `n^-1`.
pub fn inverse_fft_in_place(a: &mut [Scalar], inv_roots: &[Scalar]) {
    fft_in_place(a, inv_roots);
    let n_inv = scalar_inverse(&Scalar::from(a.len() as u64)).expect("n is never zero");
    for x in a.iter_mut() {
        *x = scalar_mul(x, &n_inv);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalar::scalar_from;

    #[test]
    fn fft_inverse_round_trips() {
        let n = 256;
        let roots = build_roots(n);
        let mut v: Vec<Scalar> = (0..n as u64).map(scalar_from).collect();
        let original = v.clone();
        fft_in_place(&mut v, &roots.roots);
        inverse_fft_in_place(&mut v, &roots.inv_roots);
        assert_eq!(v, original);
    }

    #[test]
    fn roots_satisfy_sanity_checks() {
        let n = 256;
        let roots = build_roots(n);
        let omega = roots.roots[1];
        assert_eq!(omega.pow([n as u64]), Scalar::from(1u64));
        assert_ne!(omega.pow([(n / 2) as u64]), Scalar::from(1u64));
    }
}
