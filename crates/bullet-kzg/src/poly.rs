//! Dense polynomials, coefficient-basis arithmetic, and the KZG quotient
//! construction.

use crate::ntt::NttRoots;
use crate::scalar::{Scalar, scalar_inverse, scalar_is_zero, scalar_mul, zero_sk};

/// A dense polynomial represented as coefficients, low-degree first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Polynomial(pub Vec<Scalar>);

impl Polynomial {
    /// Wraps raw coefficients (low-degree first).
    pub fn new(coeffs: Vec<Scalar>) -> Self {
        Polynomial(coeffs)
    }

    /// The zero polynomial.
    pub fn zero() -> Self {
        Polynomial(Vec::new())
    }

    /// Number of coefficients currently stored (not the normalized degree).
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` iff there are no coefficients stored.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Drops trailing zero coefficients.
    pub fn normalize(&mut self) {
        while matches!(self.0.last(), Some(c) if scalar_is_zero(c)) {
            self.0.pop();
        }
    }

    /// Evaluates the polynomial at `x` via Horner's method.
    pub fn eval(&self, x: &Scalar) -> Scalar {
        let mut acc = zero_sk();
        for c in self.0.iter().rev() {
            acc = scalar_mul(&acc, x) + *c;
        }
        acc
    }

    /// `self + other`.
    pub fn add(&self, other: &Polynomial) -> Polynomial {
        let len = self.0.len().max(other.0.len());
        let mut out = Vec::with_capacity(len);
        for i in 0..len {
            let a = self.0.get(i).copied().unwrap_or_else(zero_sk);
            let b = other.0.get(i).copied().unwrap_or_else(zero_sk);
            out.push(a + b);
        }
        let mut p = Polynomial(out);
        p.normalize();
        p
    }

    /// `self - other`.
    pub fn sub(&self, other: &Polynomial) -> Polynomial {
        let len = self.0.len().max(other.0.len());
        let mut out = Vec::with_capacity(len);
        for i in 0..len {
            let a = self.0.get(i).copied().unwrap_or_else(zero_sk);
            let b = other.0.get(i).copied().unwrap_or_else(zero_sk);
            out.push(a - b);
        }
        let mut p = Polynomial(out);
        p.normalize();
        p
    }

    /// `self * scalar`, coefficient-wise.
    pub fn scale(&self, s: &Scalar) -> Polynomial {
        Polynomial(self.0.iter().map(|c| scalar_mul(c, s)).collect())
    }

    /// Naive `O(n^2)` polynomial multiplication.
    pub fn mul(&self, other: &Polynomial) -> Polynomial {
        if self.0.is_empty() || other.0.is_empty() {
            return Polynomial::zero();
        }
        let mut out = vec![zero_sk(); self.0.len() + other.0.len() - 1];
        for (i, a) in self.0.iter().enumerate() {
            if scalar_is_zero(a) {
                continue;
            }
            for (j, b) in other.0.iter().enumerate() {
                out[i + j] = out[i + j] + scalar_mul(a, b);
            }
        }
        let mut p = Polynomial(out);
        p.normalize();
        p
    }

    /// Schoolbook long division: `self = quotient * divisor + remainder`.
    ///
    /// `divisor` must be non-zero (after normalization).
    pub fn divmod(&self, divisor: &Polynomial) -> (Polynomial, Polynomial) {
        let mut divisor = divisor.clone();
        divisor.normalize();
        assert!(!divisor.0.is_empty(), "division by the zero polynomial");

        let mut remainder = self.clone();
        remainder.normalize();
        let divisor_deg = divisor.0.len() - 1;
        let lead_inv =
            scalar_inverse(divisor.0.last().expect("non-empty")).expect("lead coeff nonzero");

        if remainder.0.len() < divisor.0.len() {
            return (Polynomial::zero(), remainder);
        }

        let mut quotient = vec![zero_sk(); remainder.0.len() - divisor_deg];
        while remainder.0.len() >= divisor.0.len() {
            let rem_deg = remainder.0.len() - 1;
            let coeff = scalar_mul(&remainder.0[rem_deg], &lead_inv);
            let shift = rem_deg - divisor_deg;
            quotient[shift] = coeff;
            for (i, d) in divisor.0.iter().enumerate() {
                let idx = shift + i;
                remainder.0[idx] = remainder.0[idx] - scalar_mul(&coeff, d);
            }
            remainder.normalize();
        }
        let mut quotient = Polynomial(quotient);
        quotient.normalize();
        (quotient, remainder)
    }
}

/// Given `evals` in evaluation basis over the NTT domain `roots`, returns
/// `Q` in evaluation basis such that `Q(ω^i) = (F(ω^i) - y) / (ω^i - z)`
/// for `ω^i != z`, handling the coincident point `ω^i == z` via the
/// standard L'Hopital-style formula for the KZG quotient. Returns `None`
/// if `z` does not appear in the evaluation domain.
pub fn derive_quotient(
    evals: &[Scalar],
    z: &Scalar,
    y: &Scalar,
    roots: &NttRoots,
) -> Option<Vec<Scalar>> {
    let n = evals.len();
    assert_eq!(roots.len(), n, "roots must match the evaluation length");
    let z_idx = roots.roots.iter().position(|r| r == z)?;

    let mut q = vec![zero_sk(); n];
    for i in 0..n {
        if i == z_idx {
            continue;
        }
        let denom = roots.roots[i] - *z;
        let denom_inv = scalar_inverse(&denom).expect("i != z_idx so denom is nonzero");
        q[i] = scalar_mul(&(evals[i] - *y), &denom_inv);
    }

    // Q(z): sum the contribution every other evaluation makes to the
    // derivative at z, i.e. the standard same-point KZG formula
    // Q(z) = -sum_{i != z_idx} q[i] * ω^i / ω^(z_idx).
    let mut acc = zero_sk();
    let z_root = roots.roots[z_idx];
    for i in 0..n {
        if i == z_idx {
            continue;
        }
        let ratio = scalar_mul(&q[i], &roots.roots[i]);
        acc = acc - ratio;
    }
    let z_inv = scalar_inverse(&z_root).expect("roots of unity are never zero");
    q[z_idx] = scalar_mul(&acc, &z_inv);

    Some(q)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ntt::{build_roots, fft_in_place, inverse_fft_in_place};
    use crate::scalar::scalar_from;

    #[test]
    fn add_sub_are_inverses() {
        let a = Polynomial::new(vec![scalar_from(1), scalar_from(2), scalar_from(3)]);
        let b = Polynomial::new(vec![scalar_from(4), scalar_from(5)]);
        let sum = a.add(&b);
        let back = sum.sub(&b);
        assert_eq!(back, a);
    }

    #[test]
    fn mul_matches_eval() {
        let a = Polynomial::new(vec![scalar_from(1), scalar_from(1)]); // 1 + x
        let b = Polynomial::new(vec![scalar_from(2), scalar_from(1)]); // 2 + x
        let prod = a.mul(&b); // 2 + 3x + x^2
        let x = scalar_from(5);
        assert_eq!(prod.eval(&x), a.eval(&x) * b.eval(&x));
    }

    #[test]
    fn divmod_recovers_quotient_and_remainder() {
        // (x^2 - 1) / (x - 1) = x + 1, remainder 0.
        let dividend = Polynomial::new(vec![-scalar_from(1), scalar_from(0), scalar_from(1)]);
        let divisor = Polynomial::new(vec![-scalar_from(1), scalar_from(1)]);
        let (q, r) = dividend.divmod(&divisor);
        assert_eq!(q, Polynomial::new(vec![scalar_from(1), scalar_from(1)]));
        assert!(r.0.is_empty());
    }

    #[test]
    fn derive_quotient_matches_division_at_sample_points() {
        let n = 256;
        let roots = build_roots(n);
        let mut coeffs = vec![scalar_from(0); n];
        coeffs[0] = scalar_from(3);
        coeffs[1] = scalar_from(2);
        let poly = Polynomial::new(coeffs.clone());

        let mut evals = coeffs.clone();
        fft_in_place(&mut evals, &roots.roots);

        let z_idx = 5;
        let z = roots.roots[z_idx];
        let y = poly.eval(&z);

        let mut q_evals = derive_quotient(&evals, &z, &y, &roots).unwrap();
        inverse_fft_in_place(&mut q_evals, &roots.inv_roots);
        let q = Polynomial::new(q_evals);

        let divisor = Polynomial::new(vec![-z, scalar_from(1)]);
        let numerator = poly.sub(&Polynomial::new(vec![y]));
        let (expected_q, remainder) = numerator.divmod(&divisor);
        assert!(remainder.0.is_empty());

        let test_point = scalar_from(99);
        assert_eq!(q.eval(&test_point), expected_q.eval(&test_point));
    }
}
