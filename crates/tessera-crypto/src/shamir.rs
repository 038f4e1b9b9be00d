//! Shamir secret sharing and Lagrange interpolation over the Ristretto scalar field
//!
//! Key servers hold evaluations f(i) of a degree t-1 polynomial whose constant
//! term is the master secret. Decryption shares are combined "in the exponent"
//! with the same Lagrange coefficients used to recover f(0).

use crate::group::random_scalar;
use curve25519_dalek::scalar::Scalar;
use rand_core::{CryptoRng, RngCore};
use tessera_core::{Result, TesseraError};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Polynomial for Shamir secret sharing
///
/// Represents f(x) = a_0 + a_1*x + ... + a_{t-1}*x^{t-1} where a_0 is the secret
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ShamirPolynomial {
    coefficients: Vec<Scalar>,
}

impl ShamirPolynomial {
    /// Create a random polynomial of degree `threshold - 1` with `secret` as constant term
    pub fn from_secret<R: RngCore + CryptoRng>(
        secret: Scalar,
        threshold: usize,
        rng: &mut R,
    ) -> Result<Self> {
        if threshold == 0 {
            return Err(TesseraError::invalid("threshold must be positive"));
        }

        let mut coefficients = Vec::with_capacity(threshold);
        coefficients.push(secret);
        for _ in 1..threshold {
            coefficients.push(random_scalar(rng));
        }

        Ok(ShamirPolynomial { coefficients })
    }

    /// Evaluate at `x` using Horner's method
    pub fn evaluate(&self, x: Scalar) -> Scalar {
        let mut result = Scalar::ZERO;
        for coeff in self.coefficients.iter().rev() {
            result = result * x + coeff;
        }
        result
    }

    /// Evaluate at the share index `index`
    pub fn share(&self, index: u32) -> SharePoint {
        let x = index_to_scalar(index);
        SharePoint {
            x,
            y: self.evaluate(x),
        }
    }

    /// The secret (constant term)
    pub fn secret(&self) -> Scalar {
        self.coefficients[0]
    }

    /// Threshold (degree + 1)
    pub fn threshold(&self) -> usize {
        self.coefficients.len()
    }
}

/// A share point (index, f(index))
#[derive(Clone, Copy, Debug)]
pub struct SharePoint {
    /// Share index as a field element
    pub x: Scalar,
    /// Share value f(x)
    pub y: Scalar,
}

/// Lagrange interpolation for secret and in-the-exponent reconstruction
pub struct LagrangeInterpolation;

impl LagrangeInterpolation {
    /// Lagrange basis coefficients L_i(0) for the given x coordinates.
    ///
    /// Fails on an empty set, a zero coordinate, or duplicate coordinates.
    pub fn coefficients_at_zero(xs: &[Scalar]) -> Result<Vec<Scalar>> {
        if xs.is_empty() {
            return Err(TesseraError::invalid("cannot interpolate with zero shares"));
        }
        if xs.iter().any(|x| *x == Scalar::ZERO) {
            return Err(TesseraError::invalid("share index zero is reserved for the secret"));
        }

        let mut coefficients = Vec::with_capacity(xs.len());
        for (i, x_i) in xs.iter().enumerate() {
            let mut basis = Scalar::ONE;
            for (j, x_j) in xs.iter().enumerate() {
                if i == j {
                    continue;
                }
                let denominator = x_i - x_j;
                if denominator == Scalar::ZERO {
                    return Err(TesseraError::invalid("duplicate share index"));
                }
                // L_i(0) *= -x_j / (x_i - x_j)
                basis *= -x_j * denominator.invert();
            }
            coefficients.push(basis);
        }
        Ok(coefficients)
    }

    /// Interpolate shares to recover f(0)
    pub fn interpolate_at_zero(shares: &[SharePoint]) -> Result<Scalar> {
        let xs: Vec<Scalar> = shares.iter().map(|s| s.x).collect();
        let coefficients = Self::coefficients_at_zero(&xs)?;
        Ok(shares
            .iter()
            .zip(coefficients)
            .map(|(share, lambda)| share.y * lambda)
            .sum())
    }
}

/// Map a share index to its field element
pub fn index_to_scalar(index: u32) -> Scalar {
    Scalar::from(u64::from(index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand_chacha::rand_core::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn points(poly: &ShamirPolynomial, indices: &[u32]) -> Vec<SharePoint> {
        indices.iter().map(|i| poly.share(*i)).collect()
    }

    #[test]
    fn test_polynomial_evaluate_at_zero() {
        let mut rng = ChaCha20Rng::from_seed([1u8; 32]);
        let secret = Scalar::from(123u64);
        let poly = ShamirPolynomial::from_secret(secret, 3, &mut rng).unwrap();

        assert_eq!(poly.evaluate(Scalar::ZERO), secret);
        assert_eq!(poly.threshold(), 3);
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let mut rng = ChaCha20Rng::from_seed([1u8; 32]);
        assert!(ShamirPolynomial::from_secret(Scalar::ONE, 0, &mut rng).is_err());
    }

    #[test]
    fn test_any_threshold_subset_reconstructs() {
        let mut rng = ChaCha20Rng::from_seed([2u8; 32]);
        let secret = Scalar::from(777u64);
        let poly = ShamirPolynomial::from_secret(secret, 3, &mut rng).unwrap();

        for subset in [[1, 2, 3], [2, 3, 4], [1, 3, 5]] {
            let shares = points(&poly, &subset);
            assert_eq!(
                LagrangeInterpolation::interpolate_at_zero(&shares).unwrap(),
                secret
            );
        }
    }

    #[test]
    fn test_insufficient_shares_do_not_reconstruct() {
        let mut rng = ChaCha20Rng::from_seed([3u8; 32]);
        let secret = Scalar::from(888u64);
        let poly = ShamirPolynomial::from_secret(secret, 3, &mut rng).unwrap();

        let shares = points(&poly, &[1, 2]);
        let result = LagrangeInterpolation::interpolate_at_zero(&shares).unwrap();
        assert_ne!(result, secret);
    }

    #[test]
    fn test_duplicate_index_rejected() {
        let mut rng = ChaCha20Rng::from_seed([4u8; 32]);
        let poly = ShamirPolynomial::from_secret(Scalar::ONE, 2, &mut rng).unwrap();
        let shares = points(&poly, &[1, 1]);
        assert!(LagrangeInterpolation::interpolate_at_zero(&shares).is_err());
        assert!(LagrangeInterpolation::interpolate_at_zero(&[]).is_err());
    }

    proptest! {
        #[test]
        fn prop_threshold_shares_recover_secret(
            seed in any::<[u8; 32]>(),
            threshold in 1usize..6,
            extra in 0usize..4,
        ) {
            let mut rng = ChaCha20Rng::from_seed(seed);
            let secret = random_scalar(&mut rng);
            let poly = ShamirPolynomial::from_secret(secret, threshold, &mut rng).unwrap();
            let total = (threshold + extra) as u32;

            // The last `threshold` indices are as good as the first ones
            let indices: Vec<u32> = ((total - threshold as u32 + 1)..=total).collect();
            let shares = points(&poly, &indices);
            prop_assert_eq!(LagrangeInterpolation::interpolate_at_zero(&shares).unwrap(), secret);

            if threshold > 1 {
                let short = &shares[..threshold - 1];
                prop_assert_ne!(LagrangeInterpolation::interpolate_at_zero(short).unwrap(), secret);
            }
        }
    }
}
