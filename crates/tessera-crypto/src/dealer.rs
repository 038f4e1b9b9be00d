//! Trusted-dealer key generation for a weighted committee
//!
//! The dealer samples the master secret, splits it with a degree `t-1`
//! polynomial and hands each server `weight` consecutive share indices.
//! Server `k` with weight `w_k` holds indices `W_{<k}+1 ..= W_{<k}+w_k`.

use crate::group::random_scalar;
use crate::shamir::ShamirPolynomial;
use crate::tdh::{MasterPublicKey, SecretKeyShare};
use curve25519_dalek::ristretto::RistrettoPoint;
use rand_core::{CryptoRng, RngCore};
use tessera_core::{Result, TesseraError};

/// Output of a dealing: the public key and each server's shares
#[derive(Debug)]
pub struct DealtKeys {
    /// Committee master public key
    pub master: MasterPublicKey,
    /// Shares per server, in committee order
    pub server_shares: Vec<Vec<SecretKeyShare>>,
}

/// Deal a fresh master key across servers with the given weights
pub fn deal<R: RngCore + CryptoRng>(threshold: u16, weights: &[u8], rng: &mut R) -> Result<DealtKeys> {
    if weights.iter().any(|w| *w == 0) {
        return Err(TesseraError::invalid("key server weight must be at least 1"));
    }
    let total: u32 = weights.iter().map(|w| u32::from(*w)).sum();
    if threshold == 0 || u32::from(threshold) > total {
        return Err(TesseraError::invalid(format!(
            "threshold {threshold} must be in 1..={total}"
        )));
    }

    let secret = random_scalar(rng);
    let poly = ShamirPolynomial::from_secret(secret, usize::from(threshold), rng)?;

    let mut next_index = 1u32;
    let mut server_shares = Vec::with_capacity(weights.len());
    for weight in weights {
        let shares = (0..u32::from(*weight))
            .map(|offset| {
                let point = poly.share(next_index + offset);
                SecretKeyShare::new(next_index + offset, point.y)
            })
            .collect();
        next_index += u32::from(*weight);
        server_shares.push(shares);
    }

    Ok(DealtKeys {
        master: MasterPublicKey(RistrettoPoint::mul_base(&secret)),
        server_shares,
    })
}

/// Share indices held by the server at `position` given committee weights
pub fn indices_for(weights: &[u8], position: usize) -> std::ops::RangeInclusive<u32> {
    let start: u32 = weights[..position].iter().map(|w| u32::from(*w)).sum::<u32>() + 1;
    let weight = u32::from(weights[position]);
    start..=start + weight - 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::rand_core::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_weighted_indices_are_consecutive() {
        let mut rng = ChaCha20Rng::from_seed([5u8; 32]);
        let dealt = deal(3, &[2, 1, 1], &mut rng).unwrap();
        let indices: Vec<Vec<u32>> = dealt
            .server_shares
            .iter()
            .map(|s| s.iter().map(|k| k.index()).collect())
            .collect();
        assert_eq!(indices, vec![vec![1, 2], vec![3], vec![4]]);
        assert_eq!(indices_for(&[2, 1, 1], 0), 1..=2);
        assert_eq!(indices_for(&[2, 1, 1], 2), 4..=4);
    }

    #[test]
    fn test_invalid_parameters() {
        let mut rng = ChaCha20Rng::from_seed([6u8; 32]);
        assert!(deal(0, &[1, 1], &mut rng).is_err());
        assert!(deal(3, &[1, 1], &mut rng).is_err());
        assert!(deal(1, &[1, 0], &mut rng).is_err());
    }
}
