//! Randomness effect
//!
//! # Effect Classification
//!
//! - **Category**: Infrastructure Effect
//! - **Implementation**: `tessera-effects` (OS CSPRNG)
//! - **Usage**: key-identity nonces, encryption randomness, session keys
//!
//! Every implementation must be a cryptographically secure generator.
//! Predictable output here lets an attacker reuse key identities or recover
//! encryption randomness.

use async_trait::async_trait;
use std::sync::Arc;

/// Source of cryptographically secure random bytes
#[async_trait]
pub trait RandomEffects: Send + Sync {
    /// Fill a fresh buffer of `len` random bytes
    async fn random_bytes(&self, len: usize) -> Vec<u8>;

    /// 32 random bytes, typically used as a seed or secret key
    async fn random_bytes_32(&self) -> [u8; 32];
}

#[async_trait]
impl<T: RandomEffects + ?Sized> RandomEffects for Arc<T> {
    async fn random_bytes(&self, len: usize) -> Vec<u8> {
        (**self).random_bytes(len).await
    }

    async fn random_bytes_32(&self) -> [u8; 32] {
        (**self).random_bytes_32().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU8, Ordering};

    struct Counter(AtomicU8);

    #[async_trait]
    impl RandomEffects for Counter {
        async fn random_bytes(&self, len: usize) -> Vec<u8> {
            vec![self.0.fetch_add(1, Ordering::SeqCst); len]
        }

        async fn random_bytes_32(&self) -> [u8; 32] {
            [self.0.fetch_add(1, Ordering::SeqCst); 32]
        }
    }

    #[tokio::test]
    async fn test_arc_delegates_to_shared_source() {
        let source = Arc::new(Counter(AtomicU8::new(1)));
        let shared: Arc<dyn RandomEffects> = Arc::new(source.clone());

        assert_eq!(shared.random_bytes(3).await, vec![1, 1, 1]);
        assert_eq!(source.random_bytes_32().await, [2; 32]);
        assert_eq!(shared.random_bytes_32().await, [3; 32]);
    }
}
