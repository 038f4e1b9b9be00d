//! Random effect handler backed by the operating system CSPRNG

use async_trait::async_trait;
use rand::rngs::OsRng;
use rand::RngCore;
use tessera_core::effects::RandomEffects;

/// Real random handler using the operating system's secure generator
#[derive(Debug, Clone, Default)]
pub struct RealRandomHandler;

impl RealRandomHandler {
    /// Create a new real random handler
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RandomEffects for RealRandomHandler {
    async fn random_bytes(&self, len: usize) -> Vec<u8> {
        let mut bytes = vec![0u8; len];
        OsRng.fill_bytes(&mut bytes);
        bytes
    }

    async fn random_bytes_32(&self) -> [u8; 32] {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lengths_and_freshness() {
        let handler = RealRandomHandler::new();
        assert_eq!(handler.random_bytes(8).await.len(), 8);
        assert!(handler.random_bytes(0).await.is_empty());
        assert_ne!(handler.random_bytes_32().await, handler.random_bytes_32().await);
    }
}
