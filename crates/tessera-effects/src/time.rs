//! Time effect handler backed by the system clock

use async_trait::async_trait;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tessera_core::effects::PhysicalTimeEffects;

/// Real time handler for production use
#[derive(Debug, Clone, Default)]
pub struct RealTimeHandler;

impl RealTimeHandler {
    /// Create a new real time handler
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PhysicalTimeEffects for RealTimeHandler {
    async fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_clock_is_after_2020_and_monotone_enough() {
        let handler = RealTimeHandler::new();
        let first = handler.now_ms().await;
        let second = handler.now_ms().await;
        assert!(first > 1_577_836_800_000);
        assert!(second >= first);
        assert!(handler.now_secs().await >= second / 1000);
    }
}
