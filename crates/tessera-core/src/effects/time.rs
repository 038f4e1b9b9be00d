//! Wall-clock time effect
//!
//! Session expiry is a pure function of wall-clock time, so every component
//! that evaluates it reads the clock through this trait. Tests substitute a
//! manually advanced clock.

use async_trait::async_trait;
use std::sync::Arc;

/// Wall-clock time source
#[async_trait]
pub trait PhysicalTimeEffects: Send + Sync {
    /// Milliseconds since the Unix epoch
    async fn now_ms(&self) -> u64;

    /// Seconds since the Unix epoch
    async fn now_secs(&self) -> u64 {
        self.now_ms().await / 1000
    }
}

#[async_trait]
impl<T: PhysicalTimeEffects + ?Sized> PhysicalTimeEffects for Arc<T> {
    async fn now_ms(&self) -> u64 {
        (**self).now_ms().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(u64);

    #[async_trait]
    impl PhysicalTimeEffects for Fixed {
        async fn now_ms(&self) -> u64 {
            self.0
        }
    }

    #[tokio::test]
    async fn test_arc_clock_reports_inner_time() {
        let clock: Arc<dyn PhysicalTimeEffects> = Arc::new(Arc::new(Fixed(1_700_000_123_456)));
        assert_eq!(clock.now_ms().await, 1_700_000_123_456);
        assert_eq!(clock.now_secs().await, 1_700_000_123);
    }
}
