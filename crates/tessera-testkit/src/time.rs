//! Controllable wall clock

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tessera_core::effects::PhysicalTimeEffects;

/// 2023-11-14T22:13:20Z
pub const DEFAULT_START_MS: u64 = 1_700_000_000_000;

/// Clock that only moves when told to.
///
/// Clones share the same instant, so a test can keep one handle and give
/// another to the components under test.
#[derive(Debug, Clone)]
pub struct ControllableClock {
    now_ms: Arc<AtomicU64>,
}

impl ControllableClock {
    /// Clock frozen at `start_ms`
    pub fn new(start_ms: u64) -> Self {
        Self {
            now_ms: Arc::new(AtomicU64::new(start_ms)),
        }
    }

    /// Move forward by `by`
    pub fn advance(&self, by: Duration) {
        let millis = u64::try_from(by.as_millis()).unwrap_or(u64::MAX);
        self.now_ms.fetch_add(millis, Ordering::SeqCst);
    }

    /// Jump to an absolute instant
    pub fn set_ms(&self, now_ms: u64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }

    /// Current instant without going through the effect trait
    pub fn current_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

impl Default for ControllableClock {
    fn default() -> Self {
        Self::new(DEFAULT_START_MS)
    }
}

#[async_trait]
impl PhysicalTimeEffects for ControllableClock {
    async fn now_ms(&self) -> u64 {
        self.current_ms()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_clones_share_time() {
        let clock = ControllableClock::default();
        let handle = clock.clone();
        clock.advance(Duration::from_secs(2));
        assert_eq!(handle.now_ms().await, DEFAULT_START_MS + 2_000);
        handle.set_ms(5);
        assert_eq!(clock.now_secs().await, 0);
    }
}
