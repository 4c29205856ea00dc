use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use domains::{DomainResult, RateDecision, RateLimiter};

/// Per-process limiter. Counters reset when their window elapses.
pub struct MemoryRateLimiter {
    windows: DashMap<String, (Instant, u32)>,
    max_hits: u32,
    window: Duration,
}

impl MemoryRateLimiter {
    pub fn new(max_hits: u32, window: Duration) -> Self {
        Self { windows: DashMap::new(), max_hits, window }
    }
}

#[async_trait]
impl RateLimiter for MemoryRateLimiter {
    async fn hit(&self, key: &str) -> DomainResult<RateDecision> {
        let now = Instant::now();
        let mut slot = self.windows.entry(key.to_string()).or_insert((now, 0));
        if now.duration_since(slot.0) >= self.window {
            *slot = (now, 0);
        }
        slot.1 += 1;

        let hits = slot.1;
        let elapsed = now.duration_since(slot.0);
        Ok(RateDecision {
            allowed: hits <= self.max_hits,
            remaining: self.max_hits.saturating_sub(hits),
            retry_after_secs: self.window.saturating_sub(elapsed).as_secs().max(1),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    #[tokio::test]
    async fn blocks_after_budget_and_keys_are_independent() {
        let limiter = MemoryRateLimiter::new(2, Duration::from_secs(60));
        assert!(assert_ok!(limiter.hit("login:1.2.3.4").await).allowed);
        assert!(assert_ok!(limiter.hit("login:1.2.3.4").await).allowed);
        let third = assert_ok!(limiter.hit("login:1.2.3.4").await);
        assert!(!third.allowed);
        assert_eq!(third.remaining, 0);
        assert!(limiter.hit("login:5.6.7.8").await.unwrap().allowed);
    }

    #[tokio::test]
    async fn window_resets() {
        let limiter = MemoryRateLimiter::new(1, Duration::from_millis(20));
        assert!(limiter.hit("k").await.unwrap().allowed);
        assert!(!limiter.hit("k").await.unwrap().allowed);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(limiter.hit("k").await.unwrap().allowed);
    }
}
