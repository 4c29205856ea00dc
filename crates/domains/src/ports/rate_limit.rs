//! Request throttling contract (login and registration attempts).

use async_trait::async_trait;

#[cfg(any(test, feature = "testing"))]
use mockall::automock;

use crate::error::DomainResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub remaining: u32,
    /// Seconds until the current window resets
    pub retry_after_secs: u64,
}

#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Counts one hit against `key` and reports whether it is within budget.
    async fn hit(&self, key: &str) -> DomainResult<RateDecision>;
}
