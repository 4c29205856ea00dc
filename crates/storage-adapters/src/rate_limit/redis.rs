use async_trait::async_trait;
use deadpool_redis::{redis::AsyncCommands, Pool};
use domains::{DomainError, DomainResult, RateDecision, RateLimiter};

/// Shared limiter for multi-instance deployments: `INCR` a per-window key
/// and set its TTL on first hit.
pub struct RedisRateLimiter {
    pool: Pool,
    max_hits: u32,
    window_secs: u64,
    prefix: String,
}

impl RedisRateLimiter {
    pub fn new(pool: Pool, max_hits: u32, window_secs: u64) -> Self {
        Self { pool, max_hits, window_secs, prefix: "questboard:rl".into() }
    }
}

#[async_trait]
impl RateLimiter for RedisRateLimiter {
    async fn hit(&self, key: &str) -> DomainResult<RateDecision> {
        let mut conn = self.pool.get().await.map_err(DomainError::internal)?;
        let redis_key = format!("{}:{}", self.prefix, key);

        let hits: u32 = conn.incr(&redis_key, 1).await.map_err(DomainError::internal)?;
        if hits == 1 {
            let _: () = conn
                .expire(&redis_key, self.window_secs as i64)
                .await
                .map_err(DomainError::internal)?;
        }
        let ttl: i64 = conn.ttl(&redis_key).await.map_err(DomainError::internal)?;

        Ok(RateDecision {
            allowed: hits <= self.max_hits,
            remaining: self.max_hits.saturating_sub(hits),
            retry_after_secs: ttl.max(1) as u64,
        })
    }
}
