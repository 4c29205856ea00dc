//! Fixed-window rate limiters.

mod memory;
#[cfg(feature = "redis")]
mod redis;

pub use memory::MemoryRateLimiter;
#[cfg(feature = "redis")]
pub use redis::RedisRateLimiter;
