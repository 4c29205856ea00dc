//! # storage-adapters
//!
//! Persistence and media adapters for the `domains` ports:
//!
//! - `memory`: `dashmap`-backed repositories, always compiled. Used by tests
//!   and by the binary when no database feature is enabled.
//! - `postgres` (feature `db-postgres`): `sqlx` repositories plus migrations.
//! - `media` (feature `media-local`): content-addressed local disk storage.
//! - `rate_limit`: fixed-window limiters, in memory or Redis (feature `redis`).

pub mod memory;
pub mod rate_limit;

#[cfg(feature = "db-postgres")]
pub mod postgres;

#[cfg(feature = "media-local")]
pub mod media;

pub use memory::{
    MemoryBookingRepo, MemoryConversationRepo, MemoryFavoriteRepo, MemoryFriendRepo, MemoryGameRepo,
    MemoryMessageRepo, MemoryNotificationRepo, MemoryReviewRepo, MemoryUserRepo,
};
pub use rate_limit::MemoryRateLimiter;
