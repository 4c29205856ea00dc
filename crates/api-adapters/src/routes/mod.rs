pub mod admin;
pub mod auth;
pub mod bookings;
pub mod games;
pub mod health;
pub mod messages;
pub mod payments;
pub mod upload;
pub mod users;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Counts one attempt for `key` against the auth limiter.
pub(crate) async fn throttle(state: &AppState, key: &str) -> ApiResult<()> {
    let decision = state.auth_limiter.hit(key).await?;
    if decision.allowed {
        Ok(())
    } else {
        tracing::warn!(%key, "rate limit exceeded");
        Err(ApiError::TooManyRequests { retry_after_secs: decision.retry_after_secs })
    }
}
