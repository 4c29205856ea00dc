//! # api-adapters
//!
//! The axum HTTP surface (feature `web-axum`): REST routes under `/api`,
//! the `/ws` realtime relay, `/health` and Prometheus `/metrics`.
//! Handlers only translate between HTTP and `services`; every response uses
//! the `{ success, data, message }` envelope.

#[cfg(feature = "web-axum")]
pub mod error;
#[cfg(feature = "web-axum")]
pub mod extract;
#[cfg(feature = "web-axum")]
pub mod metrics;
#[cfg(feature = "web-axum")]
pub mod realtime;
#[cfg(feature = "web-axum")]
pub mod response;
#[cfg(feature = "web-axum")]
pub mod routes;
#[cfg(feature = "web-axum")]
mod router;
#[cfg(feature = "web-axum")]
pub mod state;

#[cfg(feature = "web-axum")]
pub use error::{ApiError, ApiResult};
#[cfg(feature = "web-axum")]
pub use router::router;
#[cfg(feature = "web-axum")]
pub use state::{ApiOptions, AppState};
