use std::sync::Arc;
use std::time::Duration;

use domains::RateLimiter;
use services::AppServices;

use crate::metrics::Metrics;
use crate::realtime::RealtimeHub;

/// Shared by every handler. Cloning is cheap: everything inside is `Arc`ed.
#[derive(Clone)]
pub struct AppState {
    pub services: AppServices,
    pub hub: RealtimeHub,
    /// Throttles login and registration per client IP
    pub auth_limiter: Arc<dyn RateLimiter>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(services: AppServices, auth_limiter: Arc<dyn RateLimiter>) -> Self {
        Self {
            services,
            hub: RealtimeHub::default(),
            auth_limiter,
            metrics: Arc::new(Metrics::new()),
        }
    }
}

/// HTTP-layer settings the binary passes in from its configuration.
#[derive(Debug, Clone)]
pub struct ApiOptions {
    /// Empty allows any origin
    pub cors_origins: Vec<String>,
    pub request_timeout: Duration,
    /// Directory and URL prefix stored media is served from. `None` skips
    /// the static file route.
    pub media: Option<(std::path::PathBuf, String)>,
    pub max_upload_bytes: usize,
}

impl Default for ApiOptions {
    fn default() -> Self {
        Self {
            cors_origins: Vec::new(),
            request_timeout: Duration::from_secs(30),
            media: None,
            max_upload_bytes: 5 * 1024 * 1024,
        }
    }
}
