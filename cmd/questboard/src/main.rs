//! # Questboard server
//!
//! Assembles the application from the adapters selected at compile time
//! and the layered settings in `config/`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use api_adapters::{router, ApiOptions, AppState};
use auth_adapters::{Argon2PasswordHasher, JwtTokenIssuer, RandomCodeGenerator};
use configs::{LogFormat, Settings};
use domains::RateLimiter;
use secrecy::ExposeSecret;
use services::{AppServices, Ports, ServiceOptions};
use storage_adapters::media::LocalMediaStorage;
use storage_adapters::MemoryRateLimiter;
use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("loading settings")?;
    init_tracing(settings.log.format);

    // 1. Adapters
    let ports = ports(&settings).await?;

    // 2. Services and HTTP
    let services = AppServices::new(ports, ServiceOptions { max_upload_bytes: settings.media.max_upload_bytes });
    let state = AppState::new(services, auth_limiter(&settings)?);
    let options = ApiOptions {
        cors_origins: settings.server.cors_origins.clone(),
        request_timeout: Duration::from_secs(settings.server.request_timeout_secs),
        media: Some((settings.media.root.clone(), settings.media.url_prefix.clone())),
        max_upload_bytes: usize::try_from(settings.media.max_upload_bytes).unwrap_or(usize::MAX),
    };
    let app = router(state, &options);

    let addr = settings.server.addr();
    let listener = TcpListener::bind(addr).await.with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, version = env!("CARGO_PKG_VERSION"), "questboard listening");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("questboard stopped");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

/// Postgres repositories when a database URL is configured, the in-memory
/// store otherwise.
#[cfg_attr(not(feature = "db-postgres"), allow(unused_mut))]
async fn ports(settings: &Settings) -> anyhow::Result<Ports> {
    let mut ports = memory_ports(settings);
    if !settings.database.is_configured() {
        tracing::warn!("no database url configured, data lives in memory and is lost on restart");
        return Ok(ports);
    }

    #[cfg(feature = "db-postgres")]
    {
        use storage_adapters::postgres::{self, *};

        let pool = postgres::connect(settings.database.url.expose_secret(), settings.database.max_connections)
            .await
            .context("connecting to postgres")?;
        postgres::migrate(&pool).await.context("running migrations")?;
        tracing::info!(max_connections = settings.database.max_connections, "postgres ready");

        ports.users = Arc::new(PgUserRepo::new(pool.clone()));
        ports.games = Arc::new(PgGameRepo::new(pool.clone()));
        ports.bookings = Arc::new(PgBookingRepo::new(pool.clone()));
        ports.reviews = Arc::new(PgReviewRepo::new(pool.clone()));
        ports.conversations = Arc::new(PgConversationRepo::new(pool.clone()));
        ports.messages = Arc::new(PgMessageRepo::new(pool.clone()));
        ports.friends = Arc::new(PgFriendRepo::new(pool.clone()));
        ports.notifications = Arc::new(PgNotificationRepo::new(pool.clone()));
        ports.favorites = Arc::new(PgFavoriteRepo::new(pool));
    }

    #[cfg(not(feature = "db-postgres"))]
    tracing::warn!("database url ignored: built without the db-postgres feature");

    Ok(ports)
}

fn memory_ports(settings: &Settings) -> Ports {
    use storage_adapters::*;

    Ports {
        users: Arc::new(MemoryUserRepo::new()),
        games: Arc::new(MemoryGameRepo::new()),
        bookings: Arc::new(MemoryBookingRepo::new()),
        reviews: Arc::new(MemoryReviewRepo::new()),
        conversations: Arc::new(MemoryConversationRepo::new()),
        messages: Arc::new(MemoryMessageRepo::new()),
        friends: Arc::new(MemoryFriendRepo::new()),
        notifications: Arc::new(MemoryNotificationRepo::new()),
        favorites: Arc::new(MemoryFavoriteRepo::new()),
        hasher: Arc::new(Argon2PasswordHasher::new()),
        tokens: Arc::new(JwtTokenIssuer::new(
            settings.auth.jwt_secret.expose_secret().as_bytes(),
            settings.auth.token_ttl_hours,
        )),
        codes: Arc::new(RandomCodeGenerator::default()),
        media: Arc::new(LocalMediaStorage::new(settings.media.root.clone(), settings.media.url_prefix.clone())),
    }
}

fn auth_limiter(settings: &Settings) -> anyhow::Result<Arc<dyn RateLimiter>> {
    let limits = &settings.rate_limit;

    #[cfg(feature = "redis")]
    if let Some(url) = settings.redis.url.as_deref() {
        use deadpool_redis::{Config, Runtime};

        let pool = Config::from_url(url)
            .create_pool(Some(Runtime::Tokio1))
            .context("creating redis pool")?;
        tracing::info!("rate limiting through redis");
        return Ok(Arc::new(storage_adapters::rate_limit::RedisRateLimiter::new(
            pool,
            limits.max_attempts,
            limits.window_secs,
        )));
    }

    Ok(Arc::new(MemoryRateLimiter::new(limits.max_attempts, Duration::from_secs(limits.window_secs))))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl+c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => tracing::error!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received ctrl+c, shutting down"),
        _ = terminate => tracing::info!("received terminate, shutting down"),
    }
}
