//! # configs
//!
//! Layered settings for the Questboard binaries. Sources, lowest priority
//! first:
//!
//! 1. `config/default.toml`
//! 2. `config/{APP_ENV}.toml` (optional, `APP_ENV` defaults to `development`)
//! 3. `QUESTBOARD__SECTION__KEY` environment variables
//!
//! A `.env` file is read into the process environment before anything else.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use config::{Config, Environment, File};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

const ENV_PREFIX: &str = "QUESTBOARD";

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid setting {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    pub media: MediaSettings,
    pub rate_limit: RateLimitSettings,
    #[serde(default)]
    pub redis: RedisSettings,
    #[serde(default)]
    pub log: LogSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: IpAddr,
    pub port: u16,
    /// Allowed browser origins; empty allows any origin
    #[serde(default)]
    pub cors_origins: Vec<String>,
    pub request_timeout_secs: u64,
}

impl ServerSettings {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// Postgres URL. When empty the binary runs on the in-memory store.
    #[serde(default = "empty_secret")]
    pub url: SecretString,
    pub max_connections: u32,
}

impl DatabaseSettings {
    pub fn is_configured(&self) -> bool {
        !self.url.expose_secret().trim().is_empty()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    pub jwt_secret: SecretString,
    pub token_ttl_hours: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaSettings {
    pub root: PathBuf,
    /// Public path the stored files are served under (e.g., "/uploads")
    pub url_prefix: String,
    pub max_upload_bytes: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitSettings {
    pub window_secs: u64,
    pub max_attempts: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RedisSettings {
    /// Enables the Redis rate limiter when set
    pub url: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogSettings {
    #[serde(default)]
    pub format: LogFormat,
}

fn empty_secret() -> SecretString {
    SecretString::from(String::new())
}

impl Settings {
    /// Reads `.env`, then the layered sources under `./config`.
    pub fn load() -> Result<Self, SettingsError> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                tracing::warn!(error = %e, "ignoring unreadable .env file");
            }
        }
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".into());
        Self::load_from("config", &env)
    }

    pub fn load_from(dir: &str, env: &str) -> Result<Self, SettingsError> {
        let settings: Settings = Config::builder()
            .add_source(File::with_name(&format!("{dir}/default")).required(false))
            .add_source(File::with_name(&format!("{dir}/{env}")).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.auth.jwt_secret.expose_secret().len() < 32 {
            return Err(SettingsError::Invalid {
                key: "auth.jwt_secret",
                reason: "must be at least 32 bytes".into(),
            });
        }
        if self.auth.token_ttl_hours <= 0 {
            return Err(SettingsError::Invalid { key: "auth.token_ttl_hours", reason: "must be positive".into() });
        }
        if !self.media.url_prefix.starts_with('/') {
            return Err(SettingsError::Invalid { key: "media.url_prefix", reason: "must start with '/'".into() });
        }
        if self.rate_limit.max_attempts == 0 || self.rate_limit.window_secs == 0 {
            return Err(SettingsError::Invalid { key: "rate_limit", reason: "window and attempts must be non-zero".into() });
        }
        Ok(())
    }
}
