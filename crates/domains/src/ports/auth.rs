//! Identity contracts: password hashing and bearer tokens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(any(test, feature = "testing"))]
use mockall::automock;

use crate::error::DomainResult;
use crate::models::Role;

/// Verified token contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: Uuid,
    pub role: Role,
    /// Expiry, seconds since the Unix epoch
    pub exp: i64,
    pub iat: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[cfg_attr(any(test, feature = "testing"), automock)]
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> DomainResult<String>;
    /// False on mismatch or on an unparsable hash.
    fn verify(&self, password: &str, hash: &str) -> bool;
}

#[cfg_attr(any(test, feature = "testing"), automock)]
pub trait TokenIssuer: Send + Sync {
    fn issue(&self, user_id: Uuid, role: Role) -> DomainResult<IssuedToken>;
    /// `DomainError::Unauthorized` for malformed, forged or expired tokens.
    fn verify(&self, token: &str) -> DomainResult<TokenClaims>;
}

/// Source of the short shareable codes handed out at registration.
#[cfg_attr(any(test, feature = "testing"), automock)]
pub trait CodeGenerator: Send + Sync {
    fn referral_code(&self) -> String;
}
