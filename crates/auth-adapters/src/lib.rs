//! # auth-adapters
//!
//! Implementations of the identity ports: Argon2id password hashing,
//! HS256 JWT bearer tokens (feature `auth-jwt`) and referral codes.

pub mod codes;
pub mod password;

#[cfg(feature = "auth-jwt")]
pub mod jwt;

pub use codes::RandomCodeGenerator;
pub use password::Argon2PasswordHasher;

#[cfg(feature = "auth-jwt")]
pub use jwt::JwtTokenIssuer;
