//! # DomainError
//!
//! Centralized error type for the Questboard ecosystem.
//! Adapters map their failures into these variants so the HTTP layer can
//! pick a status code without knowing which store produced the error.

use thiserror::Error;

/// The primary error type for all domain and service operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Resource not found (e.g., Game, Booking, Conversation)
    #[error("{entity} not found with ID {id}")]
    NotFound { entity: &'static str, id: String },

    /// Input failed validation (e.g., rating out of range, empty message)
    #[error("validation error: {0}")]
    Validation(String),

    /// Missing, invalid or expired credentials
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated, but not allowed to perform the action
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Resource already exists or the state does not allow the transition
    #[error("conflict: {0}")]
    Conflict(String),

    /// Rate limit exceeded
    #[error("too many requests: {0}")]
    RateLimited(String),

    /// Infrastructure failure (e.g., DB down, disk full)
    #[error("internal service error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound { entity, id: id.to_string() }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn internal(msg: impl ToString) -> Self {
        Self::Internal(msg.to_string())
    }
}

/// A specialized Result type for Questboard logic.
pub type DomainResult<T> = std::result::Result<T, DomainError>;
