//! # domains
//!
//! Entities, value types and port traits for the Questboard marketplace.
//! Nothing in this crate performs I/O; adapters implement the ports.

pub mod error;
pub mod models;
pub mod ports;

pub use error::{DomainError, DomainResult};
pub use models::*;
pub use ports::*;
