//! # Core Traits (Ports)
//!
//! Any adapter must implement these traits to be wired into the binary.
//! With the `testing` feature every port also gets a mockall `MockXxx`.

pub mod auth;
pub mod media;
pub mod rate_limit;
pub mod repositories;

pub use auth::*;
pub use media::*;
pub use rate_limit::*;
pub use repositories::*;
