//! Shared types and error taxonomy for the Reclaim.ai API core.

pub mod credential;
pub mod error;
pub mod request;

pub use credential::Credential;
pub use error::{ApiError, ConfigError};
pub use request::{Method, Request};
