//! Error taxonomy for the Reclaim API core.
//!
//! Every failure the core can surface is classified into one of the
//! `ApiError` kinds below. Nothing is ever downgraded to a success value:
//! callers either get a decoded payload or exactly one of these.

use std::time::Duration;

use thiserror::Error;

/// Errors from talking to the Reclaim.ai API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced an HTTP status: connect failure, TLS
    /// failure, timeout, or a broken connection mid-response. Distinct from
    /// any decoded HTTP error status.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The upstream reported 404 for the named resource.
    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    /// The upstream reported 429. `retry_after` is the upstream's
    /// `Retry-After` hint when supplied, otherwise the configured fallback.
    #[error("Rate limited by Reclaim: retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    /// The upstream reported 401 or 403. The message never contains the
    /// credential value.
    #[error("Authentication failed: {message}")]
    Auth { message: String },

    /// Any other 4xx/5xx, with the upstream-provided error text when present.
    #[error("Reclaim API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },
}

impl ApiError {
    /// Stable machine-readable kind string, used by callers for structured
    /// error output and by the failure log hook.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Transport(_) => "transport",
            ApiError::NotFound { .. } => "not_found",
            ApiError::RateLimited { .. } => "rate_limited",
            ApiError::Auth { .. } => "auth",
            ApiError::Api { .. } => "api",
        }
    }

    /// The wait hint for rate-limit failures, `None` for every other kind.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ApiError::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}

/// Errors from configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {key}")]
    MissingKey { key: String },

    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}
