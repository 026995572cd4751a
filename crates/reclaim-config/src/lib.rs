//! Environment-driven configuration.
//!
//! Everything is read from `RECLAIM_*` variables. Only [`ENV_API_KEY`] is
//! required; the rest fall back to the defaults below. Values that are set
//! but empty count as unset.

use std::env;
use std::time::Duration;

use reclaim_types::{ConfigError, Credential};

/// Production API origin.
pub const DEFAULT_BASE_URL: &str = "https://api.app.reclaim.ai";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 60;
/// Wait hinted to callers when a 429 arrives without a usable Retry-After.
pub const DEFAULT_RATE_LIMIT_FALLBACK_SECS: u64 = 60;

pub const ENV_API_KEY: &str = "RECLAIM_API_KEY";
pub const ENV_BASE_URL: &str = "RECLAIM_BASE_URL";
pub const ENV_HTTP_TIMEOUT_SECS: &str = "RECLAIM_HTTP_TIMEOUT_SECS";
pub const ENV_CACHE_TTL_SECS: &str = "RECLAIM_CACHE_TTL_SECS";
pub const ENV_RATE_LIMIT_FALLBACK_SECS: &str = "RECLAIM_RATE_LIMIT_FALLBACK_SECS";

/// Resolved settings for one process.
#[derive(Debug, Clone)]
pub struct Settings {
    pub credential: Credential,
    pub http_timeout: Duration,
    /// Default TTL for cached reads; zero disables caching.
    pub cache_ttl: Duration,
    pub rate_limit_fallback: Duration,
}

impl Settings {
    /// Reads settings from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads settings through `lookup` instead of the real environment, so
    /// tests stay hermetic without mutating process state.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let api_key = get(ENV_API_KEY).ok_or_else(|| ConfigError::MissingKey {
            key: ENV_API_KEY.to_string(),
        })?;
        let base_url = get(ENV_BASE_URL).unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(Self {
            credential: Credential::new(api_key.trim(), base_url.trim()),
            http_timeout: parse_secs(
                ENV_HTTP_TIMEOUT_SECS,
                get(ENV_HTTP_TIMEOUT_SECS),
                DEFAULT_HTTP_TIMEOUT_SECS,
            )?,
            cache_ttl: parse_secs(ENV_CACHE_TTL_SECS, get(ENV_CACHE_TTL_SECS), DEFAULT_CACHE_TTL_SECS)?,
            rate_limit_fallback: parse_secs(
                ENV_RATE_LIMIT_FALLBACK_SECS,
                get(ENV_RATE_LIMIT_FALLBACK_SECS),
                DEFAULT_RATE_LIMIT_FALLBACK_SECS,
            )?,
        })
    }
}

fn parse_secs(key: &str, raw: Option<String>, default_secs: u64) -> Result<Duration, ConfigError> {
    match raw {
        None => Ok(Duration::from_secs(default_secs)),
        Some(raw) => raw.trim().parse::<u64>().map(Duration::from_secs).map_err(|_| {
            ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("expected whole seconds, got {raw:?}"),
            }
        }),
    }
}
