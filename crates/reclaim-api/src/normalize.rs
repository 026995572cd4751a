//! Response normalization.
//!
//! Folds a [`RawResponse`] into `Result<Value, ApiError>` so every call site
//! sees one shape. The status table is fixed: 2xx parses the body (empty
//! body becomes `Value::Null`), 404 is not-found, 429 is rate-limited with a
//! concrete wait, 401/403 is an auth failure that never echoes the
//! credential, and everything else is a generic API error carrying whatever
//! the upstream said.

use std::time::Duration;

use reclaim_types::ApiError;
use serde_json::Value;

use crate::transport::RawResponse;

/// Longest upstream body fragment quoted in an error message.
const MESSAGE_CAP: usize = 300;

pub fn normalize(
    raw: RawResponse,
    path: &str,
    rate_limit_fallback: Duration,
) -> Result<Value, ApiError> {
    match raw.status {
        200..=299 => {
            if raw.body.trim().is_empty() {
                Ok(Value::Null)
            } else {
                serde_json::from_str(&raw.body).map_err(|_| ApiError::Api {
                    status: raw.status,
                    message: "response body was not valid JSON".to_string(),
                })
            }
        }
        404 => Err(ApiError::NotFound { resource: path.to_string() }),
        429 => Err(ApiError::RateLimited {
            retry_after: parse_retry_after(raw.retry_after.as_deref(), rate_limit_fallback),
        }),
        401 | 403 => Err(ApiError::Auth {
            message: format!(
                "Reclaim rejected the request (HTTP {}); check RECLAIM_API_KEY",
                raw.status
            ),
        }),
        status => Err(ApiError::Api { status, message: upstream_message(&raw.body) }),
    }
}

/// Parses a `Retry-After` value as seconds. Upstream sends plain numbers,
/// occasionally fractional; HTTP-date forms, negatives and values beyond
/// `Duration`'s range fall back to the configured wait.
fn parse_retry_after(header: Option<&str>, fallback: Duration) -> Duration {
    header
        .and_then(|value| value.trim().parse::<f64>().ok())
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .unwrap_or(fallback)
}

/// Best human-readable message an error body offers: a JSON `message` field,
/// then a JSON `error` field, then the raw body.
fn upstream_message(body: &str) -> String {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        message: Option<String>,
        error: Option<String>,
    }

    if body.trim().is_empty() {
        return "no response body".to_string();
    }

    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.message.or(parsed.error))
        .unwrap_or_else(|| body.to_string());
    truncate(&message)
}

fn truncate(message: &str) -> String {
    let message = message.trim();
    if message.len() <= MESSAGE_CAP {
        return message.to_string();
    }
    let mut cut = MESSAGE_CAP;
    while !message.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...", &message[..cut])
}
