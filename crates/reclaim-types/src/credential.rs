//! Bearer credential for the Reclaim API.

use std::fmt;

/// An opaque bearer token plus the base URL it is valid for.
///
/// Immutable for the process lifetime; built once at startup from
/// configuration. The token never appears in `Debug` output, and
/// [`Credential::authorization`] is the only way it leaves the type.
#[derive(Clone)]
pub struct Credential {
    api_key: String,
    base_url: String,
}

impl Credential {
    /// Build a credential. A trailing slash on `base_url` is stripped so
    /// path concatenation never produces `//`.
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            api_key: api_key.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The `Authorization` header value.
    pub fn authorization(&self) -> String {
        format!("Bearer {}", self.api_key)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("api_key", &"[redacted]")
            .field("base_url", &self.base_url)
            .finish()
    }
}
