//! Verb facade over transport + normalization.

use std::sync::Arc;
use std::time::Duration;

use reclaim_types::{ApiError, Credential, Method, Request};
use serde_json::Value;

use crate::normalize::normalize;
use crate::transport::{HttpTransport, Transport};

/// Wait reported for a 429 that carries no usable `Retry-After` header.
pub const DEFAULT_RATE_LIMIT_FALLBACK: Duration = Duration::from_secs(60);

/// Client for the Reclaim.ai REST API.
///
/// Every operation issues exactly one attempt through the transport and
/// returns the normalized result. The client holds no response cache and no
/// retry policy; both belong to the caller.
#[derive(Clone)]
pub struct ApiClient {
    credential: Credential,
    transport: Arc<dyn Transport>,
    rate_limit_fallback: Duration,
}

impl ApiClient {
    /// Creates a client backed by [`HttpTransport`] with default timeouts.
    pub fn new(credential: Credential) -> Self {
        Self::with_transport(credential, Arc::new(HttpTransport::default()))
    }

    /// Creates a client over a caller-supplied transport.
    pub fn with_transport(credential: Credential, transport: Arc<dyn Transport>) -> Self {
        Self {
            credential,
            transport,
            rate_limit_fallback: DEFAULT_RATE_LIMIT_FALLBACK,
        }
    }

    /// Overrides the wait reported when a 429 has no usable `Retry-After`.
    pub fn with_rate_limit_fallback(mut self, fallback: Duration) -> Self {
        self.rate_limit_fallback = fallback;
        self
    }

    /// GET `path` and return the decoded payload.
    pub async fn fetch(&self, path: &str, query: &[(String, String)]) -> Result<Value, ApiError> {
        self.execute("fetch", Request::new(Method::Get, path).with_query(query))
            .await
    }

    /// POST `path`. `body` is optional because some mutating endpoints take
    /// all their arguments as query parameters (the planner routes do).
    pub async fn create(
        &self,
        path: &str,
        body: Option<Value>,
        query: &[(String, String)],
    ) -> Result<Value, ApiError> {
        let mut request = Request::new(Method::Post, path).with_query(query);
        if let Some(body) = body {
            request = request.with_body(body);
        }
        self.execute("create", request).await
    }

    /// PATCH `path` with a partial document and return the updated resource.
    pub async fn update(&self, path: &str, body: Value) -> Result<Value, ApiError> {
        self.execute("update", Request::new(Method::Patch, path).with_body(body))
            .await
    }

    /// DELETE `path`.
    ///
    /// Deleting something that is already gone is `ApiError::NotFound`, not
    /// success; callers that want idempotent semantics match on the error.
    pub async fn remove(&self, path: &str) -> Result<(), ApiError> {
        self.execute("remove", Request::new(Method::Delete, path))
            .await
            .map(|_| ())
    }

    async fn execute(&self, operation: &'static str, request: Request) -> Result<Value, ApiError> {
        let result = match self.transport.send(&request, &self.credential).await {
            Ok(raw) => normalize(raw, &request.path, self.rate_limit_fallback),
            Err(err) => Err(err),
        };
        if let Err(error) = &result {
            tracing::warn!(
                operation,
                path = %request.path,
                kind = error.kind(),
                %error,
                "Reclaim API call failed"
            );
        }
        result
    }
}
