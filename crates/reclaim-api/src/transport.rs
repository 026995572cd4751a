//! HTTP transport primitive.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reclaim_types::{ApiError, Credential, Method, Request};
use reqwest::header::{self, HeaderValue};

/// Overall bound on one transport attempt, connect through body read.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Raw outcome of one HTTP exchange, before normalization.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    /// Unparsed `Retry-After` header value, when the response carried one.
    pub retry_after: Option<String>,
    /// Response body text; may be empty.
    pub body: String,
}

/// One network attempt for one request.
///
/// Implementations make no retries and hold no state across calls; failures
/// that prevented an HTTP response (connect, TLS, timeout) come back as
/// `ApiError::Transport`, while decoded statuses are returned in
/// [`RawResponse`] for the normalizer. Dyn-compatible so `ApiClient` works
/// with `Arc<dyn Transport>`.
pub trait Transport: Send + Sync {
    fn send<'a>(
        &'a self,
        request: &'a Request,
        credential: &'a Credential,
    ) -> Pin<Box<dyn Future<Output = Result<RawResponse, ApiError>> + Send + 'a>>;
}

/// Production transport backed by `reqwest`.
///
/// A fresh `reqwest::Client` is built inside every call, with connection
/// pooling disabled, so no connection state survives between calls and an
/// aborted call leaves nothing behind.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl Transport for HttpTransport {
    fn send<'a>(
        &'a self,
        request: &'a Request,
        credential: &'a Credential,
    ) -> Pin<Box<dyn Future<Output = Result<RawResponse, ApiError>> + Send + 'a>> {
        Box::pin(async move {
            let http = reqwest::Client::builder()
                .timeout(self.timeout)
                .pool_max_idle_per_host(0)
                .build()
                .map_err(|e| ApiError::Transport(e.to_string()))?;

            let mut authorization =
                HeaderValue::from_str(&credential.authorization()).map_err(|_| ApiError::Auth {
                    message: "API key contains characters that cannot be sent in a header".into(),
                })?;
            authorization.set_sensitive(true);

            let url = format!("{}{}", credential.base_url(), request.path);
            tracing::debug!("{} {url}", request.method.as_str());

            let mut builder = http
                .request(to_reqwest(request.method), &url)
                .header(header::AUTHORIZATION, authorization)
                .header(header::CONTENT_TYPE, "application/json");
            if !request.query.is_empty() {
                builder = builder.query(&request.query);
            }
            if let Some(body) = &request.body {
                builder = builder.json(body);
            }

            let response = builder.send().await.map_err(|e| {
                if e.is_timeout() {
                    ApiError::Transport(format!("request timed out after {:?}", self.timeout))
                } else {
                    ApiError::Transport(e.to_string())
                }
            })?;

            let status = response.status().as_u16();
            let retry_after = response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string);
            let body = response
                .text()
                .await
                .map_err(|e| ApiError::Transport(e.to_string()))?;

            Ok(RawResponse { status, retry_after, body })
        })
    }
}

fn to_reqwest(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}
