//! Reclaim.ai REST API client.
//!
//! Three layers: a [`Transport`] that performs exactly one HTTP attempt on a
//! fresh connection, a normalizer that folds raw responses into
//! `Result<Value, ApiError>`, and the [`ApiClient`] verb facade on top.
//! Caching and retry policy live with the caller.

mod client;
mod normalize;
mod transport;

pub use client::{ApiClient, DEFAULT_RATE_LIMIT_FALLBACK};
pub use normalize::normalize;
pub use transport::{DEFAULT_TIMEOUT, HttpTransport, RawResponse, Transport};
