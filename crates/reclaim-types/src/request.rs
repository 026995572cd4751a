//! Request descriptor: one outbound call to the Reclaim API.

use serde_json::Value;

/// The HTTP verbs the Reclaim API actually uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

/// Describes a single outbound call: verb, interpolated path, query, body.
///
/// Constructed per call by the client facade and dropped when the call
/// completes. Query pairs are ordered and keys may repeat (multi-valued
/// filters). Some mutating endpoints take their arguments as query
/// parameters rather than a body (the planner routes do), so `query` is
/// valid on any verb.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn with_query(mut self, query: &[(String, String)]) -> Self {
        self.query = query.to_vec();
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}
