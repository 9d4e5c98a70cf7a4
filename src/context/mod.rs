//! Per-request context handed through the middleware chain to handlers.

use crate::Request;
use crate::http::headers::names;

/// Per-request context.
///
/// Owns the parsed [`Request`]; middleware and handlers read from it but never
/// share it across requests.
pub struct Context {
    request: Request,
}

impl Context {
    pub fn new(request: Request) -> Self {
        Self { request }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Shorthand for a percent-decoded query parameter.
    pub fn query(&self, key: &str) -> Option<&str> {
        self.request.query_param(key)
    }

    /// The client's validation token from `If-None-Match`, if any.
    pub fn if_none_match(&self) -> Option<&str> {
        self.request.headers().get(names::IF_NONE_MATCH)
    }
}
