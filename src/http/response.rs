//! HTTP/1.1 response builder.
//!
//! Responses are built fluently by handlers, may be decorated in place by
//! middleware, and are finally serialized with [`Response::into_bytes`].

use bytes::{BufMut, BytesMut};
use serde::Serialize;

use super::{Headers, StatusCode, headers::names};

/// An HTTP/1.1 response, ready to be serialized and sent.
///
/// # Examples
///
/// ```
/// use ledger_gateway::http::{Response, StatusCode};
///
/// let response = Response::json(StatusCode::Ok, &serde_json::json!({"status": "OK"}));
/// assert_eq!(response.body_ref(), br#"{"status":"OK"}"#);
///
/// let bytes = response.into_bytes();
/// let text = std::str::from_utf8(&bytes).unwrap();
/// assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
/// assert!(text.contains("Content-Type: application/json; charset=utf-8\r\n"));
/// ```
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: Headers,
    body: Vec<u8>,
    keep_alive: bool,
}

impl Response {
    /// Creates a response with the given status and an empty body.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Vec::new(),
            keep_alive: true,
        }
    }

    /// Creates a JSON response from any serializable value.
    ///
    /// Serialization of plain data types does not fail in practice; if it does,
    /// a `500` with a plain-text explanation is returned instead.
    pub fn json<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => Self::new(status)
                .header(names::CONTENT_TYPE, "application/json; charset=utf-8")
                .body_bytes(body),
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize JSON response body");
                Self::new(StatusCode::InternalServerError).body("response serialization failed")
            }
        }
    }

    /// Appends a response header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Appends a header in place, for middleware decorating a downstream response.
    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(name, value);
    }

    /// Sets a single-valued header in place, replacing earlier values.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.set(name, value);
    }

    /// Sets the body from a string.
    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into().into_bytes();
        self
    }

    /// Sets the body from raw bytes.
    #[must_use]
    pub fn body_bytes(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    #[must_use]
    pub fn keep_alive(mut self, keep_alive: bool) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// The body bytes exactly as they will be written to the wire.
    pub fn body_ref(&self) -> &[u8] {
        &self.body
    }

    /// Turns this response into a `304 Not Modified`.
    ///
    /// The body and its `Content-Type` are dropped; every other header
    /// (`Cache-Control`, `ETag`, `Vary`, ...) is kept as RFC 9110 §15.4.5 asks.
    #[must_use]
    pub fn into_not_modified(mut self) -> Self {
        self.status = StatusCode::NotModified;
        self.body.clear();
        self.headers.remove(names::CONTENT_TYPE);
        self
    }

    /// Serializes the response in HTTP/1.1 wire format.
    ///
    /// Adds `Content-Type: text/plain; charset=utf-8` for a non-empty body
    /// without a content type, plus `Connection`, and `Content-Length` unless the
    /// status forbids a body.
    pub fn into_bytes(mut self) -> BytesMut {
        let content_length = self.body.len();

        if !self.body.is_empty() && !self.headers.contains(names::CONTENT_TYPE) {
            self.headers
                .insert(names::CONTENT_TYPE, "text/plain; charset=utf-8");
        }

        let connection = if self.keep_alive { "keep-alive" } else { "close" };
        self.headers.set("Connection", connection);

        let mut buf = BytesMut::with_capacity(128 + self.headers.len() * 64 + content_length);

        buf.put(
            format!(
                "HTTP/1.1 {} {}\r\n",
                self.status.as_u16(),
                self.status.canonical_reason()
            )
            .as_bytes(),
        );
        buf.put(self.headers.to_string().as_bytes());
        // 204 and 304 carry no message body, so no framing header either.
        if !matches!(self.status, StatusCode::NoContent | StatusCode::NotModified) {
            buf.put(format!("Content-Length: {content_length}\r\n").as_bytes());
        }
        buf.put(&b"\r\n"[..]);
        buf.put(self.body.as_slice());

        buf
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new(StatusCode::Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn to_string(bytes: BytesMut) -> String {
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn text_response_wire_format() {
        let s = to_string(Response::new(StatusCode::Ok).body("Hello").into_bytes());
        assert!(s.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(s.contains("Content-Type: text/plain; charset=utf-8\r\n"));
        assert!(s.contains("Content-Length: 5\r\n"));
        assert!(s.ends_with("\r\n\r\nHello"));
    }

    #[test]
    fn json_response_sets_content_type() {
        let r = Response::json(StatusCode::BadRequest, &serde_json::json!({"error": "bad"}));
        assert_eq!(r.status(), StatusCode::BadRequest);
        assert_eq!(
            r.headers().get("content-type"),
            Some("application/json; charset=utf-8")
        );
        assert_eq!(r.body_ref(), br#"{"error":"bad"}"#);
    }

    #[test]
    fn not_modified_has_no_body_or_content_type() {
        let s = to_string(
            Response::new(StatusCode::NotModified)
                .header("ETag", "\"abc\"")
                .into_bytes(),
        );
        assert!(s.starts_with("HTTP/1.1 304 Not Modified\r\n"));
        assert!(!s.contains("Content-Type"));
        assert!(!s.contains("Content-Length"));
        assert!(s.contains("ETag: \"abc\"\r\n"));
        assert!(s.ends_with("\r\n\r\n"));
    }

    #[test]
    fn set_header_replaces() {
        let mut r = Response::new(StatusCode::Ok).header("Cache-Control", "no-store");
        r.set_header("cache-control", "public, max-age=60");
        assert_eq!(r.headers().get("Cache-Control"), Some("public, max-age=60"));
        assert_eq!(r.headers().len(), 1);
    }

    #[test]
    fn connection_close() {
        let s = to_string(Response::new(StatusCode::Ok).keep_alive(false).into_bytes());
        assert!(s.contains("Connection: close\r\n"));
    }
}
