use serde_json::json;
use thiserror::Error;

use crate::{Response, StatusCode, upstream::UpstreamError};

/// Failures a handler turns into a JSON error response.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed input; the message is shown to the client verbatim.
    #[error("{0}")]
    BadRequest(&'static str),

    #[error("{context}: {source}")]
    Upstream {
        context: &'static str,
        #[source]
        source: UpstreamError,
    },
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BadRequest,
            Self::Upstream { .. } => StatusCode::InternalServerError,
        }
    }

    /// `{"error": ...}` for client errors, `{"error": ..., "details": ...}` for upstream ones.
    pub fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::BadRequest(message) => json!({ "error": message }),
            Self::Upstream { context, source } => {
                tracing::error!(error = %source, "{context}");
                json!({ "error": context, "details": source.to_string() })
            }
        };
        Response::json(status, &body)
    }
}
