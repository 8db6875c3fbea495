//! Error types for gemrelay.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

/// Result type alias for relay operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that stops a request before its upstream response is relayed.
///
/// The first five variants come from explicit checks. The rest are faults
/// surfaced while parsing or relaying, and all of them collapse into the same
/// 500 body carrying only the underlying message.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Method Not Allowed")]
    MethodNotAllowed,

    #[error("API Key not configured.")]
    MissingApiKey,

    #[error("Missing modelName or apiPayload.")]
    MissingFields,

    #[error("Unsupported model specified.")]
    UnsupportedModel { model: String },

    #[error("Request body too large.")]
    PayloadTooLarge { limit: usize },

    #[error("{0}")]
    MalformedBody(#[from] serde_json::Error),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("{0}")]
    Upstream(reqwest::Error),

    #[error("{0}")]
    Internal(String),
}

/// Error body returned for every fault that is not a precondition failure.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal Server Error in API Proxy.";

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        // The request URL carries the key in its query string.
        Error::Upstream(e.without_url())
    }
}

impl Error {
    /// HTTP status this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            Error::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Error::MissingFields | Error::UnsupportedModel { .. } => StatusCode::BAD_REQUEST,
            Error::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Error::MissingApiKey
            | Error::MalformedBody(_)
            | Error::InvalidRequest(_)
            | Error::Upstream(_)
            | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether this error came out of the catch-all path rather than a
    /// precondition check.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Error::MalformedBody(_) | Error::InvalidRequest(_) | Error::Upstream(_) | Error::Internal(_)
        )
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();

        if let Error::MethodNotAllowed = self {
            return (
                status,
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                "Method Not Allowed",
            )
                .into_response();
        }

        let body = if self.is_internal() {
            serde_json::json!({
                "error": INTERNAL_ERROR_MESSAGE,
                "details": self.to_string(),
            })
        } else {
            serde_json::json!({ "error": self.to_string() })
        };

        (status, axum::Json(body)).into_response()
    }
}
