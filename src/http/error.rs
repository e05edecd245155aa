//! Mapping from crate errors to HTTP responses.

use crate::Error;
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// An [`Error`] rendered as an HTTP response.
///
/// | Error | Status |
/// |-------|--------|
/// | `InvalidInput` | 400 |
/// | `NotFound` | 404 |
/// | `Duplicate` | 429 |
/// | `Speech` | 502 |
/// | `FeatureNotEnabled` | 503 |
/// | `Gateway`, `OperationFailed` | 500 |
#[derive(Debug)]
pub struct ApiError(pub Error);

impl ApiError {
    /// Returns the status this error maps to.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match &self.0 {
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Duplicate(_) => StatusCode::TOO_MANY_REQUESTS,
            Error::Speech { .. } => StatusCode::BAD_GATEWAY,
            Error::FeatureNotEnabled(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Gateway { .. } | Error::OperationFailed { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            },
        }
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(Error::InvalidInput(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self.0 {
            Error::Duplicate(message) => json!({ "message": message, "duplicate": true }),
            Error::Gateway { .. } | Error::OperationFailed { .. } => {
                tracing::error!(error = %self.0, "Request failed");
                json!({ "error": "internal server error" })
            },
            other => json!({ "error": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}
