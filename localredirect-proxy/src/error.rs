//! Proxy error handling.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Error returned by proxy handlers.
#[derive(Debug)]
pub struct ProxyError {
    status: StatusCode,
    message: String,
    code: String,
}

impl ProxyError {
    /// Creates a new proxy error.
    pub fn new(status: StatusCode, message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            code: code.into(),
        }
    }

    /// The upstream could not be reached or answered garbage.
    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, message, "BAD_GATEWAY")
    }

    /// The upstream did not answer in time.
    pub fn gateway_timeout(message: impl Into<String>) -> Self {
        Self::new(StatusCode::GATEWAY_TIMEOUT, message, "GATEWAY_TIMEOUT")
    }

    /// The request body could not be read.
    pub fn payload_too_large(message: impl Into<String>) -> Self {
        Self::new(StatusCode::PAYLOAD_TOO_LARGE, message, "PAYLOAD_TOO_LARGE")
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Serialize)]
struct ErrorBody {
    code: String,
    message: String,
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code,
                message: self.message,
            },
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<reqwest::Error> for ProxyError {
    fn from(err: reqwest::Error) -> Self {
        tracing::warn!(error = %err, "Upstream request failed");
        if err.is_timeout() {
            ProxyError::gateway_timeout("Upstream timed out")
        } else {
            ProxyError::bad_gateway("Upstream unavailable")
        }
    }
}
