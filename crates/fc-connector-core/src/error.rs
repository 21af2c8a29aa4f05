//! Connector error taxonomy, in the one-crate-one-error-enum convention
//! also seen in `StandbyError`/`ConfigError`. Renders the
//! `{ok:false, code, message, correlationId}` body shape; the `source()`
//! chain never reaches the HTTP response, only the log line — mirrors
//! `fc-router::api::mod`'s pattern of logging `error = %e` while returning
//! a generic message to callers.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConnectorError {
    #[error("webhook validation failed: {0}")]
    WebhookValidationFailed(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("rate limit exceeded")]
    RateLimitExceeded { retry_after_secs: u64 },

    #[error("internal error: {0}")]
    Internal(String),
}

impl ConnectorError {
    pub fn code(&self) -> &'static str {
        match self {
            ConnectorError::WebhookValidationFailed(_) => "WEBHOOK_VALIDATION_FAILED",
            ConnectorError::Unauthorized(_) => "UNAUTHORIZED",
            ConnectorError::Forbidden(_) => "FORBIDDEN",
            ConnectorError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            ConnectorError::RateLimitExceeded { .. } => "RATE_LIMIT_EXCEEDED",
            ConnectorError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// The bare, caller-facing message — no enum-variant prefix. The
    /// `Display` impl (via `thiserror`) stays prefixed for log lines; this
    /// is what goes in the response body.
    fn message(&self) -> String {
        match self {
            ConnectorError::WebhookValidationFailed(msg) => msg.clone(),
            ConnectorError::Unauthorized(msg) => msg.clone(),
            ConnectorError::Forbidden(msg) => msg.clone(),
            ConnectorError::ServiceUnavailable(msg) => msg.clone(),
            ConnectorError::RateLimitExceeded { .. } => "rate limit exceeded".to_string(),
            ConnectorError::Internal(msg) => msg.clone(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ConnectorError::WebhookValidationFailed(_) => StatusCode::BAD_REQUEST,
            ConnectorError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ConnectorError::Forbidden(_) => StatusCode::FORBIDDEN,
            ConnectorError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ConnectorError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            ConnectorError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Renders the error body paired with the correlation id that should
    /// have been resolved before this error was raised (GET handlers
    /// generate a fresh one; POST resolves one in pipeline step 1 even on
    /// the earliest failure paths).
    pub fn into_response_with_correlation(self, correlation_id: &str) -> Response {
        let status = self.status();
        let retry_after = match &self {
            ConnectorError::RateLimitExceeded { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        };

        let body = ErrorBody {
            ok: false,
            code: self.code(),
            message: self.message(),
            correlation_id: correlation_id.to_string(),
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert("retry-after", secs.to_string().parse().expect("digits are valid header value"));
        }
        response
            .headers_mut()
            .insert("x-correlation-id", correlation_id.parse().expect("correlation id is ascii"));
        response
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    ok: bool,
    code: &'static str,
    message: String,
    #[serde(rename = "correlationId")]
    correlation_id: String,
}

/// Falls back to a correlation id of `"unknown"` when the caller has no
/// correlation id to attach (`IntoResponse` requires an infallible
/// conversion; handlers that have one should call
/// `into_response_with_correlation` directly instead).
impl IntoResponse for ConnectorError {
    fn into_response(self) -> Response {
        self.into_response_with_correlation("unknown")
    }
}
