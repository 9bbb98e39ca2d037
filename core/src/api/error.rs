// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Shared HTTP error handling for the Intake and Hybrid Router APIs.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result alias for HTTP handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// The response body every error returns, per spec §7 "Error envelope".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error code, e.g. `NOT_FOUND`.
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Optional structured detail (validation failures, field paths).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// Server time the error was produced.
    pub timestamp: DateTime<Utc>,
    /// Correlation id, propagated from the `X-Request-Id` header or
    /// generated if absent.
    pub request_id: String,
    /// Seconds the client should wait before retrying, set only on
    /// `RateLimitExceeded`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

/// HTTP-layer error for both binaries' APIs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ApiError {
    /// 400.
    BadRequest(String),
    /// 401.
    Unauthorized(String),
    /// 403.
    Forbidden(String),
    /// 404.
    NotFound(String),
    /// 409, e.g. resubmitting a job id with a different payload.
    Conflict(String),
    /// 429, with the retry-after hint in seconds.
    RateLimitExceeded {
        /// Human-readable message.
        message: String,
        /// Seconds until the client may retry.
        retry_after_secs: u64,
    },
    /// 500.
    InternalError(String),
    /// 503, e.g. the database or work queue is unreachable.
    ServiceUnavailable(String),
}

impl ApiError {
    /// The HTTP status this error maps to.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Machine-readable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::RateLimitExceeded { .. } => "RATE_LIMIT_EXCEEDED",
            Self::InternalError(_) => "INTERNAL_ERROR",
            Self::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// The human-readable message.
    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest(msg)
            | Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::NotFound(msg)
            | Self::Conflict(msg)
            | Self::InternalError(msg)
            | Self::ServiceUnavailable(msg) => msg,
            Self::RateLimitExceeded { message, .. } => message,
        }
    }

    /// Builds the response body, stamping `request_id` and `timestamp`.
    pub fn into_error_response(self, request_id: String) -> ErrorResponse {
        let retry_after = match &self {
            Self::RateLimitExceeded {
                retry_after_secs, ..
            } => Some(*retry_after_secs),
            _ => None,
        };
        ErrorResponse {
            code: self.error_code().to_string(),
            message: self.message().to_string(),
            details: None,
            timestamp: Utc::now(),
            request_id,
            retry_after,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.message())
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let request_id = uuid::Uuid::new_v4().to_string();
        let body = self.into_error_response(request_id);
        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::InternalError(err.to_string())
    }
}

impl From<crate::database::DatabaseError> for ApiError {
    fn from(err: crate::database::DatabaseError) -> Self {
        if err.is_not_found() {
            Self::NotFound(err.to_string())
        } else {
            Self::ServiceUnavailable(err.to_string())
        }
    }
}

impl From<crate::queue::QueueError> for ApiError {
    fn from(err: crate::queue::QueueError) -> Self {
        Self::ServiceUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::BadRequest(format!("invalid JSON: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::BadRequest("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::RateLimitExceeded {
                message: "slow down".into(),
                retry_after_secs: 30
            }
            .status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[test]
    fn test_rate_limit_carries_retry_after() {
        let err = ApiError::RateLimitExceeded {
            message: "slow down".into(),
            retry_after_secs: 30,
        };
        let response = err.into_error_response("req-1".to_string());
        assert_eq!(response.retry_after, Some(30));
        assert_eq!(response.code, "RATE_LIMIT_EXCEEDED");
    }

    #[test]
    fn test_other_errors_have_no_retry_after() {
        let response = ApiError::NotFound("missing".into()).into_error_response("req-1".to_string());
        assert_eq!(response.retry_after, None);
    }

    #[test]
    fn test_display() {
        let error = ApiError::NotFound("job not found".to_string());
        assert_eq!(error.to_string(), "NOT_FOUND: job not found");
    }
}
