//! HTTP error responses.
//!
//! Every handler returns `Result<_, ApiError>`; core errors convert with `?`
//! and render as `{code, message, details?}` JSON.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use herald_core::HeraldError;
use serde::Serialize;
use std::fmt;

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    pub fn not_found(resource: impl fmt::Display, id: impl fmt::Display) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{} with id {} not found", resource, id),
        )
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

/// HTTP status for each core error
fn status_for(err: &HeraldError) -> StatusCode {
    match err {
        HeraldError::Validation(_)
        | HeraldError::AuthorizationDenied { .. }
        | HeraldError::InvalidOrExpiredState
        | HeraldError::TokenExchangeFailed { .. } => StatusCode::BAD_REQUEST,
        HeraldError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        HeraldError::NotFound(_) => StatusCode::NOT_FOUND,
        HeraldError::VendorPostFailed { .. } | HeraldError::Http(_) => StatusCode::BAD_GATEWAY,
        HeraldError::GenerationParseError { .. }
        | HeraldError::GenerationFailed { .. }
        | HeraldError::Config(_)
        | HeraldError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<HeraldError> for ApiError {
    fn from(err: HeraldError) -> Self {
        let details = match (err.upstream_status(), err.upstream_body()) {
            (None, None) => None,
            (status, body) => Some(serde_json::json!({
                "upstream_status": status,
                "upstream_body": body,
            })),
        };

        Self {
            status: status_for(&err),
            code: err.code(),
            message: err.to_string(),
            details,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(
                status = %self.status,
                code = %self.code,
                message = %self.message,
                "Request failed"
            );
        } else {
            tracing::debug!(status = %self.status, code = %self.code, "Request rejected");
        }

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
            details: self.details,
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_core::Platform;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (HeraldError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (HeraldError::InvalidOrExpiredState, StatusCode::BAD_REQUEST),
            (
                HeraldError::TokenExchangeFailed {
                    status: 401,
                    body: "bad".into(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (HeraldError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (HeraldError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (
                HeraldError::GenerationFailed {
                    status: Some(500),
                    body: "x".into(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (HeraldError::Config("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status(), expected);
        }
    }

    #[test]
    fn test_vendor_failure_carries_details() {
        let err = ApiError::from(HeraldError::VendorPostFailed {
            platform: Platform::Twitter,
            status: Some(403),
            body: "forbidden".into(),
        });
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            err.details,
            Some(serde_json::json!({ "upstream_status": 403, "upstream_body": "forbidden" }))
        );
    }
}
