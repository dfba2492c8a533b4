//! ============================================================================
//! Herald Errors
//! ============================================================================
//! One error type for the whole core. Every variant carries what a caller
//! needs to report the failure verbatim (provider status, raw body, raw model
//! output). Nothing here is retried automatically.
//! ============================================================================

use thiserror::Error;

use crate::types::Platform;

/// Result alias used across herald-core
pub type Result<T> = std::result::Result<T, HeraldError>;

#[derive(Debug, Error)]
pub enum HeraldError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Authorization denied: {error}")]
    AuthorizationDenied {
        error: String,
        description: Option<String>,
    },

    #[error("Invalid or expired state parameter")]
    InvalidOrExpiredState,

    #[error("Token exchange failed ({status}): {body}")]
    TokenExchangeFailed { status: u16, body: String },

    #[error("Failed to parse generated content: {reason}")]
    GenerationParseError { raw: String, reason: String },

    #[error("Content generation failed: {body}")]
    GenerationFailed { status: Option<u16>, body: String },

    #[error("{platform} post failed{}: {body}", .status.map(|s| format!(" ({})", s)).unwrap_or_default())]
    VendorPostFailed {
        platform: Platform,
        status: Option<u16>,
        body: String,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl HeraldError {
    /// Stable machine-readable code, used in HTTP error bodies
    pub fn code(&self) -> &'static str {
        match self {
            HeraldError::Validation(_) => "VALIDATION_ERROR",
            HeraldError::AuthorizationDenied { .. } => "AUTHORIZATION_DENIED",
            HeraldError::InvalidOrExpiredState => "INVALID_OR_EXPIRED_STATE",
            HeraldError::TokenExchangeFailed { .. } => "TOKEN_EXCHANGE_FAILED",
            HeraldError::GenerationParseError { .. } => "GENERATION_PARSE_ERROR",
            HeraldError::GenerationFailed { .. } => "GENERATION_FAILED",
            HeraldError::VendorPostFailed { .. } => "VENDOR_POST_FAILED",
            HeraldError::NotFound(_) => "NOT_FOUND",
            HeraldError::Unauthorized(_) => "UNAUTHORIZED",
            HeraldError::Config(_) => "CONFIG_ERROR",
            HeraldError::Http(_) => "UPSTREAM_UNREACHABLE",
            HeraldError::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Status code reported by the upstream provider, if any
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            HeraldError::TokenExchangeFailed { status, .. } => Some(*status),
            HeraldError::GenerationFailed { status, .. } => *status,
            HeraldError::VendorPostFailed { status, .. } => *status,
            HeraldError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Raw upstream payload kept for diagnosis (provider body or model output)
    pub fn upstream_body(&self) -> Option<&str> {
        match self {
            HeraldError::TokenExchangeFailed { body, .. }
            | HeraldError::GenerationFailed { body, .. }
            | HeraldError::VendorPostFailed { body, .. } => Some(body),
            HeraldError::GenerationParseError { raw, .. } => Some(raw),
            HeraldError::AuthorizationDenied { description, .. } => description.as_deref(),
            _ => None,
        }
    }

    pub(crate) fn storage(context: &str, err: impl std::fmt::Display) -> Self {
        HeraldError::Storage(format!("{}: {}", context, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vendor_error_keeps_status() {
        let err = HeraldError::VendorPostFailed {
            platform: Platform::Twitter,
            status: Some(403),
            body: "{\"detail\":\"forbidden\"}".to_string(),
        };
        assert_eq!(err.upstream_status(), Some(403));
        assert_eq!(err.code(), "VENDOR_POST_FAILED");
        assert_eq!(
            err.to_string(),
            "twitter post failed (403): {\"detail\":\"forbidden\"}"
        );
    }

    #[test]
    fn test_parse_error_exposes_raw_output() {
        let err = HeraldError::GenerationParseError {
            raw: "not json".to_string(),
            reason: "expected value".to_string(),
        };
        assert_eq!(err.upstream_body(), Some("not json"));
        assert_eq!(err.upstream_status(), None);
    }
}
