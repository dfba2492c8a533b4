//! ============================================================================
//! Executor Module - Vendor Publishing for Herald
//! ============================================================================
//! One executor per external service. Every call is a single attempt: a
//! non-2xx answer comes back as `VendorPostFailed` with the vendor's status
//! and body untouched.
//! - TwitterExecutor: tweets via Twitter API v2 (Bearer or OAuth 1.0a)
//! - LinkedInExecutor: member posts via the UGC Posts API
//! - EmailExecutor: plain-text mail over SMTP
//! - CalendlyExecutor: single-use scheduling links
//! - PaymentLinkExecutor: Stripe payment links via the payment gateway
//! ============================================================================

mod calendly;
mod email;
mod linkedin;
mod payment;
mod twitter;

pub use calendly::CalendlyExecutor;
pub use email::EmailExecutor;
pub use linkedin::LinkedInExecutor;
pub use payment::PaymentLinkExecutor;
pub use twitter::TwitterExecutor;

use async_trait::async_trait;
use tracing::error;

use crate::auth::Credential;
use crate::error::{HeraldError, Result};
use crate::types::{Platform, PostReceipt};

/// Publishes text content to one platform
#[async_trait]
pub trait VendorPoster: Send + Sync {
    fn platform(&self) -> Platform;

    async fn post(&self, content: &str, credential: &Credential) -> Result<PostReceipt>;
}

/// Receipt id used when a vendor accepted the post but returned no id
pub const UNKNOWN_ID: &str = "unknown";

/// Pass 2xx responses through; turn anything else into `VendorPostFailed`
pub(crate) async fn ensure_success(
    platform: Platform,
    response: reqwest::Response,
) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    error!("{} API error {}: {}", platform, status, body);
    Err(HeraldError::VendorPostFailed {
        platform,
        status: Some(status.as_u16()),
        body,
    })
}

/// First `max` characters of `text`, for log lines
pub(crate) fn preview(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
