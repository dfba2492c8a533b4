//! ============================================================================
//! LinkedIn Executor - Member Posts via the UGC Posts API
//! ============================================================================
//! Two requests per post: resolve the member id (`/v2/me`), then publish a
//! public text share as `urn:li:person:{id}`.
//! ============================================================================

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{ensure_success, preview, VendorPoster, UNKNOWN_ID};
use crate::auth::Credential;
use crate::error::{HeraldError, Result};
use crate::types::{Platform, PostReceipt};

pub struct LinkedInExecutor {
    client: reqwest::Client,
    api_base: String,
}

impl LinkedInExecutor {
    pub fn new(client: reqwest::Client, api_base: impl Into<String>) -> Self {
        Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    async fn member_id(&self, token: &str) -> Result<String> {
        let response = self
            .client
            .get(format!("{}/v2/me", self.api_base))
            .bearer_auth(token)
            .send()
            .await?;

        let response = ensure_success(Platform::LinkedIn, response).await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        serde_json::from_str::<ProfileResponse>(&body)
            .ok()
            .and_then(|p| p.id)
            .ok_or(HeraldError::VendorPostFailed {
                platform: Platform::LinkedIn,
                status: Some(status.as_u16()),
                body,
            })
    }

    /// Publish a public text post for the token's member
    pub async fn share(&self, text: &str, token: &str) -> Result<PostReceipt> {
        if text.trim().is_empty() {
            return Err(HeraldError::Validation("LinkedIn post cannot be empty".to_string()));
        }

        let person_id = self.member_id(token).await?;
        debug!("Resolved LinkedIn member {}", person_id);
        info!("Posting to LinkedIn: {}...", preview(text, 50));

        let payload = serde_json::json!({
            "author": format!("urn:li:person:{}", person_id),
            "lifecycleState": "PUBLISHED",
            "specificContent": {
                "com.linkedin.ugc.ShareContent": {
                    "shareCommentary": { "text": text },
                    "shareMediaCategory": "NONE"
                }
            },
            "visibility": {
                "com.linkedin.ugc.MemberNetworkVisibility": "PUBLIC"
            }
        });

        let response = self
            .client
            .post(format!("{}/v2/ugcPosts", self.api_base))
            .bearer_auth(token)
            .header("X-Restli-Protocol-Version", "2.0.0")
            .json(&payload)
            .send()
            .await?;

        let response = ensure_success(Platform::LinkedIn, response).await?;
        let header_id = response
            .headers()
            .get("x-restli-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body_id = response
            .json::<ShareResponse>()
            .await
            .ok()
            .and_then(|r| r.id);

        let Some(id) = body_id.or(header_id) else {
            warn!("LinkedIn post published but no id was returned");
            return Ok(PostReceipt {
                platform: Platform::LinkedIn,
                id: UNKNOWN_ID.to_string(),
                url: None,
            });
        };
        info!("LinkedIn post published: {}", id);

        Ok(PostReceipt {
            platform: Platform::LinkedIn,
            url: Some(format!("https://www.linkedin.com/feed/update/{}", id)),
            id,
        })
    }
}

#[async_trait]
impl VendorPoster for LinkedInExecutor {
    fn platform(&self) -> Platform {
        Platform::LinkedIn
    }

    async fn post(&self, content: &str, credential: &Credential) -> Result<PostReceipt> {
        match credential {
            Credential::Bearer(token) => self.share(content, token).await,
            Credential::OAuth1(_) => Err(HeraldError::Validation(
                "LinkedIn posting requires an OAuth 2.0 bearer token".to_string(),
            )),
        }
    }
}

// ============================================================================
// LinkedIn API Types
// ============================================================================

#[derive(Deserialize)]
struct ProfileResponse {
    id: Option<String>,
}

#[derive(Deserialize)]
struct ShareResponse {
    id: Option<String>,
}
