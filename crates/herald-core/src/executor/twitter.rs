//! ============================================================================
//! Twitter Executor - Social Media Posting via Twitter API v2
//! ============================================================================
//! Posts tweets with whichever credential the caller supplies:
//! - OAuth 2.0 user token (Bearer) from the PKCE handshake
//! - OAuth 1.0a user token, signed per request (HMAC-SHA1)
//! ============================================================================

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use super::{ensure_success, preview, VendorPoster, UNKNOWN_ID};
use crate::auth::{authorization_header, Credential};
use crate::error::{HeraldError, Result};
use crate::types::{Platform, PostReceipt};

/// Twitter's per-tweet character limit
pub const MAX_TWEET_CHARS: usize = 280;

/// Executor for Twitter posting operations
pub struct TwitterExecutor {
    client: reqwest::Client,
    api_base: String,
}

impl TwitterExecutor {
    pub fn new(client: reqwest::Client, api_base: impl Into<String>) -> Self {
        Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// Post a single tweet
    pub async fn post_tweet(&self, text: &str, credential: &Credential) -> Result<PostReceipt> {
        if text.trim().is_empty() {
            return Err(HeraldError::Validation("Tweet text cannot be empty".to_string()));
        }
        let length = text.chars().count();
        if length > MAX_TWEET_CHARS {
            return Err(HeraldError::Validation(format!(
                "Tweet exceeds {} characters ({})",
                MAX_TWEET_CHARS, length
            )));
        }

        info!("Posting tweet: {}...", preview(text, 50));

        let url = format!("{}/2/tweets", self.api_base);
        let authorization = match credential {
            Credential::Bearer(token) => format!("Bearer {}", token),
            // JSON bodies are not part of the OAuth 1.0a signature base string
            Credential::OAuth1(token) => authorization_header("POST", &url, token, &[])?,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", authorization)
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await?;

        let response = ensure_success(Platform::Twitter, response).await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        // A 2xx means the tweet exists, even when the body carries no id
        let tweet_id = match serde_json::from_str::<TwitterTweetResponse>(&body) {
            Ok(tweet_response) => tweet_response.data.id,
            Err(e) => {
                warn!("Tweet posted ({}) but response had no id: {}", status, e);
                return Ok(PostReceipt {
                    platform: Platform::Twitter,
                    id: UNKNOWN_ID.to_string(),
                    url: None,
                });
            }
        };
        let url = format!("https://twitter.com/i/status/{}", tweet_id);

        info!("Tweet posted: {}", url);

        Ok(PostReceipt {
            platform: Platform::Twitter,
            id: tweet_id,
            url: Some(url),
        })
    }
}

#[async_trait]
impl VendorPoster for TwitterExecutor {
    fn platform(&self) -> Platform {
        Platform::Twitter
    }

    async fn post(&self, content: &str, credential: &Credential) -> Result<PostReceipt> {
        self.post_tweet(content, credential).await
    }
}

// ============================================================================
// Twitter API Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct TwitterTweetResponse {
    data: TwitterTweetData,
}

#[derive(Debug, Deserialize)]
struct TwitterTweetData {
    id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{OAuth1Consumer, OAuth1Token};
    use wiremock::matchers::{body_json, header, header_regex, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn created(id: &str) -> ResponseTemplate {
        ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "data": { "id": id, "text": "hello" }
        }))
    }

    #[tokio::test]
    async fn test_post_with_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2/tweets"))
            .and(header("Authorization", "Bearer t1"))
            .and(body_json(serde_json::json!({ "text": "hello" })))
            .respond_with(created("1850"))
            .expect(1)
            .mount(&server)
            .await;

        let executor = TwitterExecutor::new(reqwest::Client::new(), server.uri());
        let receipt = executor
            .post("hello", &Credential::Bearer("t1".to_string()))
            .await
            .unwrap();

        assert_eq!(receipt.platform, Platform::Twitter);
        assert_eq!(receipt.id, "1850");
        assert_eq!(receipt.url.as_deref(), Some("https://twitter.com/i/status/1850"));
    }

    #[tokio::test]
    async fn test_post_with_oauth1_signature() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2/tweets"))
            .and(header_regex(
                "Authorization",
                "^OAuth .*oauth_signature_method=\"HMAC-SHA1\".*oauth_token=\"at\"",
            ))
            .respond_with(created("7"))
            .mount(&server)
            .await;

        let executor = TwitterExecutor::new(reqwest::Client::new(), server.uri());
        let credential = Credential::OAuth1(OAuth1Token {
            consumer: OAuth1Consumer {
                key: "ck".to_string(),
                secret: "cs".to_string(),
            },
            token: "at".to_string(),
            token_secret: "as".to_string(),
        });
        assert_eq!(executor.post("hello", &credential).await.unwrap().id, "7");
    }

    #[tokio::test]
    async fn test_forbidden_is_reported_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2/tweets"))
            .respond_with(ResponseTemplate::new(403).set_body_string("{\"detail\":\"duplicate content\"}"))
            .mount(&server)
            .await;

        let executor = TwitterExecutor::new(reqwest::Client::new(), server.uri());
        match executor.post("hello", &Credential::Bearer("t1".to_string())).await {
            Err(HeraldError::VendorPostFailed {
                platform,
                status,
                body,
            }) => {
                assert_eq!(platform, Platform::Twitter);
                assert_eq!(status, Some(403));
                assert!(body.contains("duplicate content"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_created_without_id_is_still_posted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2/tweets"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let executor = TwitterExecutor::new(reqwest::Client::new(), server.uri());
        let receipt = executor
            .post("hello", &Credential::Bearer("t1".to_string()))
            .await
            .unwrap();
        assert_eq!(receipt.platform, Platform::Twitter);
        assert_eq!(receipt.id, UNKNOWN_ID);
        assert!(receipt.url.is_none());
    }

    #[tokio::test]
    async fn test_length_validation() {
        let executor = TwitterExecutor::new(reqwest::Client::new(), "http://127.0.0.1:9");
        let bearer = Credential::Bearer("t".to_string());

        assert!(matches!(
            executor.post("   ", &bearer).await,
            Err(HeraldError::Validation(_))
        ));
        assert!(matches!(
            executor.post(&"x".repeat(281), &bearer).await,
            Err(HeraldError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_limit_counts_characters_not_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2/tweets"))
            .respond_with(created("9"))
            .mount(&server)
            .await;

        // 280 characters, 560 bytes
        let text = "é".repeat(280);
        let executor = TwitterExecutor::new(reqwest::Client::new(), server.uri());
        assert!(executor
            .post(&text, &Credential::Bearer("t".to_string()))
            .await
            .is_ok());
    }
}
