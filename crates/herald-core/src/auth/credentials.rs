//! ============================================================================
//! Credential Providers
//! ============================================================================
//! Strategies that produce a `Credential` for a vendor poster. Front ends
//! pick a strategy up front; posters never decide how to authenticate.
//! - StoredTokenCredentials: bearer token from a completed PKCE handshake
//! - StaticOAuth1Credentials: pre-provisioned OAuth 1.0a user token
//! - OAuth1PinFlow: interactive PIN flow (CLI only)
//! - LinkedInCodeFlow: interactive paste-the-code flow (CLI only)
//! ============================================================================

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use super::linkedin_oauth::LinkedInOAuth;
use super::oauth1::{OAuth1Token, TwitterPinAuth};
use super::pkce;
use crate::error::{HeraldError, Result};
use crate::store::{AuthStore, TokenStore};

/// What a poster needs to authenticate one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    Bearer(String),
    OAuth1(OAuth1Token),
}

#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn credential(&self) -> Result<Credential>;
}

/// Asks a human for a value shown on a provider's consent page
pub trait VerifierPrompt: Send + Sync {
    fn prompt(&self, authorize_url: &str, message: &str) -> Result<String>;
}

// ============================================================================
// Non-interactive strategies
// ============================================================================

/// Bearer token stored under a `user_id` by the PKCE handshake
pub struct StoredTokenCredentials {
    store: Arc<dyn AuthStore>,
    user_id: String,
}

impl StoredTokenCredentials {
    pub fn new(store: Arc<dyn AuthStore>, user_id: impl Into<String>) -> Self {
        Self {
            store,
            user_id: user_id.into(),
        }
    }
}

#[async_trait]
impl CredentialProvider for StoredTokenCredentials {
    async fn credential(&self) -> Result<Credential> {
        let record = self
            .store
            .lookup(&self.user_id)
            .await?
            .ok_or_else(|| HeraldError::NotFound(format!("No tokens stored for user {}", self.user_id)))?;
        if record.looks_expired() {
            info!("Stored token for user {} may have expired; using it anyway", self.user_id);
        }
        Ok(Credential::Bearer(record.access_token))
    }
}

/// OAuth 1.0a user token provisioned through configuration
pub struct StaticOAuth1Credentials {
    token: OAuth1Token,
}

impl StaticOAuth1Credentials {
    pub fn new(token: OAuth1Token) -> Self {
        Self { token }
    }
}

#[async_trait]
impl CredentialProvider for StaticOAuth1Credentials {
    async fn credential(&self) -> Result<Credential> {
        Ok(Credential::OAuth1(self.token.clone()))
    }
}

// ============================================================================
// Interactive strategies
// ============================================================================

/// Twitter PIN-based OAuth 1.0a login
pub struct OAuth1PinFlow {
    auth: TwitterPinAuth,
    prompt: Box<dyn VerifierPrompt>,
}

impl OAuth1PinFlow {
    pub fn new(auth: TwitterPinAuth, prompt: Box<dyn VerifierPrompt>) -> Self {
        Self { auth, prompt }
    }
}

#[async_trait]
impl CredentialProvider for OAuth1PinFlow {
    async fn credential(&self) -> Result<Credential> {
        let request = self.auth.request_token().await?;
        let url = self.auth.authorize_url(&request);
        let pin = self.prompt.prompt(&url, "Enter the PIN shown after authorizing")?;
        let token = self.auth.access_token(&request, &pin).await?;
        Ok(Credential::OAuth1(token))
    }
}

/// LinkedIn authorization code pasted back by the user
pub struct LinkedInCodeFlow {
    oauth: LinkedInOAuth,
    prompt: Box<dyn VerifierPrompt>,
}

impl LinkedInCodeFlow {
    pub fn new(oauth: LinkedInOAuth, prompt: Box<dyn VerifierPrompt>) -> Self {
        Self { oauth, prompt }
    }
}

#[async_trait]
impl CredentialProvider for LinkedInCodeFlow {
    async fn credential(&self) -> Result<Credential> {
        let url = self.oauth.authorization_url(&pkce::generate_state())?;
        let code = self.prompt.prompt(&url, "Paste the authorization code")?;
        let token = self.oauth.exchange_code(&code).await?;
        Ok(Credential::Bearer(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::OAuth1Consumer;
    use crate::config::LinkedInConfig;
    use crate::store::MemoryStore;
    use crate::types::TokenRecord;
    use std::sync::Mutex;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Returns a canned answer and remembers the URL it was shown
    struct CannedPrompt {
        answer: String,
        seen_url: Arc<Mutex<Option<String>>>,
    }

    impl VerifierPrompt for CannedPrompt {
        fn prompt(&self, authorize_url: &str, _message: &str) -> Result<String> {
            *self.seen_url.lock().unwrap() = Some(authorize_url.to_string());
            Ok(self.answer.clone())
        }
    }

    #[tokio::test]
    async fn test_stored_token_credentials() {
        let store = Arc::new(MemoryStore::new());
        store
            .put_token(
                "u1",
                TokenRecord {
                    access_token: "t1".to_string(),
                    refresh_token: None,
                    expires_in: None,
                    scope: String::new(),
                    token_type: None,
                    issued_at: 0,
                },
            )
            .await
            .unwrap();

        let found = StoredTokenCredentials::new(store.clone(), "u1");
        assert_eq!(found.credential().await.unwrap(), Credential::Bearer("t1".to_string()));

        let missing = StoredTokenCredentials::new(store, "nobody");
        assert!(matches!(missing.credential().await, Err(HeraldError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_pin_flow_uses_prompt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/request_token"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("oauth_token=rt&oauth_token_secret=rs"),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/oauth/access_token"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("oauth_token=at&oauth_token_secret=as"),
            )
            .mount(&server)
            .await;

        let seen_url = Arc::new(Mutex::new(None));
        let flow = OAuth1PinFlow::new(
            TwitterPinAuth::new(
                reqwest::Client::new(),
                OAuth1Consumer {
                    key: "ck".to_string(),
                    secret: "cs".to_string(),
                },
                server.uri(),
            ),
            Box::new(CannedPrompt {
                answer: "0000".to_string(),
                seen_url: seen_url.clone(),
            }),
        );

        match flow.credential().await.unwrap() {
            Credential::OAuth1(token) => {
                assert_eq!(token.token, "at");
                assert_eq!(token.token_secret, "as");
            }
            other => panic!("unexpected credential: {:?}", other),
        }
        let url = seen_url.lock().unwrap().clone().unwrap();
        assert!(url.contains("oauth_token=rt"));
    }

    #[tokio::test]
    async fn test_linkedin_code_flow() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/v2/accessToken"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"access_token": "li"})),
            )
            .mount(&server)
            .await;

        let config = LinkedInConfig {
            client_id: Some("id".to_string()),
            client_secret: Some("secret".to_string()),
            token_url: format!("{}/oauth/v2/accessToken", server.uri()),
            ..LinkedInConfig::default()
        };
        let seen_url = Arc::new(Mutex::new(None));
        let flow = LinkedInCodeFlow::new(
            LinkedInOAuth::new(config, reqwest::Client::new()),
            Box::new(CannedPrompt {
                answer: "code-123".to_string(),
                seen_url: seen_url.clone(),
            }),
        );

        assert_eq!(flow.credential().await.unwrap(), Credential::Bearer("li".to_string()));
        assert!(seen_url.lock().unwrap().as_deref().unwrap().contains("scope=w_member_social"));
    }
}
