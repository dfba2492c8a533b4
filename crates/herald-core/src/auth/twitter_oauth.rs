//! ============================================================================
//! Twitter OAuth 2.0 + PKCE Authentication
//! ============================================================================
//! Authorization code flow with PKCE. Works as a public client (no secret)
//! or a confidential client (HTTP Basic on the token request) depending on
//! whether a client secret is configured. Handshake state lives in the
//! injected store, so the same client serves the web backend and the CLI.
//! ============================================================================

use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::pkce;
use crate::config::TwitterConfig;
use crate::error::{HeraldError, Result};
use crate::store::{AuthStore, SessionStore, TokenStore};
use crate::types::{AuthSession, AuthorizationRequest, CallbackParams, ConnectedAccount, TokenRecord};

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<u64>,
    #[serde(default)]
    scope: String,
    token_type: Option<String>,
}

/// Twitter OAuth 2.0 client
pub struct TwitterOAuth {
    config: TwitterConfig,
    client: Client,
    store: Arc<dyn AuthStore>,
}

impl TwitterOAuth {
    pub fn new(config: TwitterConfig, client: Client, store: Arc<dyn AuthStore>) -> Self {
        Self {
            config,
            client,
            store,
        }
    }

    pub fn store(&self) -> &Arc<dyn AuthStore> {
        &self.store
    }

    pub fn redirect_uri(&self) -> &str {
        &self.config.redirect_uri
    }

    fn client_id(&self) -> Result<&str> {
        self.config
            .client_id
            .as_deref()
            .ok_or_else(|| HeraldError::Config("CLIENT_ID is not set".to_string()))
    }

    /// Start a handshake: persist a fresh session and build the consent URL
    pub async fn begin_authorization(&self) -> Result<AuthorizationRequest> {
        let client_id = self.client_id()?;

        let verifier = pkce::generate_code_verifier();
        let challenge = pkce::code_challenge(&verifier);
        let state = pkce::generate_state();

        let auth_url = format!(
            "{}?response_type=code&client_id={}&redirect_uri={}&scope={}&state={}&code_challenge={}&code_challenge_method=S256",
            self.config.authorize_url,
            urlencoding::encode(client_id),
            urlencoding::encode(&self.config.redirect_uri),
            urlencoding::encode(&self.config.scopes),
            urlencoding::encode(&state),
            urlencoding::encode(&challenge)
        );

        self.store
            .put_session(AuthSession {
                state: state.clone(),
                code_verifier: verifier,
                code_challenge: challenge,
                created_at: chrono::Utc::now().timestamp(),
            })
            .await?;

        info!("Issued Twitter authorization URL");
        Ok(AuthorizationRequest { auth_url, state })
    }

    /// Finish a handshake from the redirect's query parameters.
    /// The session is consumed only once the provider has issued tokens, so
    /// a failed exchange can be retried with the same state.
    pub async fn handle_callback(&self, params: CallbackParams) -> Result<ConnectedAccount> {
        if let Some(error) = params.error {
            warn!("Twitter authorization denied: {}", error);
            return Err(HeraldError::AuthorizationDenied {
                error,
                description: params.error_description,
            });
        }

        let state = params
            .state
            .filter(|s| !s.is_empty())
            .ok_or(HeraldError::InvalidOrExpiredState)?;
        let session = self
            .store
            .get_session(&state)
            .await?
            .ok_or(HeraldError::InvalidOrExpiredState)?;

        let code = params
            .code
            .filter(|c| !c.is_empty())
            .ok_or_else(|| HeraldError::Validation("No authorization code in callback".to_string()))?;

        let tokens = self.exchange_code(&code, &session.code_verifier).await?;

        if self.store.take_session(&state).await?.is_none() {
            warn!("Auth session consumed concurrently; discarding issued tokens");
            return Err(HeraldError::InvalidOrExpiredState);
        }

        let user_id = pkce::generate_user_id();
        self.store.put_token(&user_id, tokens.clone()).await?;

        info!("Twitter account connected as user {}", user_id);
        Ok(ConnectedAccount { user_id, tokens })
    }

    /// Exchange authorization code for access tokens
    async fn exchange_code(&self, code: &str, verifier: &str) -> Result<TokenRecord> {
        info!("Exchanging authorization code for tokens");
        let client_id = self.client_id()?;

        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("client_id", client_id),
            ("code_verifier", verifier),
        ];

        let mut request = self.client.post(&self.config.token_url).form(&params);
        if let Some(secret) = &self.config.client_secret {
            request = request.basic_auth(client_id, Some(secret));
        }

        let response = request.send().await.map_err(|e| {
            error!("Token request failed: {}", e);
            HeraldError::Http(e)
        })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            error!("Token exchange failed: {} - {}", status, body);
            return Err(HeraldError::TokenExchangeFailed {
                status: status.as_u16(),
                body,
            });
        }

        let token_response: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            error!("Failed to parse token response: {}", e);
            HeraldError::TokenExchangeFailed {
                status: status.as_u16(),
                body: body.clone(),
            }
        })?;

        debug!(
            "Obtained tokens (refresh token: {}, expires_in: {:?})",
            token_response.refresh_token.is_some(),
            token_response.expires_in
        );

        Ok(TokenRecord {
            access_token: token_response.access_token,
            refresh_token: token_response.refresh_token,
            expires_in: token_response.expires_in,
            scope: token_response.scope,
            token_type: token_response.token_type,
            issued_at: chrono::Utc::now().timestamp(),
        })
    }
}
