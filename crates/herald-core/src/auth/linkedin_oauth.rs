//! LinkedIn OAuth 2.0 authorization code flow (member posting scope).
//!
//! The user approves in a browser and pastes the `code` back; there is no
//! callback server because the default redirect URI is a hosted page.

use reqwest::Client;
use serde::Deserialize;
use tracing::{error, info};

use crate::config::LinkedInConfig;
use crate::error::{HeraldError, Result};

const SCOPE: &str = "w_member_social";

#[derive(Deserialize)]
struct AccessTokenResponse {
    access_token: Option<String>,
}

pub struct LinkedInOAuth {
    config: LinkedInConfig,
    client: Client,
}

impl LinkedInOAuth {
    pub fn new(config: LinkedInConfig, client: Client) -> Self {
        Self { config, client }
    }

    fn credentials(&self) -> Result<(&str, &str)> {
        match (&self.config.client_id, &self.config.client_secret) {
            (Some(id), Some(secret)) => Ok((id.as_str(), secret.as_str())),
            _ => Err(HeraldError::Config(
                "LinkedIn credentials not configured. Set LINKEDIN_CLIENT_ID and LINKEDIN_CLIENT_SECRET".to_string(),
            )),
        }
    }

    /// Consent page URL for the member-posting scope
    pub fn authorization_url(&self, state: &str) -> Result<String> {
        let (client_id, _) = self.credentials()?;
        Ok(format!(
            "{}?response_type=code&client_id={}&redirect_uri={}&state={}&scope={}",
            self.config.authorize_url,
            urlencoding::encode(client_id),
            urlencoding::encode(&self.config.redirect_uri),
            urlencoding::encode(state),
            SCOPE
        ))
    }

    /// Exchange a pasted authorization code for an access token
    pub async fn exchange_code(&self, code: &str) -> Result<String> {
        let code = code.trim();
        if code.is_empty() {
            return Err(HeraldError::Validation("Authorization code cannot be empty".to_string()));
        }
        let (client_id, client_secret) = self.credentials()?;
        info!("Exchanging LinkedIn authorization code for access token");

        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];

        let response = self
            .client
            .post(&self.config.token_url)
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            error!("LinkedIn token exchange failed: {} - {}", status, body);
            return Err(HeraldError::TokenExchangeFailed {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str::<AccessTokenResponse>(&body)
            .ok()
            .and_then(|r| r.access_token)
            .ok_or(HeraldError::TokenExchangeFailed {
                status: status.as_u16(),
                body,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: Option<&MockServer>) -> LinkedInConfig {
        let mut config = LinkedInConfig {
            client_id: Some("li-client".to_string()),
            client_secret: Some("li-secret".to_string()),
            ..LinkedInConfig::default()
        };
        if let Some(server) = server {
            config.token_url = format!("{}/oauth/v2/accessToken", server.uri());
        }
        config
    }

    #[test]
    fn test_authorization_url() {
        let oauth = LinkedInOAuth::new(config(None), Client::new());
        let url = oauth.authorization_url("st8").unwrap();
        assert!(url.starts_with("https://www.linkedin.com/oauth/v2/authorization?"));
        assert!(url.contains("client_id=li-client"));
        assert!(url.contains("redirect_uri=https%3A%2F%2Foauth.pstmn.io%2Fv1%2Fcallback"));
        assert!(url.contains("state=st8"));
        assert!(url.ends_with("scope=w_member_social"));
    }

    #[test]
    fn test_missing_credentials() {
        let oauth = LinkedInOAuth::new(LinkedInConfig::default(), Client::new());
        assert!(matches!(oauth.authorization_url("s"), Err(HeraldError::Config(_))));
    }

    #[tokio::test]
    async fn test_exchange_code() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/v2/accessToken"))
            .and(body_string_contains("client_secret=li-secret"))
            .and(body_string_contains("code=pasted"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "li-token",
                "expires_in": 5184000
            })))
            .mount(&server)
            .await;

        let oauth = LinkedInOAuth::new(config(Some(&server)), Client::new());
        assert_eq!(oauth.exchange_code(" pasted\n").await.unwrap(), "li-token");
    }

    #[tokio::test]
    async fn test_exchange_without_token_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/v2/accessToken"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let oauth = LinkedInOAuth::new(config(Some(&server)), Client::new());
        assert!(matches!(
            oauth.exchange_code("pasted").await,
            Err(HeraldError::TokenExchangeFailed { status: 200, .. })
        ));
    }
}
