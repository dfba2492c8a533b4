//! ============================================================================
//! Twitter OAuth 1.0a - Request Signing + PIN Flow
//! ============================================================================
//! HMAC-SHA1 request signing (RFC 5849) and the out-of-band PIN flow:
//! request token -> user authorizes in browser -> PIN -> access token.
//! ============================================================================

use base64::{engine::general_purpose::STANDARD, Engine};
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use std::collections::HashMap;
use tracing::{debug, error, info};
use url::Url;

use crate::error::{HeraldError, Result};

type HmacSha1 = Hmac<Sha1>;

/// RFC 3986 unreserved characters stay literal, everything else is escaped
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Application (consumer) credentials
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuth1Consumer {
    pub key: String,
    pub secret: String,
}

/// Fully negotiated user credentials, ready to sign requests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuth1Token {
    pub consumer: OAuth1Consumer,
    pub token: String,
    pub token_secret: String,
}

pub(crate) fn percent_encode(s: &str) -> String {
    utf8_percent_encode(s, OAUTH_ENCODE_SET).to_string()
}

fn nonce() -> String {
    use rand::distributions::Alphanumeric;
    use rand::Rng;
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

/// Everything that goes into one signature
struct SigningInput<'a> {
    method: &'a str,
    url: &'a str,
    consumer: &'a OAuth1Consumer,
    token: Option<(&'a str, &'a str)>,
    /// Extra `oauth_*` protocol parameters (callback, verifier)
    oauth_extras: &'a [(&'a str, &'a str)],
    /// Form-encoded body parameters; JSON bodies are not signed
    form_params: &'a [(&'a str, &'a str)],
    nonce: &'a str,
    timestamp: i64,
}

fn build_authorization_header(input: &SigningInput<'_>) -> Result<String> {
    let parsed = Url::parse(input.url)
        .map_err(|e| HeraldError::Validation(format!("Invalid URL to sign '{}': {}", input.url, e)))?;

    let host = parsed
        .host_str()
        .ok_or_else(|| HeraldError::Validation(format!("URL has no host: {}", input.url)))?;
    let base_url = match parsed.port() {
        Some(port) => format!("{}://{}:{}{}", parsed.scheme(), host.to_lowercase(), port, parsed.path()),
        None => format!("{}://{}{}", parsed.scheme(), host.to_lowercase(), parsed.path()),
    };

    let timestamp = input.timestamp.to_string();
    let mut oauth_params: Vec<(String, String)> = vec![
        ("oauth_consumer_key".into(), input.consumer.key.clone()),
        ("oauth_nonce".into(), input.nonce.to_string()),
        ("oauth_signature_method".into(), "HMAC-SHA1".into()),
        ("oauth_timestamp".into(), timestamp),
        ("oauth_version".into(), "1.0".into()),
    ];
    if let Some((token, _)) = input.token {
        oauth_params.push(("oauth_token".into(), token.to_string()));
    }
    for (k, v) in input.oauth_extras {
        oauth_params.push((k.to_string(), v.to_string()));
    }

    let mut signed: Vec<(String, String)> = oauth_params
        .iter()
        .map(|(k, v)| (percent_encode(k), percent_encode(v)))
        .collect();
    signed.extend(
        parsed
            .query_pairs()
            .map(|(k, v)| (percent_encode(&k), percent_encode(&v))),
    );
    signed.extend(
        input
            .form_params
            .iter()
            .map(|(k, v)| (percent_encode(k), percent_encode(v))),
    );
    signed.sort();

    let param_string = signed
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let base_string = format!(
        "{}&{}&{}",
        input.method.to_uppercase(),
        percent_encode(&base_url),
        percent_encode(&param_string)
    );

    let token_secret = input.token.map(|(_, secret)| secret).unwrap_or("");
    let signing_key = format!(
        "{}&{}",
        percent_encode(&input.consumer.secret),
        percent_encode(token_secret)
    );

    let mut mac = HmacSha1::new_from_slice(signing_key.as_bytes())
        .map_err(|e| HeraldError::Config(format!("Invalid signing key: {}", e)))?;
    mac.update(base_string.as_bytes());
    let signature = STANDARD.encode(mac.finalize().into_bytes());

    oauth_params.push(("oauth_signature".into(), signature));
    oauth_params.sort();

    let header = oauth_params
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>()
        .join(", ");

    Ok(format!("OAuth {}", header))
}

/// Sign a request with a negotiated user token. `form_params` must be the
/// form-encoded body, if any; JSON bodies are left out of the signature.
pub fn authorization_header(
    method: &str,
    url: &str,
    token: &OAuth1Token,
    form_params: &[(&str, &str)],
) -> Result<String> {
    let nonce = nonce();
    build_authorization_header(&SigningInput {
        method,
        url,
        consumer: &token.consumer,
        token: Some((&token.token, &token.token_secret)),
        oauth_extras: &[],
        form_params,
        nonce: &nonce,
        timestamp: chrono::Utc::now().timestamp(),
    })
}

// ============================================================================
// PIN-based (out-of-band) flow
// ============================================================================

/// Temporary credentials from the request-token step
#[derive(Debug, Clone)]
pub struct RequestToken {
    pub token: String,
    pub token_secret: String,
}

/// Client for the three-legged out-of-band flow
pub struct TwitterPinAuth {
    client: reqwest::Client,
    consumer: OAuth1Consumer,
    api_base: String,
}

impl TwitterPinAuth {
    pub fn new(client: reqwest::Client, consumer: OAuth1Consumer, api_base: impl Into<String>) -> Self {
        Self {
            client,
            consumer,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// Obtain temporary credentials with write access
    pub async fn request_token(&self) -> Result<RequestToken> {
        let url = format!(
            "{}/oauth/request_token?oauth_callback=oob&x_auth_access_type=write",
            self.api_base
        );
        info!("Requesting OAuth 1.0a request token");

        let nonce = nonce();
        let header = build_authorization_header(&SigningInput {
            method: "POST",
            url: &url,
            consumer: &self.consumer,
            token: None,
            oauth_extras: &[],
            form_params: &[],
            nonce: &nonce,
            timestamp: chrono::Utc::now().timestamp(),
        })?;

        let fields = self.post_form_response(&url, header).await?;
        Ok(RequestToken {
            token: take_field(&fields, "oauth_token")?,
            token_secret: take_field(&fields, "oauth_token_secret")?,
        })
    }

    /// Browser URL where the user approves the app and receives a PIN
    pub fn authorize_url(&self, request: &RequestToken) -> String {
        format!(
            "{}/oauth/authorize?oauth_token={}",
            self.api_base,
            urlencoding::encode(&request.token)
        )
    }

    /// Trade the request token + PIN for long-lived user credentials
    pub async fn access_token(&self, request: &RequestToken, verifier: &str) -> Result<OAuth1Token> {
        let verifier = verifier.trim();
        if verifier.is_empty() {
            return Err(HeraldError::Validation("PIN cannot be empty".to_string()));
        }

        let url = format!("{}/oauth/access_token", self.api_base);
        info!("Exchanging PIN for OAuth 1.0a access token");

        let nonce = nonce();
        let header = build_authorization_header(&SigningInput {
            method: "POST",
            url: &url,
            consumer: &self.consumer,
            token: Some((&request.token, &request.token_secret)),
            oauth_extras: &[("oauth_verifier", verifier)],
            form_params: &[],
            nonce: &nonce,
            timestamp: chrono::Utc::now().timestamp(),
        })?;

        let fields = self.post_form_response(&url, header).await?;
        if let Some(name) = fields.get("screen_name") {
            info!("Authorized as @{}", name);
        }

        Ok(OAuth1Token {
            consumer: self.consumer.clone(),
            token: take_field(&fields, "oauth_token")?,
            token_secret: take_field(&fields, "oauth_token_secret")?,
        })
    }

    async fn post_form_response(&self, url: &str, header: String) -> Result<HashMap<String, String>> {
        let response = self
            .client
            .post(url)
            .header("Authorization", header)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            error!("OAuth 1.0a token request failed: {} - {}", status, body);
            return Err(HeraldError::TokenExchangeFailed {
                status: status.as_u16(),
                body,
            });
        }

        debug!("OAuth 1.0a token response: {} bytes", body.len());
        Ok(url::form_urlencoded::parse(body.as_bytes())
            .into_owned()
            .collect())
    }
}

fn take_field(fields: &HashMap<String, String>, name: &str) -> Result<String> {
    fields
        .get(name)
        .cloned()
        .ok_or_else(|| HeraldError::TokenExchangeFailed {
            status: 200,
            body: format!("missing {} in token response", name),
        })
}
