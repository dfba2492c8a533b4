//! ============================================================================
//! Core Types for Herald
//! ============================================================================
//! Handshake state, issued credentials, generated content and post receipts.
//! Records that go into the embedded store are bincode-encoded, so they avoid
//! serde attributes that skip fields.
//! ============================================================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// OAuth Handshake Types
// ============================================================================

/// In-flight PKCE handshake, keyed by `state`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub state: String,
    pub code_verifier: String,
    pub code_challenge: String,
    /// Unix seconds; only used for explicit pruning, never for expiry checks
    pub created_at: i64,
}

/// Credentials issued by a successful code exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Lifetime in seconds as reported by the provider (advisory only)
    pub expires_in: Option<u64>,
    pub scope: String,
    pub token_type: Option<String>,
    pub issued_at: i64,
}

impl TokenRecord {
    /// Whether the provider-advertised lifetime has elapsed.
    /// Informational only: stored tokens are never rejected because of it.
    pub fn looks_expired(&self) -> bool {
        match self.expires_in {
            Some(secs) => chrono::Utc::now().timestamp() >= self.issued_at + secs as i64,
            None => false,
        }
    }
}

/// Returned by `begin_authorization`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationRequest {
    pub auth_url: String,
    pub state: String,
}

/// Query parameters delivered to the OAuth redirect URI
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// A freshly connected account: the generated id and its tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectedAccount {
    pub user_id: String,
    pub tokens: TokenRecord,
}

// ============================================================================
// Publishing Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Twitter,
    LinkedIn,
    Email,
    Calendly,
    Payment,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Twitter => "twitter",
            Platform::LinkedIn => "linkedin",
            Platform::Email => "email",
            Platform::Calendly => "calendly",
            Platform::Payment => "payment",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a successful publish
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostReceipt {
    pub platform: Platform,
    pub id: String,
    pub url: Option<String>,
}

// ============================================================================
// Generated Content Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptKind {
    Tweet,
    Email,
    LinkedInPost,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TweetDraft {
    pub content: String,
    #[serde(default)]
    pub hashtags: Vec<String>,
}

impl TweetDraft {
    /// Tweet text with hashtags appended, space separated
    pub fn formatted(&self) -> String {
        if self.hashtags.is_empty() {
            self.content.clone()
        } else {
            format!("{} {}", self.content, self.hashtags.join(" "))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailDraft {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedInDraft {
    pub body: String,
}

impl LinkedInDraft {
    /// Post body followed by a tracking link on its own line
    pub fn with_link(&self, link: &str) -> String {
        if link.trim().is_empty() {
            self.body.clone()
        } else {
            format!("{}\n{}", self.body, link.trim())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructuredContent {
    Tweet(TweetDraft),
    Email(EmailDraft),
    LinkedInPost(LinkedInDraft),
}

impl StructuredContent {
    /// Text shown to a reviewer before publishing
    pub fn preview(&self) -> String {
        match self {
            StructuredContent::Tweet(t) => t.formatted(),
            StructuredContent::Email(e) => {
                format!("To: {}\nSubject: {}\n\n{}", e.recipient, e.subject, e.body)
            }
            StructuredContent::LinkedInPost(p) => p.body.clone(),
        }
    }
}
