//! ============================================================================
//! Configuration - Environment-driven settings
//! ============================================================================
//! Every section has a `Default` with production endpoints and a `from_env()`
//! that overlays environment variables (a `.env` file is loaded by the
//! binaries through dotenvy). Vendor base URLs are overridable so tests and
//! staging setups can point at other hosts.
//! ============================================================================

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::auth::{OAuth1Consumer, OAuth1Token};
use crate::error::{HeraldError, Result};

/// Read a variable, treating empty values as unset
fn env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_or(key: &str, default: String) -> String {
    env(key).unwrap_or(default)
}

fn env_parse<T: FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match env(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| HeraldError::Config(format!("{} has invalid value '{}': {}", key, raw, e))),
        None => Ok(default),
    }
}

/// Load `.env` from the working directory if present
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!("Could not load .env file: {}", e),
    }
}

// ============================================================================
// Top-level config
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct HeraldConfig {
    pub twitter: TwitterConfig,
    pub linkedin: LinkedInConfig,
    pub llm: LlmConfig,
    pub smtp: SmtpConfig,
    pub calendly: CalendlyConfig,
    pub payment: PaymentConfig,
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub http: HttpConfig,
}

impl HeraldConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            twitter: TwitterConfig::from_env(),
            linkedin: LinkedInConfig::from_env(),
            llm: LlmConfig::from_env()?,
            smtp: SmtpConfig::from_env()?,
            calendly: CalendlyConfig::from_env(),
            payment: PaymentConfig::from_env(),
            server: ServerConfig::from_env(),
            store: StoreConfig::from_env()?,
            http: HttpConfig::from_env()?,
        })
    }
}

// ============================================================================
// Twitter
// ============================================================================

#[derive(Debug, Clone)]
pub struct TwitterConfig {
    /// OAuth 2.0 client id (public or confidential client)
    pub client_id: Option<String>,
    /// Present only for confidential clients; enables HTTP Basic auth on exchange
    pub client_secret: Option<String>,
    pub redirect_uri: String,
    pub scopes: String,
    pub authorize_url: String,
    pub token_url: String,
    pub api_base: String,
    /// OAuth 1.0a consumer key/secret
    pub consumer_key: Option<String>,
    pub consumer_secret: Option<String>,
    /// Pre-provisioned OAuth 1.0a user token for non-interactive posting
    pub access_token: Option<String>,
    pub access_token_secret: Option<String>,
}

impl Default for TwitterConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            redirect_uri: "http://localhost:8000/twitter/callback".to_string(),
            scopes: "tweet.read tweet.write users.read offline.access".to_string(),
            authorize_url: "https://twitter.com/i/oauth2/authorize".to_string(),
            token_url: "https://api.twitter.com/2/oauth2/token".to_string(),
            api_base: "https://api.twitter.com".to_string(),
            consumer_key: None,
            consumer_secret: None,
            access_token: None,
            access_token_secret: None,
        }
    }
}

impl TwitterConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            client_id: env("TWITTER_CLIENT_ID").or_else(|| env("CLIENT_ID")),
            client_secret: env("TWITTER_CLIENT_SECRET").or_else(|| env("CLIENT_SECRET")),
            redirect_uri: env_or("TWITTER_REDIRECT_URI", d.redirect_uri),
            scopes: env_or("TWITTER_SCOPES", d.scopes),
            authorize_url: env_or("TWITTER_AUTHORIZE_URL", d.authorize_url),
            token_url: env_or("TWITTER_TOKEN_URL", d.token_url),
            api_base: env_or("TWITTER_API_BASE", d.api_base),
            consumer_key: env("TWITTER_API_KEY"),
            consumer_secret: env("TWITTER_API_KEY_SECRET"),
            access_token: env("TWITTER_ACCESS_TOKEN"),
            access_token_secret: env("TWITTER_ACCESS_TOKEN_SECRET"),
        }
    }

    pub fn consumer(&self) -> Option<OAuth1Consumer> {
        match (&self.consumer_key, &self.consumer_secret) {
            (Some(key), Some(secret)) => Some(OAuth1Consumer {
                key: key.clone(),
                secret: secret.clone(),
            }),
            _ => None,
        }
    }

    /// Consumer plus user token, when all four OAuth 1.0a values are configured
    pub fn static_oauth1_token(&self) -> Option<OAuth1Token> {
        let consumer = self.consumer()?;
        match (&self.access_token, &self.access_token_secret) {
            (Some(token), Some(secret)) => Some(OAuth1Token {
                consumer,
                token: token.clone(),
                token_secret: secret.clone(),
            }),
            _ => None,
        }
    }
}

// ============================================================================
// LinkedIn
// ============================================================================

#[derive(Debug, Clone)]
pub struct LinkedInConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: String,
    pub authorize_url: String,
    pub token_url: String,
    pub api_base: String,
}

impl Default for LinkedInConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            redirect_uri: "https://oauth.pstmn.io/v1/callback".to_string(),
            authorize_url: "https://www.linkedin.com/oauth/v2/authorization".to_string(),
            token_url: "https://www.linkedin.com/oauth/v2/accessToken".to_string(),
            api_base: "https://api.linkedin.com".to_string(),
        }
    }
}

impl LinkedInConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            client_id: env("LINKEDIN_CLIENT_ID"),
            client_secret: env("LINKEDIN_CLIENT_SECRET"),
            redirect_uri: env_or("LINKEDIN_REDIRECT_URI", d.redirect_uri),
            authorize_url: env_or("LINKEDIN_AUTHORIZE_URL", d.authorize_url),
            token_url: env_or("LINKEDIN_TOKEN_URL", d.token_url),
            api_base: env_or("LINKEDIN_API_BASE", d.api_base),
        }
    }
}

// ============================================================================
// LLM
// ============================================================================

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    /// OpenAI-compatible base URL; `/chat/completions` is appended
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Used instead of `api_key` when `model` names an Anthropic model
    pub anthropic_api_key: Option<String>,
    /// Messages API base URL; `/messages` is appended
    pub anthropic_base_url: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            anthropic_api_key: None,
            anthropic_base_url: "https://api.anthropic.com/v1".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-3.5-turbo-1106".to_string(),
            temperature: 0.2,
            max_tokens: 1000,
        }
    }
}

impl LlmConfig {
    pub fn from_env() -> Result<Self> {
        let d = Self::default();
        Ok(Self {
            api_key: env("OPENAI_API_KEY").or_else(|| env("LLM_API_KEY")),
            base_url: env_or("LLM_BASE_URL", d.base_url),
            model: env_or("GPT_MODEL", d.model),
            temperature: env_parse("LLM_TEMPERATURE", d.temperature)?,
            max_tokens: env_parse("LLM_MAX_TOKENS", d.max_tokens)?,
            anthropic_api_key: env("ANTHROPIC_API_KEY"),
            anthropic_base_url: env_or("ANTHROPIC_BASE_URL", d.anthropic_base_url),
        })
    }

    /// `GPT_MODEL` values such as `anthropic.claude-3-haiku-20240307-v1:0` go to Anthropic
    pub fn uses_anthropic(&self) -> bool {
        let model = self.model.to_lowercase();
        model.contains("anthropic") || model.starts_with("claude")
    }
}

// ============================================================================
// SMTP
// ============================================================================

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_name: Option<String>,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: "smtp.gmail.com".to_string(),
            port: 465,
            username: None,
            password: None,
            from_name: None,
        }
    }
}

impl SmtpConfig {
    pub fn from_env() -> Result<Self> {
        let d = Self::default();
        Ok(Self {
            host: env_or("SMTP_HOST", d.host),
            port: env_parse("SMTP_PORT", d.port)?,
            username: env("GMAIL_MAIL").or_else(|| env("SMTP_USERNAME")),
            password: env("GMAIL_APP_PASSWORD").or_else(|| env("SMTP_PASSWORD")),
            from_name: env("EMAIL_FROM_NAME"),
        })
    }
}

// ============================================================================
// Calendly + Payment gateway
// ============================================================================

#[derive(Debug, Clone)]
pub struct CalendlyConfig {
    pub api_key: Option<String>,
    pub event_uuid: Option<String>,
    pub api_base: String,
}

impl Default for CalendlyConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            event_uuid: None,
            api_base: "https://api.calendly.com".to_string(),
        }
    }
}

impl CalendlyConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            api_key: env("CALENDLY_API_KEY"),
            event_uuid: env("CALENDLY_EVENT_UUID"),
            api_base: env_or("CALENDLY_API_BASE", d.api_base),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PaymentConfig {
    pub gateway_url: String,
    pub stripe_key: Option<String>,
    /// JSON file mapping product names to Stripe price ids
    pub price_mapping_path: PathBuf,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            gateway_url: "https://agent-payments-gateway.vercel.app/payment".to_string(),
            stripe_key: None,
            price_mapping_path: PathBuf::from("example_product_price_id_mapping.json"),
        }
    }
}

impl PaymentConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            gateway_url: env_or("PAYMENT_GATEWAY_URL", d.gateway_url),
            stripe_key: env("STRIPE_API_KEY"),
            price_mapping_path: env("PRODUCT_PRICE_MAPPING")
                .map(PathBuf::from)
                .unwrap_or(d.price_mapping_path),
        }
    }
}

// ============================================================================
// Server, store, HTTP client
// ============================================================================

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// Where the OAuth callback redirects the browser after connecting
    pub frontend_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
            frontend_url: "http://localhost:3000".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            bind_addr: env_or("HERALD_BIND_ADDR", d.bind_addr),
            frontend_url: env_or("FRONTEND_URL", d.frontend_url),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreBackend {
    #[default]
    Memory,
    Redb,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" | "mem" => Ok(StoreBackend::Memory),
            "redb" | "disk" => Ok(StoreBackend::Redb),
            other => Err(format!("unknown store backend '{}' (expected memory or redb)", other)),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Database file for the redb backend; defaults to ~/.herald/herald.redb
    pub db_path: Option<PathBuf>,
}

impl StoreConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_env_or(StoreBackend::Memory)
    }

    /// Same as `from_env`, with `default` used when `HERALD_STORE` is unset
    pub fn from_env_or(default: StoreBackend) -> Result<Self> {
        Ok(Self {
            backend: env_parse("HERALD_STORE", default)?,
            db_path: env("HERALD_DB_PATH").map(PathBuf::from),
        })
    }
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// How long the CLI loopback listener waits for the OAuth redirect
    pub callback_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            connect_timeout_secs: 10,
            callback_timeout_secs: 300,
        }
    }
}

impl HttpConfig {
    pub fn from_env() -> Result<Self> {
        let d = Self::default();
        Ok(Self {
            timeout_secs: env_parse("HERALD_HTTP_TIMEOUT_SECS", d.timeout_secs)?,
            connect_timeout_secs: env_parse("HERALD_CONNECT_TIMEOUT_SECS", d.connect_timeout_secs)?,
            callback_timeout_secs: env_parse("HERALD_CALLBACK_TIMEOUT_SECS", d.callback_timeout_secs)?,
        })
    }

    /// Shared client for every outbound call, with request timeouts applied
    pub fn build_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .user_agent(concat!("herald/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(HeraldError::Http)
    }
}
