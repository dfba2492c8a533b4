//! ============================================================================
//! HERALD-CORE: Generate, Review, Publish
//! ============================================================================
//! Backend logic shared by the HTTP server and the CLI:
//! - Twitter OAuth 2.0 + PKCE handshake with pluggable session/token stores
//! - OAuth 1.0a signing and interactive credential strategies
//! - LLM content generation into structured drafts
//! - Vendor executors (Twitter, LinkedIn, SMTP, Calendly, payment links)
//! ============================================================================

pub mod auth;
pub mod config;
pub mod error;
pub mod executor;
pub mod generator;
pub mod store;
pub mod types;

// Re-export main types for convenience
pub use auth::{Credential, CredentialProvider, TwitterOAuth};
pub use config::HeraldConfig;
pub use error::{HeraldError, Result};
pub use executor::{TwitterExecutor, VendorPoster};
pub use generator::{
    completion_provider, AnthropicClient, ChatCompletionClient, CompletionProvider, ContentGenerator,
    PriceCatalog,
};
pub use store::{open_store, AuthStore, MemoryStore, RedbStore, SessionStore, TokenStore};
pub use types::*;
