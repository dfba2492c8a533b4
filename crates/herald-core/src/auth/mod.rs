//! ============================================================================
//! Auth Module - OAuth and Authentication Flows
//! ============================================================================
//! Handles authentication for external services:
//! - Twitter OAuth 2.0 + PKCE (web and CLI login)
//! - Twitter OAuth 1.0a request signing and PIN flow
//! - LinkedIn OAuth 2.0 authorization code flow
//! - Credential providers handed to the vendor posters
//! ============================================================================

mod credentials;
mod linkedin_oauth;
pub mod loopback;
mod oauth1;
pub mod pkce;
mod twitter_oauth;

pub use credentials::{
    Credential, CredentialProvider, LinkedInCodeFlow, OAuth1PinFlow, StaticOAuth1Credentials,
    StoredTokenCredentials, VerifierPrompt,
};
pub use linkedin_oauth::LinkedInOAuth;
pub use oauth1::{authorization_header, OAuth1Consumer, OAuth1Token, RequestToken, TwitterPinAuth};
pub use twitter_oauth::TwitterOAuth;
