//! PKCE (RFC 7636) and opaque-token generation.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Random bytes behind a code verifier (encodes to 128 chars, the RFC maximum)
const VERIFIER_BYTES: usize = 96;
const STATE_BYTES: usize = 24;
const USER_ID_BYTES: usize = 12;

/// Base64url (no padding) encoding of `len` CSPRNG bytes
pub fn random_token(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

pub fn generate_code_verifier() -> String {
    random_token(VERIFIER_BYTES)
}

/// `BASE64URL(SHA256(verifier))`
pub fn code_challenge(verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// Generate a random state parameter for CSRF protection
pub fn generate_state() -> String {
    random_token(STATE_BYTES)
}

/// Identifier handed to the frontend after a successful connect
pub fn generate_user_id() -> String {
    random_token(USER_ID_BYTES)
}
