//! Token Broker Interface
//!
//! Each provider plugs its authorization-code flow in behind the
//! [`TokenBroker`] trait: authorize-URL construction (pure, no network),
//! code exchange, and refresh. The session layer owns when those calls
//! happen; brokers own how the provider's token endpoint is spoken to.
//!
//! State and PKCE helpers live here so every broker generates them the
//! same way.
//!
//! # Security
//!
//! - State parameters are cryptographically random (CSRF protection)
//! - PKCE verifiers never leave the process; only the SHA-256 challenge
//!   is put on the wire
//! - Codes, verifiers, and tokens are never logged

use crate::error::{AuthError, Result};
use crate::types::Credential;
use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng;
use sha2::{Digest, Sha256};
use url::Url;

/// The authorization URL handed to the host to open in a browser.
#[derive(Debug, Clone)]
pub struct AuthorizeUrl {
    /// Fully-formed URL including state (and PKCE challenge if used)
    pub url: String,
    /// The state parameter embedded in the URL, for callback validation
    pub state: String,
}

/// PKCE verifier/challenge pair (RFC 7636, S256 method).
#[derive(Debug, Clone)]
pub struct PkcePair {
    /// The secret verifier, sent only in the token request
    pub verifier: String,
    /// The derived challenge, sent in the authorize URL
    pub challenge: String,
}

impl PkcePair {
    /// Generate a fresh verifier and its S256 challenge.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill(&mut bytes);
        let verifier = URL_SAFE_NO_PAD.encode(bytes);

        let digest = Sha256::digest(verifier.as_bytes());
        let challenge = URL_SAFE_NO_PAD.encode(digest);

        Self {
            verifier,
            challenge,
        }
    }
}

/// Generate a random state parameter for CSRF protection.
pub fn generate_state() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// The pending-login context a session holds between `start_login` and
/// `exchange_code`.
#[derive(Debug, Clone)]
pub struct LoginChallenge {
    pub state: String,
    pub pkce: Option<PkcePair>,
}

impl LoginChallenge {
    pub fn new(pkce: Option<PkcePair>) -> Self {
        Self {
            state: generate_state(),
            pkce,
        }
    }
}

/// Append query parameters to a base authorize URL.
///
/// Shared by broker implementations so URL construction stays pure and
/// uniformly validated.
pub fn build_authorize_url(base: &str, params: &[(&str, &str)]) -> Result<String> {
    let mut url = Url::parse(base).map_err(|e| AuthError::InvalidUrl(e.to_string()))?;
    {
        let mut query = url.query_pairs_mut();
        for (key, value) in params {
            query.append_pair(key, value);
        }
    }
    Ok(url.into())
}

/// Provider-specific token endpoint client.
///
/// Implementations perform the actual HTTP form posts through the host's
/// `HttpClient`; the session layer wraps every call in the bounded
/// request executor.
#[async_trait]
pub trait TokenBroker: Send + Sync {
    /// Build the authorization URL for `challenge`. Pure; no network.
    fn authorize_url(&self, challenge: &LoginChallenge) -> Result<AuthorizeUrl>;

    /// Exchange an authorization code for a credential.
    async fn exchange_code(&self, code: &str, challenge: &LoginChallenge) -> Result<Credential>;

    /// Obtain a new credential from a refresh token.
    async fn refresh(&self, refresh_token: &str) -> Result<Credential>;
}
