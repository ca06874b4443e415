//! Epic token broker
//!
//! Speaks the Epic account service's authorization-code flow: authorize
//! URL construction, code exchange, and refresh-token grants, all as
//! form posts with Basic client authentication.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
use core_auth::{
    build_authorize_url, AuthError, AuthorizeUrl, Credential, LoginChallenge, ProviderKind,
    Result, TokenBroker,
};
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::types::{TokenErrorResponse, TokenResponse};

/// Default authorize endpoint
pub const AUTHORIZE_URL: &str = "https://www.epicgames.com/id/authorize";

/// Default token endpoint
pub const TOKEN_URL: &str = "https://api.epicgames.dev/epic/oauth/v2/token";

/// Client configuration for the Epic account service.
#[derive(Clone)]
pub struct EpicAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

pub struct EpicTokenBroker {
    http_client: Arc<dyn HttpClient>,
    config: EpicAuthConfig,
    authorize_url: String,
    token_url: String,
}

impl EpicTokenBroker {
    pub fn new(http_client: Arc<dyn HttpClient>, config: EpicAuthConfig) -> Self {
        Self {
            http_client,
            config,
            authorize_url: AUTHORIZE_URL.to_string(),
            token_url: TOKEN_URL.to_string(),
        }
    }

    /// Point the broker at different endpoints (tests, proxies).
    pub fn with_endpoints(
        mut self,
        authorize_url: impl Into<String>,
        token_url: impl Into<String>,
    ) -> Self {
        self.authorize_url = authorize_url.into();
        self.token_url = token_url.into();
        self
    }

    fn basic_auth(&self) -> String {
        let raw = format!("{}:{}", self.config.client_id, self.config.client_secret);
        format!("Basic {}", STANDARD.encode(raw))
    }

    /// Post a grant to the token endpoint and parse the credential.
    async fn token_request(&self, fields: &[(&str, &str)]) -> Result<Credential> {
        let request = HttpRequest::new(HttpMethod::Post, self.token_url.clone())
            .header("Authorization", self.basic_auth())
            .header("Accept", "application/json")
            .form(fields)
            .map_err(|e| AuthError::AuthenticationFailed {
                provider: ProviderKind::Epic.as_str().to_string(),
                reason: e.to_string(),
            })?;

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|e| AuthError::AuthenticationFailed {
                provider: ProviderKind::Epic.as_str().to_string(),
                reason: e.to_string(),
            })?;

        if !response.is_success() {
            let reason = response
                .json::<TokenErrorResponse>()
                .map(|e| format!("{} ({})", e.error_message, e.error_code))
                .unwrap_or_else(|_| format!("status {}", response.status));
            return Err(AuthError::AuthenticationFailed {
                provider: ProviderKind::Epic.as_str().to_string(),
                reason,
            });
        }

        let token: TokenResponse = response
            .json()
            .map_err(|e| AuthError::Serialization(e.to_string()))?;
        debug!(account_id = %token.account_id, "Token grant succeeded");

        Ok(Credential::new(
            ProviderKind::Epic,
            token.access_token,
            token.refresh_token,
            token.account_id,
            token.token_type,
            token.expires_in,
        ))
    }
}

#[async_trait]
impl TokenBroker for EpicTokenBroker {
    fn authorize_url(&self, challenge: &LoginChallenge) -> Result<AuthorizeUrl> {
        let mut params = vec![
            ("client_id", self.config.client_id.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("response_type", "code"),
            ("scope", "basic_profile"),
            ("state", challenge.state.as_str()),
        ];
        if let Some(pkce) = &challenge.pkce {
            params.push(("code_challenge", pkce.challenge.as_str()));
            params.push(("code_challenge_method", "S256"));
        }
        let url = build_authorize_url(&self.authorize_url, &params)?;
        Ok(AuthorizeUrl {
            url,
            state: challenge.state.clone(),
        })
    }

    #[instrument(skip_all)]
    async fn exchange_code(&self, code: &str, challenge: &LoginChallenge) -> Result<Credential> {
        let mut fields = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];
        if let Some(pkce) = &challenge.pkce {
            fields.push(("code_verifier", pkce.verifier.as_str()));
        }
        self.token_request(&fields).await
    }

    #[instrument(skip_all)]
    async fn refresh(&self, refresh_token: &str) -> Result<Credential> {
        self.token_request(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .await
    }
}
