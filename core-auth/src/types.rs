use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported distribution platforms.
///
/// Each provider supplies its own token broker, inventory scanner, and
/// catalog client; everything else in the core is provider-generic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Epic Games Store
    Epic,
    /// Steam
    Steam,
    /// EA app
    Ea,
    /// Xbox / Microsoft Store
    Xbox,
    /// Amazon Games
    Amazon,
    /// GOG Galaxy
    Gog,
}

impl ProviderKind {
    /// All providers the core knows about, in display order.
    pub const ALL: [ProviderKind; 6] = [
        ProviderKind::Epic,
        ProviderKind::Steam,
        ProviderKind::Ea,
        ProviderKind::Xbox,
        ProviderKind::Amazon,
        ProviderKind::Gog,
    ];

    /// Human-readable display name for this provider.
    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::Epic => "Epic Games Store",
            ProviderKind::Steam => "Steam",
            ProviderKind::Ea => "EA app",
            ProviderKind::Xbox => "Xbox",
            ProviderKind::Amazon => "Amazon Games",
            ProviderKind::Gog => "GOG",
        }
    }

    /// Stable identifier used for logging, storage keys, and record keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Epic => "epic",
            ProviderKind::Steam => "steam",
            ProviderKind::Ea => "ea",
            ProviderKind::Xbox => "xbox",
            ProviderKind::Amazon => "amazon",
            ProviderKind::Gog => "gog",
        }
    }

    /// Parse a provider kind from its identifier string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "epic" => Some(ProviderKind::Epic),
            "steam" => Some(ProviderKind::Steam),
            "ea" => Some(ProviderKind::Ea),
            "xbox" => Some(ProviderKind::Xbox),
            "amazon" => Some(ProviderKind::Amazon),
            "gog" => Some(ProviderKind::Gog),
            _ => None,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// A provider credential.
///
/// Owned exclusively by the provider's `AuthSession`: persisted through
/// `CredentialStore`, mutated only by login and refresh, destroyed on
/// logout.
///
/// # Security
///
/// The `Debug` implementation redacts token values so credentials can
/// appear in trace output without leaking secrets.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credential {
    /// Which provider issued this credential
    pub provider: ProviderKind,
    /// The access token used for API requests
    pub access_token: String,
    /// The refresh token used to obtain new access tokens
    pub refresh_token: String,
    /// Provider account identifier
    pub account_id: String,
    /// Token type, normally "bearer"
    pub token_type: String,
    /// When the access token expires (UTC)
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    /// Create a credential expiring `expires_in` seconds from now.
    pub fn new(
        provider: ProviderKind,
        access_token: String,
        refresh_token: String,
        account_id: String,
        token_type: String,
        expires_in: i64,
    ) -> Self {
        Self {
            provider,
            access_token,
            refresh_token,
            account_id,
            token_type,
            expires_at: Utc::now() + Duration::seconds(expires_in),
        }
    }

    /// Check expiry with the default 5-minute buffer.
    ///
    /// The buffer refreshes tokens shortly before the server would start
    /// rejecting them, which avoids a guaranteed 401 round trip.
    pub fn is_expired(&self) -> bool {
        self.is_expired_with_buffer(300)
    }

    /// Check expiry with a custom buffer in seconds.
    pub fn is_expired_with_buffer(&self, buffer_seconds: i64) -> bool {
        Utc::now() >= self.expires_at - Duration::seconds(buffer_seconds)
    }
}

// Custom Debug implementation to avoid logging tokens
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("provider", &self.provider)
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("account_id", &self.account_id)
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Authentication state for one provider session.
///
/// # State Transitions
///
/// ```text
/// Unauthenticated -> AwaitingUserCode -> ExchangingCode -> Authenticated
///                                                           ^        |
///                                                           |        v
///                                                           +-- Refreshing
/// Refreshing (failure) -> Expired -> Unauthenticated (via start_login)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    /// No credential; login required
    #[default]
    Unauthenticated,
    /// Authorize URL issued; waiting for the user's code
    AwaitingUserCode,
    /// Code exchange in flight
    ExchangingCode,
    /// Valid credential held
    Authenticated,
    /// Token refresh in flight
    Refreshing,
    /// Refresh failed terminally; a fresh login is required
    Expired,
}

impl AuthState {
    /// Whether a usable credential is held (possibly mid-refresh).
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated | AuthState::Refreshing)
    }

    /// Whether a login or refresh operation is in progress.
    pub fn is_in_progress(&self) -> bool {
        matches!(
            self,
            AuthState::AwaitingUserCode | AuthState::ExchangingCode | AuthState::Refreshing
        )
    }

    /// Stable identifier for events and storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthState::Unauthenticated => "unauthenticated",
            AuthState::AwaitingUserCode => "awaiting_user_code",
            AuthState::ExchangingCode => "exchanging_code",
            AuthState::Authenticated => "authenticated",
            AuthState::Refreshing => "refreshing",
            AuthState::Expired => "expired",
        }
    }
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_round_trip() {
        for kind in ProviderKind::ALL {
            assert_eq!(ProviderKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ProviderKind::parse("origin"), None);
    }

    #[test]
    fn test_provider_kind_serialization() {
        let json = serde_json::to_string(&ProviderKind::Epic).unwrap();
        assert_eq!(json, "\"epic\"");
        let back: ProviderKind = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ProviderKind::Epic);
    }

    #[test]
    fn test_credential_fresh_not_expired() {
        let cred = Credential::new(
            ProviderKind::Epic,
            "access".into(),
            "refresh".into(),
            "acct".into(),
            "bearer".into(),
            3600,
        );
        assert!(!cred.is_expired());
    }

    #[test]
    fn test_credential_expired_within_buffer() {
        let cred = Credential::new(
            ProviderKind::Epic,
            "access".into(),
            "refresh".into(),
            "acct".into(),
            "bearer".into(),
            200, // under the default 300s buffer
        );
        assert!(cred.is_expired());
        assert!(!cred.is_expired_with_buffer(0));
    }

    #[test]
    fn test_credential_debug_redacts() {
        let cred = Credential::new(
            ProviderKind::Gog,
            "secret_access".into(),
            "secret_refresh".into(),
            "acct".into(),
            "bearer".into(),
            3600,
        );
        let debug = format!("{:?}", cred);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("secret_access"));
        assert!(!debug.contains("secret_refresh"));
    }

    #[test]
    fn test_auth_state_predicates() {
        assert!(AuthState::Authenticated.is_authenticated());
        assert!(AuthState::Refreshing.is_authenticated());
        assert!(!AuthState::Expired.is_authenticated());
        assert!(AuthState::ExchangingCode.is_in_progress());
        assert!(!AuthState::Unauthenticated.is_in_progress());
    }

    #[test]
    fn test_auth_state_default() {
        assert_eq!(AuthState::default(), AuthState::Unauthenticated);
    }
}
