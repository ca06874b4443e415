//! # Authentication Module
//!
//! Per-provider credential lifecycle for the game library core.
//!
//! ## Overview
//!
//! Each storefront gets one [`AuthSession`]: a login/refresh state machine
//! built on a [`CredentialStore`] (durable, provider-scoped persistence
//! via the host's `SecureStore`) and a provider-supplied [`TokenBroker`]
//! (authorize-URL construction, code exchange, token refresh).
//!
//! ## Features
//!
//! - Authorization-code flows with state/PKCE helpers
//! - Automatic token refresh before expiration
//! - Single-flight refresh: concurrent callers share one in-flight call
//! - Auth state event emission
//! - Secure token storage; token values never reach logs

pub mod broker;
pub mod error;
pub mod session;
pub mod store;
pub mod types;

pub use broker::{build_authorize_url, AuthorizeUrl, LoginChallenge, PkcePair, TokenBroker};
pub use error::{AuthError, Result};
pub use session::AuthSession;
pub use store::CredentialStore;
pub use types::{AuthState, Credential, ProviderKind};
