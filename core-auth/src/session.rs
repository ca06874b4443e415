//! # Auth Session
//!
//! Per-provider login/refresh state machine.
//!
//! ## Overview
//!
//! One `AuthSession` exists per configured provider. It owns the
//! provider's [`Credential`] exclusively: persistence goes through
//! [`CredentialStore`], network calls go through the provider's
//! [`TokenBroker`] wrapped in the bounded [`RequestExecutor`], and every
//! state change is announced on the event bus.
//!
//! ## Single-flight refresh
//!
//! When N concurrent callers observe an expired token (or N requests see
//! a 401 simultaneously), exactly one broker refresh call is issued. The
//! refresh gate is an async mutex; whoever wins performs the refresh, and
//! the others re-check the stored credential under the gate and find it
//! already renewed. This prevents refresh-token invalidation races on
//! providers that rotate the refresh token on every use.
//!
//! ## Failure behavior
//!
//! - Exchange failure leaves the session `Unauthenticated`.
//! - Refresh failure transitions to `Expired`, clears the in-memory
//!   credential, and requires a fresh `start_login`.
//! - A failed persistence write is surfaced in logs but does not
//!   invalidate the in-memory credential for the current process.

use crate::broker::{AuthorizeUrl, LoginChallenge, PkcePair, TokenBroker};
use crate::error::{AuthError, Result};
use crate::store::CredentialStore;
use crate::types::{AuthState, Credential, ProviderKind};
use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
use core_runtime::executor::RequestExecutor;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, instrument, warn};

/// Default timeout for token exchange and refresh calls (2 minutes)
const DEFAULT_AUTH_TIMEOUT: Duration = Duration::from_secs(120);

/// Per-provider login/refresh state machine.
pub struct AuthSession {
    provider: ProviderKind,
    broker: Arc<dyn TokenBroker>,
    store: CredentialStore,
    executor: RequestExecutor,
    event_bus: EventBus,
    state: RwLock<AuthState>,
    credential: RwLock<Option<Credential>>,
    pending_login: Mutex<Option<LoginChallenge>>,
    /// Serializes refreshes; see module docs.
    refresh_gate: Mutex<()>,
    auth_timeout: Duration,
    use_pkce: bool,
}

impl AuthSession {
    pub fn new(
        provider: ProviderKind,
        broker: Arc<dyn TokenBroker>,
        store: CredentialStore,
        executor: RequestExecutor,
        event_bus: EventBus,
    ) -> Self {
        Self {
            provider,
            broker,
            store,
            executor,
            event_bus,
            state: RwLock::new(AuthState::Unauthenticated),
            credential: RwLock::new(None),
            pending_login: Mutex::new(None),
            refresh_gate: Mutex::new(()),
            auth_timeout: DEFAULT_AUTH_TIMEOUT,
            use_pkce: true,
        }
    }

    /// Override the timeout applied to exchange/refresh calls.
    pub fn with_auth_timeout(mut self, timeout: Duration) -> Self {
        self.auth_timeout = timeout;
        self
    }

    /// Disable PKCE for providers whose token endpoint rejects it.
    pub fn without_pkce(mut self) -> Self {
        self.use_pkce = false;
        self
    }

    pub fn provider(&self) -> ProviderKind {
        self.provider
    }

    /// Current session state.
    pub async fn state(&self) -> AuthState {
        *self.state.read().await
    }

    /// Account id of the held credential, if authenticated.
    pub async fn account_id(&self) -> Option<String> {
        self.credential
            .read()
            .await
            .as_ref()
            .map(|c| c.account_id.clone())
    }

    /// Restore a persisted credential at startup.
    ///
    /// An expired-but-refreshable credential still counts as
    /// authenticated; the next `access_token` call renews it.
    #[instrument(skip(self), fields(provider = self.provider.as_str()))]
    pub async fn restore(&self) -> Result<bool> {
        match self.store.load(self.provider).await? {
            Some(credential) => {
                info!("Restored persisted credential");
                *self.credential.write().await = Some(credential);
                self.set_state(AuthState::Authenticated).await;
                Ok(true)
            }
            None => {
                debug!("No persisted credential to restore");
                Ok(false)
            }
        }
    }

    /// Begin the login flow. Pure URL construction; no network.
    ///
    /// Returns the authorization URL for the host to open. The session
    /// holds the state/PKCE challenge until `exchange_code` consumes it.
    #[instrument(skip(self), fields(provider = self.provider.as_str()))]
    pub async fn start_login(&self) -> Result<AuthorizeUrl> {
        let pkce = self.use_pkce.then(PkcePair::generate);
        let challenge = LoginChallenge::new(pkce);
        let authorize = self.broker.authorize_url(&challenge)?;

        *self.pending_login.lock().await = Some(challenge);
        self.set_state(AuthState::AwaitingUserCode).await;

        let _ = self.event_bus.emit(CoreEvent::Auth(AuthEvent::SigningIn {
            provider: self.provider.as_str().to_string(),
        }));

        info!("Login flow initiated");
        Ok(authorize)
    }

    /// Exchange the authorization code captured from the callback.
    #[instrument(skip(self, code), fields(provider = self.provider.as_str()))]
    pub async fn exchange_code(&self, code: String) -> Result<Credential> {
        let challenge = self
            .pending_login
            .lock()
            .await
            .take()
            .ok_or_else(|| AuthError::NoLoginInProgress(self.provider.as_str().to_string()))?;

        self.set_state(AuthState::ExchangingCode).await;
        info!("Exchanging authorization code for credential");

        let broker = Arc::clone(&self.broker);
        let exchange = self
            .executor
            .execute(self.auth_timeout, async move {
                broker.exchange_code(&code, &challenge).await
            })
            .await;

        let credential = match exchange {
            Ok(Ok(credential)) => credential,
            Ok(Err(e)) => {
                self.set_state(AuthState::Unauthenticated).await;
                self.emit_auth_error(format!("Code exchange failed: {}", e), true);
                return Err(e);
            }
            Err(exec_err) => {
                self.set_state(AuthState::Unauthenticated).await;
                self.emit_auth_error("Code exchange timed out".to_string(), true);
                error!(error = %exec_err, "Code exchange did not complete");
                return Err(AuthError::OperationTimeout {
                    operation: "code exchange".to_string(),
                });
            }
        };

        self.install_credential(credential.clone()).await;

        let _ = self.event_bus.emit(CoreEvent::Auth(AuthEvent::SignedIn {
            provider: self.provider.as_str().to_string(),
            account_id: credential.account_id.clone(),
        }));

        info!(account_id = %credential.account_id, "Sign-in completed");
        Ok(credential)
    }

    /// Get a valid access token, refreshing first if the held credential
    /// is expired.
    ///
    /// Blocks the calling background task during refresh; never the UI
    /// thread.
    pub async fn access_token(&self) -> Result<String> {
        let current = self.credential.read().await.clone();
        match current {
            Some(credential) if !credential.is_expired() => Ok(credential.access_token),
            Some(credential) => {
                debug!(
                    provider = self.provider.as_str(),
                    "Access token expired; refreshing"
                );
                let renewed = self.refresh_from(&credential.access_token).await?;
                Ok(renewed.access_token)
            }
            None => Err(AuthError::NotAuthenticated),
        }
    }

    /// Force a token refresh, e.g. after a request came back 401.
    ///
    /// Single-flight: concurrent callers share the winner's result via
    /// the stored credential.
    pub async fn refresh(&self) -> Result<Credential> {
        let stale = self
            .credential
            .read()
            .await
            .as_ref()
            .map(|c| c.access_token.clone())
            .ok_or(AuthError::NotAuthenticated)?;
        self.refresh_from(&stale).await
    }

    /// Refresh, unless another caller already replaced `stale_token`.
    #[instrument(skip(self, stale_token), fields(provider = self.provider.as_str()))]
    async fn refresh_from(&self, stale_token: &str) -> Result<Credential> {
        let _gate = self.refresh_gate.lock().await;

        // Re-check under the gate: a concurrent caller may have finished
        // the refresh while we waited.
        let current = self.credential.read().await.clone();
        let credential = match current {
            Some(c) if c.access_token != stale_token => {
                debug!("Credential already renewed by a concurrent refresh");
                return Ok(c);
            }
            Some(c) => c,
            None => return Err(AuthError::NotAuthenticated),
        };

        self.set_state(AuthState::Refreshing).await;
        let _ = self
            .event_bus
            .emit(CoreEvent::Auth(AuthEvent::TokenRefreshing {
                provider: self.provider.as_str().to_string(),
            }));
        info!("Refreshing access token");

        let broker = Arc::clone(&self.broker);
        let refresh_token = credential.refresh_token.clone();
        let outcome = self
            .executor
            .execute(self.auth_timeout, async move {
                broker.refresh(&refresh_token).await
            })
            .await;

        let renewed = match outcome {
            Ok(Ok(credential)) => credential,
            Ok(Err(e)) => {
                self.expire_after_failed_refresh(&e.to_string()).await;
                return Err(AuthError::TokenRefreshFailed(e.to_string()));
            }
            Err(exec_err) => {
                self.expire_after_failed_refresh(&exec_err.to_string()).await;
                return Err(AuthError::OperationTimeout {
                    operation: "token refresh".to_string(),
                });
            }
        };

        self.install_credential(renewed.clone()).await;

        let _ = self
            .event_bus
            .emit(CoreEvent::Auth(AuthEvent::TokenRefreshed {
                provider: self.provider.as_str().to_string(),
                expires_at: renewed.expires_at.timestamp(),
            }));

        info!("Token refreshed successfully");
        Ok(renewed)
    }

    /// Clear the credential and return to `Unauthenticated`.
    #[instrument(skip(self), fields(provider = self.provider.as_str()))]
    pub async fn logout(&self) -> Result<()> {
        info!("Signing out");
        self.store.clear(self.provider).await?;
        *self.credential.write().await = None;
        *self.pending_login.lock().await = None;
        self.set_state(AuthState::Unauthenticated).await;

        let _ = self.event_bus.emit(CoreEvent::Auth(AuthEvent::SignedOut {
            provider: self.provider.as_str().to_string(),
        }));
        Ok(())
    }

    /// Store the credential in memory and persist it. A persistence
    /// failure keeps the in-memory credential usable for this session.
    async fn install_credential(&self, credential: Credential) {
        if let Err(e) = self.store.save(&credential).await {
            warn!(
                provider = self.provider.as_str(),
                error = %e,
                "Credential persisted in memory only; storage write failed"
            );
        }
        *self.credential.write().await = Some(credential);
        self.set_state(AuthState::Authenticated).await;
    }

    async fn expire_after_failed_refresh(&self, reason: &str) {
        error!(
            provider = self.provider.as_str(),
            reason = reason,
            "Token refresh failed; session expired"
        );
        *self.credential.write().await = None;
        self.set_state(AuthState::Expired).await;
        self.emit_auth_error(format!("Token refresh failed: {}", reason), false);
    }

    fn emit_auth_error(&self, message: String, recoverable: bool) {
        let _ = self.event_bus.emit(CoreEvent::Auth(AuthEvent::AuthError {
            provider: Some(self.provider.as_str().to_string()),
            message,
            recoverable,
        }));
    }

    async fn set_state(&self, next: AuthState) {
        let mut state = self.state.write().await;
        if *state != next {
            debug!(
                provider = self.provider.as_str(),
                from = state.as_str(),
                to = next.as_str(),
                "Auth state transition"
            );
            *state = next;
            let _ = self
                .event_bus
                .emit(CoreEvent::Auth(AuthEvent::StateChanged {
                    provider: self.provider.as_str().to_string(),
                    state: next.as_str().to_string(),
                }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_desktop::ui::ui_channel;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::storage::SecureStore;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MemorySecureStore {
        storage: Mutex<HashMap<String, Vec<u8>>>,
    }

    impl MemorySecureStore {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                storage: Mutex::new(HashMap::new()),
            })
        }
    }

    #[async_trait::async_trait]
    impl SecureStore for MemorySecureStore {
        async fn set_secret(&self, key: &str, value: &[u8]) -> BridgeResult<()> {
            self.storage
                .lock()
                .await
                .insert(key.to_string(), value.to_vec());
            Ok(())
        }

        async fn get_secret(&self, key: &str) -> BridgeResult<Option<Vec<u8>>> {
            Ok(self.storage.lock().await.get(key).cloned())
        }

        async fn delete_secret(&self, key: &str) -> BridgeResult<()> {
            self.storage.lock().await.remove(key);
            Ok(())
        }

        async fn list_keys(&self) -> BridgeResult<Vec<String>> {
            Ok(self.storage.lock().await.keys().cloned().collect())
        }
    }

    /// Broker that counts refresh calls and simulates a slow endpoint.
    struct CountingBroker {
        refresh_calls: AtomicUsize,
        refresh_delay: Duration,
        fail_refresh: bool,
    }

    impl CountingBroker {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                refresh_calls: AtomicUsize::new(0),
                refresh_delay: Duration::from_millis(50),
                fail_refresh: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                refresh_calls: AtomicUsize::new(0),
                refresh_delay: Duration::from_millis(10),
                fail_refresh: true,
            })
        }
    }

    #[async_trait::async_trait]
    impl TokenBroker for CountingBroker {
        fn authorize_url(&self, challenge: &LoginChallenge) -> Result<AuthorizeUrl> {
            Ok(AuthorizeUrl {
                url: format!("https://auth.test/authorize?state={}", challenge.state),
                state: challenge.state.clone(),
            })
        }

        async fn exchange_code(
            &self,
            code: &str,
            _challenge: &LoginChallenge,
        ) -> Result<Credential> {
            if code == "bad" {
                return Err(AuthError::AuthenticationFailed {
                    provider: "epic".to_string(),
                    reason: "invalid code".to_string(),
                });
            }
            Ok(Credential::new(
                ProviderKind::Epic,
                "access-0".into(),
                "refresh-0".into(),
                "acct".into(),
                "bearer".into(),
                3600,
            ))
        }

        async fn refresh(&self, _refresh_token: &str) -> Result<Credential> {
            let n = self.refresh_calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.refresh_delay).await;
            if self.fail_refresh {
                return Err(AuthError::TokenRefreshFailed("revoked".to_string()));
            }
            Ok(Credential::new(
                ProviderKind::Epic,
                format!("access-{}", n + 1),
                format!("refresh-{}", n + 1),
                "acct".into(),
                "bearer".into(),
                3600,
            ))
        }
    }

    fn session_with(broker: Arc<CountingBroker>) -> Arc<AuthSession> {
        let (sink, _queue) = ui_channel();
        let executor = RequestExecutor::new(Arc::new(sink));
        let store = CredentialStore::new(MemorySecureStore::new());
        Arc::new(AuthSession::new(
            ProviderKind::Epic,
            broker,
            store,
            executor,
            EventBus::new(100),
        ))
    }

    fn expired_credential() -> Credential {
        let mut cred = Credential::new(
            ProviderKind::Epic,
            "stale".into(),
            "refresh-0".into(),
            "acct".into(),
            "bearer".into(),
            3600,
        );
        cred.expires_at = chrono::Utc::now() - chrono::Duration::hours(1);
        cred
    }

    #[tokio::test]
    async fn test_start_login_is_pure_and_sets_state() {
        let session = session_with(CountingBroker::new());
        let authorize = session.start_login().await.unwrap();
        assert!(authorize.url.contains(&authorize.state));
        assert_eq!(session.state().await, AuthState::AwaitingUserCode);
    }

    #[tokio::test]
    async fn test_exchange_code_success() {
        let session = session_with(CountingBroker::new());
        session.start_login().await.unwrap();

        let credential = session.exchange_code("good".to_string()).await.unwrap();
        assert_eq!(credential.access_token, "access-0");
        assert_eq!(session.state().await, AuthState::Authenticated);
        assert_eq!(session.access_token().await.unwrap(), "access-0");
    }

    #[tokio::test]
    async fn test_exchange_without_login_fails() {
        let session = session_with(CountingBroker::new());
        let result = session.exchange_code("good".to_string()).await;
        assert!(matches!(result, Err(AuthError::NoLoginInProgress(_))));
    }

    #[tokio::test]
    async fn test_exchange_failure_returns_to_unauthenticated() {
        let session = session_with(CountingBroker::new());
        session.start_login().await.unwrap();

        assert!(session.exchange_code("bad".to_string()).await.is_err());
        assert_eq!(session.state().await, AuthState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_access_token_refreshes_expired_credential() {
        let broker = CountingBroker::new();
        let session = session_with(Arc::clone(&broker));
        *session.credential.write().await = Some(expired_credential());
        *session.state.write().await = AuthState::Authenticated;

        let token = session.access_token().await.unwrap();
        assert_eq!(token, "access-1");
        assert_eq!(broker.refresh_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_refresh_is_single_flight() {
        let broker = CountingBroker::new();
        let session = session_with(Arc::clone(&broker));
        *session.credential.write().await = Some(expired_credential());
        *session.state.write().await = AuthState::Authenticated;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let session = Arc::clone(&session);
            handles.push(tokio::spawn(
                async move { session.access_token().await },
            ));
        }

        let mut tokens = Vec::new();
        for handle in handles {
            tokens.push(handle.await.unwrap().unwrap());
        }

        // All callers see the same renewed token; exactly one broker call.
        assert!(tokens.iter().all(|t| t == "access-1"));
        assert_eq!(broker.refresh_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_refresh_expires_session() {
        let broker = CountingBroker::failing();
        let session = session_with(broker);
        *session.credential.write().await = Some(expired_credential());
        *session.state.write().await = AuthState::Authenticated;

        assert!(session.access_token().await.is_err());
        assert_eq!(session.state().await, AuthState::Expired);
        // In-memory credential cleared; a fresh login is required.
        assert!(matches!(
            session.access_token().await,
            Err(AuthError::NotAuthenticated)
        ));
    }

    #[tokio::test]
    async fn test_logout_clears_everything() {
        let session = session_with(CountingBroker::new());
        session.start_login().await.unwrap();
        session.exchange_code("good".to_string()).await.unwrap();

        session.logout().await.unwrap();
        assert_eq!(session.state().await, AuthState::Unauthenticated);
        assert!(matches!(
            session.access_token().await,
            Err(AuthError::NotAuthenticated)
        ));
    }

    #[tokio::test]
    async fn test_restore_persisted_credential() {
        let secure = MemorySecureStore::new();
        let store = CredentialStore::new(secure.clone());
        store
            .save(&Credential::new(
                ProviderKind::Epic,
                "persisted".into(),
                "refresh".into(),
                "acct".into(),
                "bearer".into(),
                3600,
            ))
            .await
            .unwrap();

        let (sink, _queue) = ui_channel();
        let session = AuthSession::new(
            ProviderKind::Epic,
            CountingBroker::new(),
            store,
            RequestExecutor::new(Arc::new(sink)),
            EventBus::new(100),
        );

        assert!(session.restore().await.unwrap());
        assert_eq!(session.state().await, AuthState::Authenticated);
        assert_eq!(session.access_token().await.unwrap(), "persisted");
    }
}
