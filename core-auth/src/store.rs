//! Durable Credential Storage
//!
//! Provider-scoped persistence for [`Credential`] values on top of the
//! host's `SecureStore`. A missing credential is `Ok(None)` — "requires
//! login" — never an error. A corrupt stored payload is deleted and
//! reported as missing rather than wedging the session.
//!
//! Token values are serialized into the secure store and never logged;
//! audit lines carry only the provider and expiry metadata.

use crate::error::{AuthError, Result};
use crate::types::{Credential, ProviderKind};
use bridge_traits::storage::SecureStore;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Durable, provider-scoped credential storage.
#[derive(Clone)]
pub struct CredentialStore {
    secure_store: Arc<dyn SecureStore>,
}

impl CredentialStore {
    pub fn new(secure_store: Arc<dyn SecureStore>) -> Self {
        debug!("Initializing CredentialStore");
        Self { secure_store }
    }

    fn storage_key(provider: ProviderKind) -> String {
        format!("credential/{}", provider.as_str())
    }

    /// Load the stored credential for a provider.
    ///
    /// Returns `Ok(None)` when no credential exists or the stored payload
    /// cannot be decoded (the bad payload is removed).
    pub async fn load(&self, provider: ProviderKind) -> Result<Option<Credential>> {
        let key = Self::storage_key(provider);

        let bytes = self
            .secure_store
            .get_secret(&key)
            .await
            .map_err(|e| AuthError::Storage(e.to_string()))?;

        let Some(bytes) = bytes else {
            debug!(provider = provider.as_str(), "No stored credential");
            return Ok(None);
        };

        match serde_json::from_slice::<Credential>(&bytes) {
            Ok(credential) => {
                debug!(
                    provider = provider.as_str(),
                    expires_at = %credential.expires_at,
                    "Loaded stored credential"
                );
                Ok(Some(credential))
            }
            Err(e) => {
                warn!(
                    provider = provider.as_str(),
                    error = %e,
                    "Stored credential is corrupt; deleting"
                );
                // Self-heal: a payload we cannot read is useless.
                let _ = self.secure_store.delete_secret(&key).await;
                Ok(None)
            }
        }
    }

    /// Persist a credential, overwriting any previous one for the provider.
    pub async fn save(&self, credential: &Credential) -> Result<()> {
        let key = Self::storage_key(credential.provider);

        let json = serde_json::to_vec(credential)
            .map_err(|e| AuthError::Serialization(e.to_string()))?;

        self.secure_store
            .set_secret(&key, &json)
            .await
            .map_err(|e| {
                warn!(
                    provider = credential.provider.as_str(),
                    error = %e,
                    "Failed to persist credential"
                );
                AuthError::Storage(e.to_string())
            })?;

        info!(
            provider = credential.provider.as_str(),
            expires_at = %credential.expires_at,
            "Credential stored securely"
        );
        Ok(())
    }

    /// Remove the stored credential for a provider.
    pub async fn clear(&self, provider: ProviderKind) -> Result<()> {
        let key = Self::storage_key(provider);
        self.secure_store
            .delete_secret(&key)
            .await
            .map_err(|e| AuthError::Storage(e.to_string()))?;
        info!(provider = provider.as_str(), "Credential cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::Result as BridgeResult;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

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

    fn sample_credential() -> Credential {
        Credential::new(
            ProviderKind::Epic,
            "access".into(),
            "refresh".into(),
            "acct-1".into(),
            "bearer".into(),
            3600,
        )
    }

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let store = CredentialStore::new(MemorySecureStore::new());
        store.save(&sample_credential()).await.unwrap();

        let loaded = store.load(ProviderKind::Epic).await.unwrap().unwrap();
        assert_eq!(loaded.access_token, "access");
        assert_eq!(loaded.account_id, "acct-1");
    }

    #[tokio::test]
    async fn test_missing_credential_is_none_not_error() {
        let store = CredentialStore::new(MemorySecureStore::new());
        assert!(store.load(ProviderKind::Steam).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_providers_are_scoped() {
        let store = CredentialStore::new(MemorySecureStore::new());
        store.save(&sample_credential()).await.unwrap();

        assert!(store.load(ProviderKind::Epic).await.unwrap().is_some());
        assert!(store.load(ProviderKind::Gog).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear_removes_credential() {
        let store = CredentialStore::new(MemorySecureStore::new());
        store.save(&sample_credential()).await.unwrap();
        store.clear(ProviderKind::Epic).await.unwrap();
        assert!(store.load(ProviderKind::Epic).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_payload_self_heals() {
        let secure = MemorySecureStore::new();
        secure
            .set_secret("credential/epic", b"not json at all")
            .await
            .unwrap();

        let store = CredentialStore::new(secure.clone());
        assert!(store.load(ProviderKind::Epic).await.unwrap().is_none());
        // The bad payload was removed.
        assert!(secure.get_secret("credential/epic").await.unwrap().is_none());
    }
}
