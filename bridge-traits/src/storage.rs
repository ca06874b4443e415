//! Secure Credential Persistence
//!
//! Durable storage for provider credentials. Backed by the OS vault on
//! desktop (Keychain, Credential Manager, Secret Service).

use async_trait::async_trait;

use crate::error::Result;

/// Secure key/value storage for secrets.
///
/// Values are opaque bytes; callers handle serialization. A missing key is
/// `Ok(None)`, never an error: the auth layer treats it as "requires
/// login".
#[async_trait]
pub trait SecureStore: Send + Sync {
    /// Store a secret, overwriting any previous value for the key.
    async fn set_secret(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Retrieve a secret, or `None` if the key does not exist.
    async fn get_secret(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Delete a secret. Deleting a missing key is not an error.
    async fn delete_secret(&self, key: &str) -> Result<()>;

    /// List all keys currently held by this store.
    async fn list_keys(&self) -> Result<Vec<String>>;
}
