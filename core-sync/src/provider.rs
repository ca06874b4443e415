//! Provider plugin traits.
//!
//! A storefront integration supplies three capabilities: a local
//! inventory scanner, a remote catalog client, and an optional metadata
//! source. The orchestrator only sees these traits; `provider-epic` is
//! the reference implementation.

use crate::error::ProviderError;
use async_trait::async_trait;
use core_library::models::{CatalogEntry, GameMetadata, InstalledEntry};

/// Reads the provider's on-disk install state.
///
/// A scan is a full snapshot: implementations must not carry state
/// between calls. A missing install root is an empty library, not an
/// error; only genuinely unexpected I/O failures should surface as
/// `Err`, and the orchestrator downgrades even those to an empty list.
#[async_trait]
pub trait InventoryScanner: Send + Sync {
    async fn scan(&self) -> Result<Vec<InstalledEntry>, ProviderError>;
}

/// Fetches the account's owned titles from the provider backend.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// List every owned title, draining pagination fully.
    ///
    /// Must return [`ProviderError::Unauthorized`] when the provider
    /// rejects `access_token`, so the caller can refresh and retry.
    async fn fetch_owned(&self, access_token: &str) -> Result<Vec<CatalogEntry>, ProviderError>;
}

/// Fetches display metadata for owned titles.
///
/// Enrichment is best-effort: failures never affect a sync result.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Fetch metadata for up to a batch of catalog item ids. Keys with
    /// no metadata are simply absent from the result.
    async fn fetch_metadata(
        &self,
        access_token: &str,
        catalog_ids: &[String],
    ) -> Result<Vec<(String, GameMetadata)>, ProviderError>;
}
