//! Domain models for the game library
//!
//! Scanner and catalog outputs are ephemeral snapshots; only
//! [`GameRecord`] is canonical and survives across sync cycles.

use chrono::{DateTime, Utc};
use core_auth::ProviderKind;
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Key Type
// =============================================================================

/// Stable per-provider identity of a game.
///
/// For Epic this is the catalog item id; other storefronts map their own
/// app/product id onto it. Keys are only comparable within one provider's
/// namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameKey(pub String);

impl GameKey {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GameKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for GameKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// =============================================================================
// Snapshot Models
// =============================================================================

/// One locally installed game, as reported by a scanner pass.
///
/// Rebuilt from scratch on every scan; never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstalledEntry {
    pub key: GameKey,
    pub display_name: String,
    /// Root directory of the installation
    pub install_path: String,
    /// Path to the launchable binary, relative to `install_path`
    pub executable_path: String,
    /// Extra arguments the manifest asks the launcher to pass
    pub launch_args: Vec<String>,
}

impl InstalledEntry {
    /// The command line the host should run to launch this install.
    pub fn launch_command(&self) -> String {
        let exe = format!("{}/{}", self.install_path, self.executable_path);
        if self.launch_args.is_empty() {
            exe
        } else {
            format!("{} {}", exe, self.launch_args.join(" "))
        }
    }
}

/// One owned game from the provider's remote catalog.
///
/// Rebuilt from scratch on every fetch; never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub key: GameKey,
    pub display_name: String,
    pub product_id: String,
    pub namespace_id: String,
    /// Storefront URI that installs or launches the title
    pub store_uri: String,
    /// How the account owns this title (purchase, subscription, ...)
    pub ownership_methods: Vec<String>,
}

// =============================================================================
// Canonical Record
// =============================================================================

/// Enrichment fields fetched from provider metadata endpoints.
///
/// Empty strings mean "not yet enriched"; enrichment only overwrites a
/// field with a non-empty value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameMetadata {
    pub description: String,
    pub developer: String,
    pub publisher: String,
    pub release_date: String,
    pub cover_url: String,
    pub background_url: String,
}

impl GameMetadata {
    pub fn is_empty(&self) -> bool {
        self.description.is_empty()
            && self.developer.is_empty()
            && self.publisher.is_empty()
            && self.release_date.is_empty()
            && self.cover_url.is_empty()
            && self.background_url.is_empty()
    }
}

/// User-owned state. Reconciliation copies these forward verbatim; only
/// the explicit mutators on the store change them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserFields {
    pub favorite: bool,
    pub hidden: bool,
    pub play_count: u32,
    pub last_played: Option<DateTime<Utc>>,
}

/// Canonical library entry, the unit the UI lists and the sync cycle
/// reconciles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub key: GameKey,
    pub provider: ProviderKind,
    pub display_name: String,
    /// Present on disk per the latest scan
    pub installed: bool,
    /// Owned remotely with no local install this cycle
    pub is_virtual: bool,
    /// Local launch path while installed, storefront URI otherwise
    pub launch_command: Option<String>,
    pub product_id: String,
    pub namespace_id: String,
    pub metadata: GameMetadata,
    pub user: UserFields,
}

impl GameRecord {
    /// Build a record from a local install (and the matching catalog
    /// entry, when the remote side also knows the title).
    pub fn from_installed(
        provider: ProviderKind,
        local: &InstalledEntry,
        remote: Option<&CatalogEntry>,
    ) -> Self {
        Self {
            key: local.key.clone(),
            provider,
            display_name: local.display_name.clone(),
            installed: true,
            is_virtual: false,
            launch_command: Some(local.launch_command()),
            product_id: remote.map(|r| r.product_id.clone()).unwrap_or_default(),
            namespace_id: remote.map(|r| r.namespace_id.clone()).unwrap_or_default(),
            metadata: GameMetadata::default(),
            user: UserFields::default(),
        }
    }

    /// Build a virtual record from a catalog entry with no local install.
    pub fn from_catalog(provider: ProviderKind, remote: &CatalogEntry) -> Self {
        Self {
            key: remote.key.clone(),
            provider,
            display_name: remote.display_name.clone(),
            installed: false,
            is_virtual: true,
            launch_command: (!remote.store_uri.is_empty()).then(|| remote.store_uri.clone()),
            product_id: remote.product_id.clone(),
            namespace_id: remote.namespace_id.clone(),
            metadata: GameMetadata::default(),
            user: UserFields::default(),
        }
    }
}
