//! Local Inventory Probes
//!
//! Raw access to the OS state that inventory scanners read: manifest files
//! under a storefront's install root, and platform key/value stores
//! (Windows registry and equivalents). Scanners parse what these probes
//! return; the probes themselves know nothing about any storefront's
//! manifest layout.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Read-only filesystem access for inventory discovery.
///
/// A probe never mutates the filesystem. A missing directory is reported
/// through `dir_exists`, not as a read error, so scanners can treat an
/// absent install root as "nothing installed".
#[async_trait]
pub trait FilesystemProbe: Send + Sync {
    /// Check whether a directory exists.
    async fn dir_exists(&self, path: &Path) -> bool;

    /// List the files directly inside a directory, optionally filtered by
    /// extension (without the leading dot).
    async fn list_files(&self, path: &Path, extension: Option<&str>) -> Result<Vec<PathBuf>>;

    /// Read a file's full contents.
    async fn read_file(&self, path: &Path) -> Result<Vec<u8>>;
}

/// Read-only access to a platform key/value store (e.g. the Windows
/// registry). Storefronts that record installs there get scanned through
/// this trait; hosts without such a store return `NotAvailable`.
#[async_trait]
pub trait RegistryProbe: Send + Sync {
    /// List the subkeys under a key path.
    async fn list_subkeys(&self, key_path: &str) -> Result<Vec<String>>;

    /// Read a string value, or `None` if the value does not exist.
    async fn read_string(&self, key_path: &str, value_name: &str) -> Result<Option<String>>;
}
