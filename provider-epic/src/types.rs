//! Epic API wire types
//!
//! Data structures for install manifests and launcher service responses.

use serde::{Deserialize, Serialize};

/// One `.item` install manifest from the launcher's manifest directory.
///
/// The launcher writes one of these per installed title. Only the fields
/// the scanner consumes are modeled; unknown fields are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InstallManifest {
    /// Stable catalog identity of the title
    pub catalog_item_id: String,

    /// Catalog namespace (sandbox) the item lives in
    #[serde(default)]
    pub catalog_namespace: String,

    /// Launcher-internal app name
    #[serde(default)]
    pub app_name: String,

    /// Human-readable title
    #[serde(default)]
    pub display_name: String,

    /// Root directory of the installation
    pub install_location: String,

    /// Executable path relative to `install_location`
    pub launch_executable: String,

    /// Extra launch arguments, space separated
    #[serde(default)]
    pub launch_command: String,

    /// Set while the launcher is still downloading the title
    #[serde(default, rename = "bIsIncompleteInstall")]
    pub is_incomplete_install: bool,
}

/// Library service `items` page.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryItemsResponse {
    #[serde(default)]
    pub records: Vec<LibraryRecord>,

    #[serde(default)]
    pub response_metadata: ResponseMetadata,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    /// Opaque cursor for the next page; absent on the last page
    pub next_cursor: Option<String>,
}

/// One owned title in the account's library.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryRecord {
    pub catalog_item_id: String,

    #[serde(default)]
    pub namespace: String,

    #[serde(default)]
    pub app_name: String,

    #[serde(default)]
    pub product_id: String,

    #[serde(default)]
    pub sandbox_name: String,

    #[serde(default)]
    pub acquisition_type: String,
}

/// Token endpoint success response.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub account_id: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Token endpoint error body.
#[derive(Debug, Deserialize)]
pub struct TokenErrorResponse {
    #[serde(rename = "errorCode", default)]
    pub error_code: String,
    #[serde(rename = "errorMessage", default)]
    pub error_message: String,
}

/// Catalog bulk item, the enrichment payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub developer: String,

    #[serde(default)]
    pub publisher: String,

    #[serde(default)]
    pub release_date: String,

    #[serde(default)]
    pub key_images: Vec<KeyImage>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyImage {
    #[serde(rename = "type")]
    pub image_type: String,
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_parses_launcher_json() {
        let json = r#"{
            "CatalogItemId": "abc123",
            "CatalogNamespace": "fn",
            "AppName": "Sugar",
            "DisplayName": "Rocket Racer",
            "InstallLocation": "/games/rocket",
            "LaunchExecutable": "bin/racer.exe",
            "LaunchCommand": "-fullscreen",
            "bIsIncompleteInstall": false,
            "FormatVersion": 0
        }"#;
        let manifest: InstallManifest = serde_json::from_str(json).unwrap();
        assert_eq!(manifest.catalog_item_id, "abc123");
        assert_eq!(manifest.display_name, "Rocket Racer");
        assert!(!manifest.is_incomplete_install);
    }

    #[test]
    fn test_items_page_without_cursor_is_last() {
        let json = r#"{"records":[{"catalogItemId":"abc","namespace":"fn"}],"responseMetadata":{}}"#;
        let page: LibraryItemsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(page.records.len(), 1);
        assert!(page.response_metadata.next_cursor.is_none());
    }
}
