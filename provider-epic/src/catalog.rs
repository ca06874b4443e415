//! Library service client
//!
//! Fetches the account's owned titles from the Epic library service,
//! draining cursor pagination, and fetches catalog metadata for
//! enrichment.

use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
use core_library::models::{CatalogEntry, GameMetadata};
use core_sync::error::ProviderError;
use core_sync::provider::{CatalogClient, MetadataSource};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::types::{CatalogItem, LibraryItemsResponse, LibraryRecord};

/// Default library service base URL
pub const LIBRARY_API_BASE: &str = "https://library-service.live.use1a.on.epicgames.com";

/// Default catalog service base URL
pub const CATALOG_API_BASE: &str = "https://catalog-public-service-prod06.ol.epicgames.com";

/// Epic library service client.
///
/// One instance per configured account; the access token is passed per
/// call so the orchestrator's refresh-and-retry works without rebuilding
/// the client.
pub struct EpicCatalogClient {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
}

impl EpicCatalogClient {
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            base_url: LIBRARY_API_BASE.to_string(),
        }
    }

    /// Point the client at a different service root (tests, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn items_url(&self, cursor: Option<&str>) -> String {
        match cursor {
            Some(cursor) => format!(
                "{}/library/api/public/items?includeMetadata=true&cursor={}",
                self.base_url,
                urlencoding::encode(cursor)
            ),
            None => format!(
                "{}/library/api/public/items?includeMetadata=true",
                self.base_url
            ),
        }
    }

    fn entry_from_record(record: LibraryRecord) -> CatalogEntry {
        let display_name = if record.sandbox_name.is_empty() {
            record.app_name.clone()
        } else {
            record.sandbox_name.clone()
        };
        let store_uri = format!(
            "com.epicgames.launcher://apps/{}%3A{}%3A{}?action=launch",
            record.namespace, record.catalog_item_id, record.app_name
        );
        CatalogEntry {
            key: record.catalog_item_id.as_str().into(),
            display_name,
            product_id: record.product_id,
            namespace_id: record.namespace,
            store_uri,
            ownership_methods: if record.acquisition_type.is_empty() {
                Vec::new()
            } else {
                vec![record.acquisition_type]
            },
        }
    }
}

#[async_trait]
impl CatalogClient for EpicCatalogClient {
    /// List every owned title, following `nextCursor` until the service
    /// stops returning one. Any page failing fails the whole fetch; a
    /// partial catalog must never look like a shrunken library.
    #[instrument(skip(self, access_token))]
    async fn fetch_owned(&self, access_token: &str) -> Result<Vec<CatalogEntry>, ProviderError> {
        let mut entries = Vec::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0u32;

        loop {
            let request = HttpRequest::new(HttpMethod::Get, self.items_url(cursor.as_deref()))
                .bearer_token(access_token)
                .header("Accept", "application/json");
            let response = self.http_client.execute(request).await?;

            if response.is_unauthorized() {
                return Err(ProviderError::Unauthorized);
            }
            if !response.is_success() {
                return Err(ProviderError::MalformedResponse(format!(
                    "library service returned status {}",
                    response.status
                )));
            }

            let page: LibraryItemsResponse = response
                .json()
                .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;
            pages += 1;
            entries.extend(page.records.into_iter().map(Self::entry_from_record));

            match page.response_metadata.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }

        debug!(owned = entries.len(), pages, "Catalog fetch complete");
        Ok(entries)
    }
}

/// Catalog metadata client for enrichment.
pub struct EpicMetadataClient {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
    namespace: String,
}

impl EpicMetadataClient {
    pub fn new(http_client: Arc<dyn HttpClient>, namespace: impl Into<String>) -> Self {
        Self {
            http_client,
            base_url: CATALOG_API_BASE.to_string(),
            namespace: namespace.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn metadata_from_item(item: CatalogItem) -> GameMetadata {
        let mut cover_url = String::new();
        let mut background_url = String::new();
        for image in item.key_images {
            match image.image_type.as_str() {
                "DieselGameBoxTall" => cover_url = image.url,
                "DieselGameBox" => background_url = image.url,
                _ => {}
            }
        }
        GameMetadata {
            description: item.description,
            developer: item.developer,
            publisher: item.publisher,
            release_date: item.release_date,
            cover_url,
            background_url,
        }
    }
}

#[async_trait]
impl MetadataSource for EpicMetadataClient {
    /// Bulk-fetch catalog items. The service returns a map keyed by item
    /// id; ids it does not know are simply absent.
    #[instrument(skip(self, access_token, catalog_ids), fields(batch = catalog_ids.len()))]
    async fn fetch_metadata(
        &self,
        access_token: &str,
        catalog_ids: &[String],
    ) -> Result<Vec<(String, GameMetadata)>, ProviderError> {
        if catalog_ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids = catalog_ids
            .iter()
            .map(|id| urlencoding::encode(id))
            .collect::<Vec<_>>()
            .join("&id=");
        let url = format!(
            "{}/catalog/api/shared/namespace/{}/bulk/items?id={}&includeDLCDetails=false&country=US&locale=en-US",
            self.base_url, self.namespace, ids
        );
        let request = HttpRequest::new(HttpMethod::Get, url)
            .bearer_token(access_token)
            .header("Accept", "application/json");
        let response = self.http_client.execute(request).await?;

        if response.is_unauthorized() {
            return Err(ProviderError::Unauthorized);
        }
        if !response.is_success() {
            return Err(ProviderError::MalformedResponse(format!(
                "catalog service returned status {}",
                response.status
            )));
        }

        let items: HashMap<String, CatalogItem> = response
            .json()
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;
        if items.len() < catalog_ids.len() {
            warn!(
                requested = catalog_ids.len(),
                returned = items.len(),
                "Catalog metadata incomplete for batch"
            );
        }

        Ok(items
            .into_iter()
            .map(|(id, item)| (id, Self::metadata_from_item(item)))
            .collect())
    }
}
