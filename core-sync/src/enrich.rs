//! # Metadata Enricher
//!
//! Backfills descriptive fields for newly added records.
//!
//! Runs after a sync cycle commits, detached from the job: an enrichment
//! failure is logged and dropped, never reflected in the sync result.
//! Application goes through the store's set-if-non-empty-and-differs
//! rule, so a sparse provider response cannot blank existing fields.

use crate::provider::MetadataSource;
use core_auth::ProviderKind;
use core_library::models::GameKey;
use core_library::store::GameRecordStore;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Default number of catalog ids per metadata request
pub const DEFAULT_ENRICH_BATCH_SIZE: usize = 25;

pub struct MetadataEnricher {
    source: Arc<dyn MetadataSource>,
    store: Arc<GameRecordStore>,
    batch_size: usize,
}

impl MetadataEnricher {
    pub fn new(source: Arc<dyn MetadataSource>, store: Arc<GameRecordStore>) -> Self {
        Self {
            source,
            store,
            batch_size: DEFAULT_ENRICH_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Fetch and apply metadata for the given keys, in batches.
    ///
    /// Best-effort: a failed batch is logged and skipped, and the
    /// remaining batches still run.
    #[instrument(skip(self, access_token, keys), fields(provider = provider.as_str(), keys = keys.len()))]
    pub async fn enrich(&self, provider: ProviderKind, access_token: &str, keys: &[GameKey]) {
        if keys.is_empty() {
            return;
        }
        debug!("Starting enrichment");

        for batch in keys.chunks(self.batch_size) {
            let ids: Vec<String> = batch.iter().map(|k| k.as_str().to_string()).collect();
            let fetched = match self.source.fetch_metadata(access_token, &ids).await {
                Ok(fetched) => fetched,
                Err(e) => {
                    warn!(error = %e, batch = batch.len(), "Metadata batch failed; skipping");
                    continue;
                }
            };

            for (id, metadata) in fetched {
                let key = GameKey::new(id);
                if let Err(e) = self.store.apply_metadata(provider, &key, metadata).await {
                    warn!(key = %key, error = %e, "Could not apply metadata");
                }
            }
        }
        debug!("Enrichment finished");
    }
}
