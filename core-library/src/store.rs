//! Canonical game record store.
//!
//! Holds the per-provider record maps behind one `RwLock`. Readers get
//! cloned snapshots; a sync cycle's writes land through [`commit`],
//! which replaces a provider's records in a single critical section so a
//! failed cycle can simply never reach the commit and leave the library
//! untouched.
//!
//! [`commit`]: GameRecordStore::commit

use crate::error::{LibraryError, Result};
use crate::models::{GameKey, GameRecord};
use chrono::Utc;
use core_auth::ProviderKind;
use core_runtime::events::{CoreEvent, EventBus, LibraryEvent};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

/// Outcome of a commit, as seen by the sync job counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitSummary {
    pub added: usize,
    pub updated: usize,
}

impl CommitSummary {
    pub fn is_empty(&self) -> bool {
        self.added == 0 && self.updated == 0
    }
}

/// In-memory canonical store, keyed provider → game key.
///
/// Key uniqueness per provider is structural: the inner map cannot hold
/// two records with the same key.
pub struct GameRecordStore {
    records: RwLock<HashMap<ProviderKind, HashMap<GameKey, GameRecord>>>,
    event_bus: EventBus,
}

impl GameRecordStore {
    pub fn new(event_bus: EventBus) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            event_bus,
        }
    }

    /// Snapshot of one provider's records, sorted by display name.
    pub async fn list(&self, provider: ProviderKind) -> Vec<GameRecord> {
        let records = self.records.read().await;
        let mut list: Vec<GameRecord> = records
            .get(&provider)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default();
        list.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        list
    }

    /// Snapshot of every provider's records, sorted by display name.
    pub async fn list_all(&self) -> Vec<GameRecord> {
        let records = self.records.read().await;
        let mut list: Vec<GameRecord> = records
            .values()
            .flat_map(|m| m.values().cloned())
            .collect();
        list.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        list
    }

    pub async fn get(&self, provider: ProviderKind, key: &GameKey) -> Option<GameRecord> {
        self.records
            .read()
            .await
            .get(&provider)
            .and_then(|m| m.get(key))
            .cloned()
    }

    pub async fn count(&self, provider: ProviderKind) -> usize {
        self.records
            .read()
            .await
            .get(&provider)
            .map(|m| m.len())
            .unwrap_or(0)
    }

    /// Replace a provider's record set with the reconciled one.
    ///
    /// All-or-nothing: the whole map swap happens under one write lock,
    /// so readers never observe a half-applied cycle. The reconciler
    /// worked from a snapshot, so for every key that still exists the
    /// live record is authoritative for user fields and already-applied
    /// enrichment: a favorite toggled or metadata enriched while the
    /// cycle ran is folded into the incoming record here, under the same
    /// lock that performs the swap. Returns add/update counts for the
    /// sync job.
    #[instrument(skip(self, reconciled), fields(provider = provider.as_str(), records = reconciled.len()))]
    pub async fn commit(
        &self,
        provider: ProviderKind,
        mut reconciled: HashMap<GameKey, GameRecord>,
    ) -> CommitSummary {
        let mut records = self.records.write().await;
        let prior = records.entry(provider).or_default();

        let mut summary = CommitSummary::default();
        let mut events = Vec::new();
        for (key, record) in reconciled.iter_mut() {
            match prior.get(key) {
                None => {
                    summary.added += 1;
                    events.push(LibraryEvent::RecordAdded {
                        key: key.to_string(),
                        provider: provider.as_str().to_string(),
                        display_name: record.display_name.clone(),
                    });
                }
                Some(existing) => {
                    record.user = existing.user.clone();
                    backfill_metadata(&mut record.metadata, &existing.metadata);
                    if existing != record {
                        summary.updated += 1;
                        events.push(LibraryEvent::RecordUpdated {
                            key: key.to_string(),
                            provider: provider.as_str().to_string(),
                        });
                    }
                }
            }
        }

        *prior = reconciled;
        drop(records);

        for event in events {
            let _ = self.event_bus.emit(CoreEvent::Library(event));
        }

        info!(
            added = summary.added,
            updated = summary.updated,
            "Committed reconciled records"
        );
        summary
    }

    /// Remove records whose ownership was revoked remotely.
    ///
    /// This is the only deletion path; reconciliation by itself never
    /// removes anything.
    #[instrument(skip(self, keys), fields(provider = provider.as_str()))]
    pub async fn remove_revoked(&self, provider: ProviderKind, keys: &[GameKey]) -> usize {
        let mut records = self.records.write().await;
        let Some(map) = records.get_mut(&provider) else {
            return 0;
        };

        let mut removed = 0;
        let mut events = Vec::new();
        for key in keys {
            if map.remove(key).is_some() {
                removed += 1;
                events.push(LibraryEvent::RecordRemoved {
                    key: key.to_string(),
                    provider: provider.as_str().to_string(),
                });
            }
        }
        drop(records);

        for event in events {
            let _ = self.event_bus.emit(CoreEvent::Library(event));
        }

        if removed > 0 {
            info!(removed, "Removed revoked records");
        }
        removed
    }

    /// Apply enrichment metadata to one record.
    ///
    /// Each field is written only when the incoming value is non-empty
    /// and differs from what is stored. Returns whether anything changed.
    pub async fn apply_metadata(
        &self,
        provider: ProviderKind,
        key: &GameKey,
        metadata: crate::models::GameMetadata,
    ) -> Result<bool> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(&provider)
            .and_then(|m| m.get_mut(key))
            .ok_or_else(|| LibraryError::NotFound {
                provider: provider.as_str().to_string(),
                key: key.to_string(),
            })?;

        let mut changed = false;
        let target = &mut record.metadata;
        for (incoming, current) in [
            (metadata.description, &mut target.description),
            (metadata.developer, &mut target.developer),
            (metadata.publisher, &mut target.publisher),
            (metadata.release_date, &mut target.release_date),
            (metadata.cover_url, &mut target.cover_url),
            (metadata.background_url, &mut target.background_url),
        ] {
            if !incoming.is_empty() && incoming != *current {
                *current = incoming;
                changed = true;
            }
        }

        if changed {
            debug!(key = %key, "Applied enrichment metadata");
            drop(records);
            let _ = self
                .event_bus
                .emit(CoreEvent::Library(LibraryEvent::RecordUpdated {
                    key: key.to_string(),
                    provider: provider.as_str().to_string(),
                }));
        }
        Ok(changed)
    }

    pub async fn set_favorite(
        &self,
        provider: ProviderKind,
        key: &GameKey,
        favorite: bool,
    ) -> Result<()> {
        self.mutate_user(provider, key, |user| user.favorite = favorite)
            .await
    }

    pub async fn set_hidden(
        &self,
        provider: ProviderKind,
        key: &GameKey,
        hidden: bool,
    ) -> Result<()> {
        self.mutate_user(provider, key, |user| user.hidden = hidden)
            .await
    }

    /// Bump the play counter and stamp `last_played` with the current time.
    pub async fn record_played(&self, provider: ProviderKind, key: &GameKey) -> Result<()> {
        self.mutate_user(provider, key, |user| {
            user.play_count += 1;
            user.last_played = Some(Utc::now());
        })
        .await
    }

    async fn mutate_user<F>(&self, provider: ProviderKind, key: &GameKey, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut crate::models::UserFields),
    {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(&provider)
            .and_then(|m| m.get_mut(key))
            .ok_or_else(|| LibraryError::NotFound {
                provider: provider.as_str().to_string(),
                key: key.to_string(),
            })?;
        mutate(&mut record.user);
        Ok(())
    }
}

/// Keep live enrichment on fields the incoming record left blank.
fn backfill_metadata(incoming: &mut crate::models::GameMetadata, live: &crate::models::GameMetadata) {
    for (target, kept) in [
        (&mut incoming.description, &live.description),
        (&mut incoming.developer, &live.developer),
        (&mut incoming.publisher, &live.publisher),
        (&mut incoming.release_date, &live.release_date),
        (&mut incoming.cover_url, &live.cover_url),
        (&mut incoming.background_url, &live.background_url),
    ] {
        if target.is_empty() && !kept.is_empty() {
            *target = kept.clone();
        }
    }
}
