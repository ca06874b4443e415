//! # Reconciliation Engine
//!
//! Three-way merge of one cycle's scan and fetch snapshots against the
//! prior canonical record set.
//!
//! ## Merge rules
//!
//! For every key seen locally, remotely, or in the prior set:
//! - local only: installed record, launch command from the manifest
//! - remote only: virtual record, launch command from the store URI
//! - both: installed record, local launch data preferred, remote ids
//!   filled in
//! - prior only: carried forward untouched; absence is never deletion
//!
//! User fields are copied forward verbatim from the prior record in
//! every branch. The diff reports a key as updated only when the merged
//! record materially differs from the prior one, so an unchanged second
//! cycle yields an empty diff.

use core_auth::ProviderKind;
use core_library::models::{CatalogEntry, GameKey, GameRecord, InstalledEntry};
use std::collections::HashMap;
use tracing::{debug, instrument};

/// Result of one merge pass.
pub struct ReconcileOutcome {
    /// The full next canonical set for the provider.
    pub records: HashMap<GameKey, GameRecord>,
    /// Keys that did not exist before this cycle.
    pub added: Vec<GameKey>,
    /// Keys whose record materially changed this cycle.
    pub updated: Vec<GameKey>,
}

impl ReconcileOutcome {
    pub fn is_unchanged(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty()
    }
}

/// Stateless merge of scan/fetch snapshots into the next canonical set.
pub struct ReconciliationEngine;

impl ReconciliationEngine {
    #[instrument(skip_all, fields(provider = provider.as_str(), local = local.len(), remote = remote.len(), prior = prior.len()))]
    pub fn reconcile(
        provider: ProviderKind,
        prior: &HashMap<GameKey, GameRecord>,
        local: Vec<InstalledEntry>,
        remote: Vec<CatalogEntry>,
    ) -> ReconcileOutcome {
        let local_by_key: HashMap<GameKey, InstalledEntry> =
            local.into_iter().map(|e| (e.key.clone(), e)).collect();
        let remote_by_key: HashMap<GameKey, CatalogEntry> =
            remote.into_iter().map(|e| (e.key.clone(), e)).collect();

        let mut keys: Vec<GameKey> = local_by_key
            .keys()
            .chain(remote_by_key.keys())
            .chain(prior.keys())
            .cloned()
            .collect();
        keys.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        keys.dedup();

        let mut records = HashMap::with_capacity(keys.len());
        let mut added = Vec::new();
        let mut updated = Vec::new();

        for key in keys {
            let prior_record = prior.get(&key);
            let merged = match (local_by_key.get(&key), remote_by_key.get(&key)) {
                (Some(local), remote) => Self::merge_installed(provider, local, remote, prior_record),
                (None, Some(remote)) => Self::merge_virtual(provider, remote, prior_record),
                (None, None) => match prior_record {
                    Some(existing) => existing.clone(),
                    // Union over the three key sets; unreachable by construction.
                    None => continue,
                },
            };

            match prior_record {
                None => added.push(key.clone()),
                Some(existing) if *existing != merged => updated.push(key.clone()),
                Some(_) => {}
            }
            records.insert(key, merged);
        }

        debug!(
            added = added.len(),
            updated = updated.len(),
            "Reconciliation pass complete"
        );
        ReconcileOutcome {
            records,
            added,
            updated,
        }
    }

    fn merge_installed(
        provider: ProviderKind,
        local: &InstalledEntry,
        remote: Option<&CatalogEntry>,
        prior: Option<&GameRecord>,
    ) -> GameRecord {
        let mut record = GameRecord::from_installed(provider, local, remote);
        record.display_name = Self::choose_name(
            &record.key,
            prior,
            Some(&local.display_name),
            remote.map(|r| r.display_name.as_str()),
        );
        Self::carry_forward(&mut record, prior);
        record
    }

    fn merge_virtual(
        provider: ProviderKind,
        remote: &CatalogEntry,
        prior: Option<&GameRecord>,
    ) -> GameRecord {
        let mut record = GameRecord::from_catalog(provider, remote);
        record.display_name = Self::choose_name(
            &record.key,
            prior,
            None,
            Some(&remote.display_name),
        );
        Self::carry_forward(&mut record, prior);
        record
    }

    /// Pick the display name for a merged record.
    ///
    /// The remote catalog name wins only over a prior name that is empty
    /// or equal to the raw key; a name a previous cycle already improved
    /// is kept. Local manifest names count as improved names too.
    fn choose_name(
        key: &GameKey,
        prior: Option<&GameRecord>,
        local: Option<&str>,
        remote: Option<&str>,
    ) -> String {
        let prior_name = prior.map(|p| p.display_name.as_str()).unwrap_or("");
        let prior_is_placeholder = prior_name.is_empty() || prior_name == key.as_str();

        if let Some(local) = local.filter(|n| !n.is_empty()) {
            if let Some(remote) = remote.filter(|n| !n.is_empty() && *n != local) {
                return if prior_is_placeholder {
                    remote.to_string()
                } else {
                    prior_name.to_string()
                };
            }
            return local.to_string();
        }
        if let Some(remote) = remote.filter(|n| !n.is_empty()) {
            return if prior_is_placeholder {
                remote.to_string()
            } else {
                prior_name.to_string()
            };
        }
        if !prior_name.is_empty() {
            return prior_name.to_string();
        }
        key.to_string()
    }

    /// Copy forward everything the cycle's inputs must not clobber.
    fn carry_forward(record: &mut GameRecord, prior: Option<&GameRecord>) {
        let Some(prior) = prior else { return };
        record.user = prior.user.clone();
        record.metadata = prior.metadata.clone();
        if record.product_id.is_empty() {
            record.product_id = prior.product_id.clone();
        }
        if record.namespace_id.is_empty() {
            record.namespace_id = prior.namespace_id.clone();
        }
    }
}
