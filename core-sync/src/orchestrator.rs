//! # Sync Orchestrator
//!
//! Drives one library sync cycle per provider.
//!
//! ## Workflow
//!
//! 1. Acquire a valid access token from the provider's `AuthSession`
//! 2. Run the inventory scan and the catalog fetch concurrently
//! 3. On a 401 from the catalog, refresh the token once and retry once
//! 4. Reconcile the snapshots against the prior canonical set
//! 5. Commit the merged set in one critical section
//! 6. Kick off metadata enrichment detached from the job
//! 7. Emit the completion event through the UI sink
//!
//! ## Guarantees
//!
//! - Single-flight per provider: a second `start_sync` while a job is
//!   running returns the running job's id instead of starting another
//!   cycle
//! - A failed or cancelled cycle commits nothing; the canonical set
//!   stays exactly as the previous cycle left it
//! - Scanner failure degrades to an empty local snapshot with a warning
//! - All sync events reach the event bus from the UI thread, through
//!   the same sink the executor uses for completions

use crate::enrich::MetadataEnricher;
use crate::job::{SyncJob, SyncJobId, SyncStatus};
use crate::provider::{CatalogClient, InventoryScanner, MetadataSource};
use crate::reconcile::{ReconcileOutcome, ReconciliationEngine};
use crate::{ProviderError, Result, SyncError};
use bridge_traits::ui::UiEventSink;
use core_auth::{AuthSession, ProviderKind};
use core_library::models::{CatalogEntry, GameKey, GameRecord};
use core_library::store::GameRecordStore;
use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Default bound on one whole sync cycle (5 minutes)
const DEFAULT_SYNC_TIMEOUT: Duration = Duration::from_secs(300);

/// Default bound on the detached enrichment pass (1 minute)
const DEFAULT_ENRICH_TIMEOUT: Duration = Duration::from_secs(60);

/// The plugin surface one storefront contributes.
pub struct ProviderRegistration {
    pub scanner: Arc<dyn InventoryScanner>,
    pub catalog: Arc<dyn CatalogClient>,
    pub metadata: Option<Arc<dyn MetadataSource>>,
}

struct ProviderSlot {
    registration: ProviderRegistration,
    session: Arc<AuthSession>,
}

pub struct SyncOrchestrator {
    providers: RwLock<HashMap<ProviderKind, Arc<ProviderSlot>>>,
    store: Arc<GameRecordStore>,
    event_bus: EventBus,
    ui_sink: Arc<dyn UiEventSink>,
    jobs: RwLock<HashMap<ProviderKind, SyncJob>>,
    cancel_tokens: RwLock<HashMap<ProviderKind, CancellationToken>>,
    sync_timeout: Duration,
    enrich_timeout: Duration,
    enrich_batch_size: usize,
}

impl SyncOrchestrator {
    pub fn new(
        store: Arc<GameRecordStore>,
        event_bus: EventBus,
        ui_sink: Arc<dyn UiEventSink>,
    ) -> Self {
        Self {
            providers: RwLock::new(HashMap::new()),
            store,
            event_bus,
            ui_sink,
            jobs: RwLock::new(HashMap::new()),
            cancel_tokens: RwLock::new(HashMap::new()),
            sync_timeout: DEFAULT_SYNC_TIMEOUT,
            enrich_timeout: DEFAULT_ENRICH_TIMEOUT,
            enrich_batch_size: crate::enrich::DEFAULT_ENRICH_BATCH_SIZE,
        }
    }

    pub fn with_sync_timeout(mut self, timeout: Duration) -> Self {
        self.sync_timeout = timeout;
        self
    }

    pub fn with_enrich_timeout(mut self, timeout: Duration) -> Self {
        self.enrich_timeout = timeout;
        self
    }

    pub fn with_enrich_batch_size(mut self, batch_size: usize) -> Self {
        self.enrich_batch_size = batch_size.max(1);
        self
    }

    /// Register a provider plugin together with its auth session.
    pub async fn register_provider(
        &self,
        registration: ProviderRegistration,
        session: Arc<AuthSession>,
    ) {
        let provider = session.provider();
        info!(provider = provider.as_str(), "Provider registered");
        self.providers.write().await.insert(
            provider,
            Arc::new(ProviderSlot {
                registration,
                session,
            }),
        );
    }

    /// Start a sync cycle for `provider`, or join the running one.
    ///
    /// If a job is already running this returns its id without starting
    /// a second cycle.
    #[instrument(skip(self), fields(provider = provider.as_str()))]
    pub async fn start_sync(self: &Arc<Self>, provider: ProviderKind) -> Result<SyncJobId> {
        let slot = self
            .providers
            .read()
            .await
            .get(&provider)
            .cloned()
            .ok_or_else(|| SyncError::ProviderNotRegistered {
                provider: provider.as_str().to_string(),
            })?;

        // Single-flight guard: job creation happens under the write lock
        // so two concurrent callers cannot both start a cycle.
        let job = {
            let mut jobs = self.jobs.write().await;
            if let Some(running) = jobs
                .get(&provider)
                .filter(|j| j.status == SyncStatus::Running)
            {
                debug!(job_id = %running.id, "Sync already running; returning existing job");
                return Ok(running.id);
            }
            let job = SyncJob::start(provider);
            jobs.insert(provider, job.clone());
            job
        };

        let cancel = CancellationToken::new();
        self.cancel_tokens
            .write()
            .await
            .insert(provider, cancel.clone());

        info!(job_id = %job.id, "Sync started");
        self.emit_on_ui(CoreEvent::Sync(SyncEvent::Started {
            job_id: job.id.to_string(),
            provider: provider.as_str().to_string(),
        }));

        let orchestrator = Arc::clone(self);
        let job_id = job.id;
        tokio::spawn(async move {
            orchestrator.run_cycle(provider, slot, job, cancel).await;
        });

        Ok(job_id)
    }

    /// Latest job for the provider, or an idle placeholder.
    pub async fn status(&self, provider: ProviderKind) -> SyncJob {
        self.jobs
            .read()
            .await
            .get(&provider)
            .cloned()
            .unwrap_or_else(|| SyncJob::idle(provider))
    }

    /// Look a job up by id across providers.
    pub async fn find_job(&self, job_id: SyncJobId) -> Result<SyncJob> {
        self.jobs
            .read()
            .await
            .values()
            .find(|j| j.id == job_id)
            .cloned()
            .ok_or_else(|| SyncError::JobNotFound {
                job_id: job_id.to_string(),
            })
    }

    /// Cooperatively cancel the provider's running cycle, if any.
    ///
    /// The logout path calls this before clearing the credential so the
    /// cycle stops before its commit point; nothing partial is written.
    #[instrument(skip(self), fields(provider = provider.as_str()))]
    pub async fn cancel_sync(&self, provider: ProviderKind) {
        if let Some(token) = self.cancel_tokens.read().await.get(&provider) {
            info!("Cancelling running sync");
            token.cancel();
        }
    }

    async fn run_cycle(
        self: Arc<Self>,
        provider: ProviderKind,
        slot: Arc<ProviderSlot>,
        mut job: SyncJob,
        cancel: CancellationToken,
    ) {
        let outcome = tokio::select! {
            _ = cancel.cancelled() => Err(SyncError::Cancelled),
            outcome = tokio::time::timeout(
                self.sync_timeout,
                self.scan_fetch_reconcile(provider, &slot),
            ) => match outcome {
                Ok(outcome) => outcome,
                Err(_) => Err(SyncError::Timeout(self.sync_timeout.as_secs())),
            },
        };

        match outcome {
            Ok((reconciled, access_token)) => {
                let added_keys = reconciled.added.clone();
                let summary = self.store.commit(provider, reconciled.records).await;
                job.succeed(summary.added, summary.updated);
                info!(
                    job_id = %job.id,
                    added = summary.added,
                    updated = summary.updated,
                    "Sync succeeded"
                );
                self.emit_on_ui(CoreEvent::Sync(SyncEvent::Completed {
                    job_id: job.id.to_string(),
                    provider: provider.as_str().to_string(),
                    added: summary.added as u64,
                    updated: summary.updated as u64,
                    duration_ms: job.duration_ms(),
                }));

                self.spawn_enrichment(provider, &slot, access_token, added_keys);
            }
            Err(SyncError::Cancelled) => {
                warn!(job_id = %job.id, "Sync cancelled");
                job.fail("cancelled");
                self.emit_on_ui(CoreEvent::Sync(SyncEvent::Cancelled {
                    job_id: job.id.to_string(),
                    provider: provider.as_str().to_string(),
                }));
            }
            Err(e) => {
                error!(job_id = %job.id, error = %e, "Sync failed");
                // Auth failures mean the user has to sign in again; a
                // retry without that cannot succeed.
                let recoverable = !matches!(e, SyncError::Auth(_));
                job.fail(e.to_string());
                self.emit_on_ui(CoreEvent::Sync(SyncEvent::Failed {
                    job_id: job.id.to_string(),
                    provider: provider.as_str().to_string(),
                    message: e.to_string(),
                    recoverable,
                }));
            }
        }

        // Token removal must precede the terminal job insert: the insert
        // releases the single-flight guard, and a successor cycle's fresh
        // token must not be swept away by this one's cleanup.
        self.cancel_tokens.write().await.remove(&provider);
        self.jobs.write().await.insert(provider, job);
    }

    /// The fallible middle of a cycle: everything up to, but not
    /// including, the store commit.
    async fn scan_fetch_reconcile(
        &self,
        provider: ProviderKind,
        slot: &ProviderSlot,
    ) -> Result<(ReconcileOutcome, String)> {
        let access_token = slot.session.access_token().await?;

        let (scanned, fetched) = tokio::join!(
            slot.registration.scanner.scan(),
            self.fetch_with_refresh(slot, &access_token),
        );

        let local = match scanned {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "Inventory scan failed; treating local library as empty");
                Vec::new()
            }
        };
        let (remote, access_token) = fetched?;

        let prior = self.prior_records(provider).await;
        let outcome = ReconciliationEngine::reconcile(provider, &prior, local, remote);
        Ok((outcome, access_token))
    }

    /// Fetch the owned catalog, refreshing the token once on a 401.
    ///
    /// Returns the entries together with the token that worked, so
    /// enrichment reuses it without another refresh round.
    async fn fetch_with_refresh(
        &self,
        slot: &ProviderSlot,
        access_token: &str,
    ) -> Result<(Vec<CatalogEntry>, String)> {
        match slot.registration.catalog.fetch_owned(access_token).await {
            Ok(entries) => Ok((entries, access_token.to_string())),
            Err(ProviderError::Unauthorized) => {
                info!("Catalog rejected token; refreshing and retrying once");
                let renewed = slot.session.refresh().await?;
                let entries = slot
                    .registration
                    .catalog
                    .fetch_owned(&renewed.access_token)
                    .await
                    .map_err(|e| SyncError::Fetch(e.to_string()))?;
                Ok((entries, renewed.access_token))
            }
            Err(e) => Err(SyncError::Fetch(e.to_string())),
        }
    }

    async fn prior_records(&self, provider: ProviderKind) -> HashMap<GameKey, GameRecord> {
        self.store
            .list(provider)
            .await
            .into_iter()
            .map(|r| (r.key.clone(), r))
            .collect()
    }

    fn spawn_enrichment(
        &self,
        provider: ProviderKind,
        slot: &ProviderSlot,
        access_token: String,
        added: Vec<GameKey>,
    ) {
        let Some(source) = slot.registration.metadata.clone() else {
            return;
        };
        if added.is_empty() {
            return;
        }
        let enricher = MetadataEnricher::new(source, Arc::clone(&self.store))
            .with_batch_size(self.enrich_batch_size);
        let enrich_timeout = self.enrich_timeout;
        tokio::spawn(async move {
            let pass = enricher.enrich(provider, &access_token, &added);
            if tokio::time::timeout(enrich_timeout, pass).await.is_err() {
                warn!(
                    provider = provider.as_str(),
                    timeout_secs = enrich_timeout.as_secs(),
                    "Enrichment pass timed out; remaining batches skipped"
                );
            }
        });
    }

    /// Hand an event to the UI thread; the bus emit happens inside the
    /// posted task so subscribers observe it from the UI side.
    fn emit_on_ui(&self, event: CoreEvent) {
        let bus = self.event_bus.clone();
        let posted = self.ui_sink.post(Box::new(move || {
            let _ = bus.emit(event);
        }));
        if !posted {
            debug!("UI sink closed; event dropped");
        }
    }
}
