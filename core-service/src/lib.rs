//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (HTTP transport,
//! secure storage, filesystem probe, UI sink) into the shared library
//! core. Desktop apps typically enable the `desktop-shims` feature and
//! hand in the adapters from `bridge-desktop`; the `epic` feature adds a
//! one-call registration for the Epic storefront plugin.
//!
//! The façade owns the long-lived pieces: one [`AuthSession`] per
//! registered provider, the canonical [`GameRecordStore`], and the
//! [`SyncOrchestrator`]. Hosts talk to those only through this type.

pub mod error;

pub use error::{CoreError, Result};

use bridge_traits::http::HttpClient;
use bridge_traits::probe::FilesystemProbe;
use bridge_traits::ui::UiEventSink;
use core_auth::{AuthSession, AuthState, AuthorizeUrl, CredentialStore, ProviderKind, TokenBroker};
use core_library::models::{GameKey, GameRecord};
use core_library::store::GameRecordStore;
use core_runtime::config::{CoreConfig, CoreSettings};
use core_runtime::events::{CoreEvent, EventBus};
use core_runtime::executor::RequestExecutor;
use core_sync::{ProviderRegistration, SyncJob, SyncJobId, SyncOrchestrator};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::RwLock;
use tracing::{info, instrument};

#[cfg(feature = "epic")]
use provider_epic::{
    EpicAuthConfig, EpicCatalogClient, EpicInventoryScanner, EpicMetadataClient, EpicTokenBroker,
};
#[cfg(feature = "epic")]
use std::path::PathBuf;

/// Primary façade exposed to host applications.
pub struct CoreService {
    http_client: Arc<dyn HttpClient>,
    filesystem_probe: Arc<dyn FilesystemProbe>,
    ui_sink: Arc<dyn UiEventSink>,
    credential_store: CredentialStore,
    settings: CoreSettings,
    event_bus: EventBus,
    store: Arc<GameRecordStore>,
    orchestrator: Arc<SyncOrchestrator>,
    sessions: RwLock<HashMap<ProviderKind, Arc<AuthSession>>>,
}

impl CoreService {
    /// Build the core from a validated capability set.
    pub fn new(config: CoreConfig) -> Result<Self> {
        let http_client = config.require_http_client()?;
        let secure_store = config.require_secure_store()?;
        let filesystem_probe = config.require_filesystem_probe()?;
        let ui_sink = config.require_ui_sink()?;
        let settings = config.settings;

        let event_bus = EventBus::new(settings.event_buffer);
        let store = Arc::new(GameRecordStore::new(event_bus.clone()));
        let orchestrator = Arc::new(
            SyncOrchestrator::new(store.clone(), event_bus.clone(), ui_sink.clone())
                .with_sync_timeout(settings.fetch_timeout)
                .with_enrich_timeout(settings.enrich_timeout)
                .with_enrich_batch_size(settings.enrich_batch_size),
        );

        info!("Core service initialized");
        Ok(Self {
            http_client,
            filesystem_probe,
            ui_sink,
            credential_store: CredentialStore::new(secure_store),
            settings,
            event_bus,
            store,
            orchestrator,
            sessions: RwLock::new(HashMap::new()),
        })
    }

    /// Register a storefront plugin with its token broker.
    ///
    /// Restores any persisted credential so a returning user is signed
    /// in without interaction.
    pub async fn register_provider(
        &self,
        provider: ProviderKind,
        broker: Arc<dyn TokenBroker>,
        registration: ProviderRegistration,
    ) -> Result<()> {
        let session = Arc::new(
            AuthSession::new(
                provider,
                broker,
                self.credential_store.clone(),
                RequestExecutor::new(self.ui_sink.clone()),
                self.event_bus.clone(),
            )
            .with_auth_timeout(self.settings.auth_timeout),
        );
        session.restore().await?;

        self.orchestrator
            .register_provider(registration, session.clone())
            .await;
        self.sessions.write().await.insert(provider, session);
        Ok(())
    }

    /// Register the Epic storefront plugin.
    #[cfg(feature = "epic")]
    pub async fn register_epic(
        &self,
        auth: EpicAuthConfig,
        manifest_dir: PathBuf,
        catalog_namespace: impl Into<String>,
    ) -> Result<()> {
        let broker = Arc::new(EpicTokenBroker::new(self.http_client.clone(), auth));
        let registration = ProviderRegistration {
            scanner: Arc::new(EpicInventoryScanner::new(
                self.filesystem_probe.clone(),
                manifest_dir,
            )),
            catalog: Arc::new(EpicCatalogClient::new(self.http_client.clone())),
            metadata: Some(Arc::new(EpicMetadataClient::new(
                self.http_client.clone(),
                catalog_namespace.into(),
            ))),
        };
        self.register_provider(ProviderKind::Epic, broker, registration)
            .await
    }

    // -- auth -------------------------------------------------------------

    /// Begin the login flow; the host opens the returned URL.
    pub async fn start_login(&self, provider: ProviderKind) -> Result<AuthorizeUrl> {
        Ok(self.session(provider).await?.start_login().await?)
    }

    /// Complete login with the code captured from the redirect.
    pub async fn exchange_code(&self, provider: ProviderKind, code: String) -> Result<()> {
        self.session(provider).await?.exchange_code(code).await?;
        Ok(())
    }

    pub async fn auth_state(&self, provider: ProviderKind) -> Result<AuthState> {
        Ok(self.session(provider).await?.state().await)
    }

    /// Sign the provider out: cancel any running sync, then clear the
    /// credential. Library records are kept.
    #[instrument(skip(self), fields(provider = provider.as_str()))]
    pub async fn logout(&self, provider: ProviderKind) -> Result<()> {
        let session = self.session(provider).await?;
        self.orchestrator.cancel_sync(provider).await;
        session.logout().await?;
        Ok(())
    }

    // -- sync -------------------------------------------------------------

    /// Start a sync cycle, or join the one already running.
    pub async fn start_sync(&self, provider: ProviderKind) -> Result<SyncJobId> {
        Ok(self.orchestrator.start_sync(provider).await?)
    }

    pub async fn sync_status(&self, provider: ProviderKind) -> SyncJob {
        self.orchestrator.status(provider).await
    }

    // -- library ----------------------------------------------------------

    pub async fn list_games(&self, provider: ProviderKind) -> Vec<GameRecord> {
        self.store.list(provider).await
    }

    pub async fn all_games(&self) -> Vec<GameRecord> {
        self.store.list_all().await
    }

    pub async fn get_game(&self, provider: ProviderKind, key: &GameKey) -> Result<GameRecord> {
        self.store
            .get(provider, key)
            .await
            .ok_or_else(|| CoreError::Library(core_library::LibraryError::NotFound {
                provider: provider.as_str().to_string(),
                key: key.to_string(),
            }))
    }

    pub async fn set_favorite(
        &self,
        provider: ProviderKind,
        key: &GameKey,
        favorite: bool,
    ) -> Result<()> {
        Ok(self.store.set_favorite(provider, key, favorite).await?)
    }

    pub async fn set_hidden(
        &self,
        provider: ProviderKind,
        key: &GameKey,
        hidden: bool,
    ) -> Result<()> {
        Ok(self.store.set_hidden(provider, key, hidden).await?)
    }

    pub async fn record_played(&self, provider: ProviderKind, key: &GameKey) -> Result<()> {
        Ok(self.store.record_played(provider, key).await?)
    }

    // -- events -----------------------------------------------------------

    /// Subscribe to core events. UI hosts should drain this from the
    /// thread that pumps the UI task queue.
    pub fn events(&self) -> broadcast::Receiver<CoreEvent> {
        self.event_bus.subscribe()
    }

    pub fn store(&self) -> Arc<GameRecordStore> {
        self.store.clone()
    }

    async fn session(&self, provider: ProviderKind) -> Result<Arc<AuthSession>> {
        self.sessions
            .read()
            .await
            .get(&provider)
            .cloned()
            .ok_or_else(|| CoreError::UnknownProvider(provider.as_str().to_string()))
    }
}
