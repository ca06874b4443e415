//! End-to-end sync cycle tests against fake provider plugins.

use async_trait::async_trait;
use bridge_desktop::ui::ui_channel;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::storage::SecureStore;
use core_auth::{
    AuthSession, AuthorizeUrl, Credential, CredentialStore, LoginChallenge, ProviderKind,
    TokenBroker,
};
use core_library::models::{CatalogEntry, GameMetadata, InstalledEntry};
use core_library::store::GameRecordStore;
use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
use core_runtime::executor::RequestExecutor;
use core_sync::error::ProviderError;
use core_sync::job::SyncStatus;
use core_sync::orchestrator::{ProviderRegistration, SyncOrchestrator};
use core_sync::provider::{CatalogClient, InventoryScanner, MetadataSource};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

struct MemorySecureStore {
    storage: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemorySecureStore {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            storage: Mutex::new(HashMap::new()),
        })
    }
}

#[async_trait]
impl SecureStore for MemorySecureStore {
    async fn set_secret(&self, key: &str, value: &[u8]) -> BridgeResult<()> {
        self.storage
            .lock()
            .await
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn get_secret(&self, key: &str) -> BridgeResult<Option<Vec<u8>>> {
        Ok(self.storage.lock().await.get(key).cloned())
    }

    async fn delete_secret(&self, key: &str) -> BridgeResult<()> {
        self.storage.lock().await.remove(key);
        Ok(())
    }

    async fn list_keys(&self) -> BridgeResult<Vec<String>> {
        Ok(self.storage.lock().await.keys().cloned().collect())
    }
}

struct FakeBroker {
    refresh_calls: AtomicUsize,
}

impl FakeBroker {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            refresh_calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl TokenBroker for FakeBroker {
    fn authorize_url(&self, challenge: &LoginChallenge) -> core_auth::Result<AuthorizeUrl> {
        Ok(AuthorizeUrl {
            url: format!("https://auth.test/?state={}", challenge.state),
            state: challenge.state.clone(),
        })
    }

    async fn exchange_code(
        &self,
        _code: &str,
        _challenge: &LoginChallenge,
    ) -> core_auth::Result<Credential> {
        unreachable!("tests restore a persisted credential instead")
    }

    async fn refresh(&self, _refresh_token: &str) -> core_auth::Result<Credential> {
        let n = self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        Ok(credential(&format!("access-{}", n + 1)))
    }
}

#[derive(Default)]
struct FakeScanner {
    entries: Vec<InstalledEntry>,
    fail: bool,
}

#[async_trait]
impl InventoryScanner for FakeScanner {
    async fn scan(&self) -> Result<Vec<InstalledEntry>, ProviderError> {
        if self.fail {
            return Err(ProviderError::Scan("manifest directory unreadable".into()));
        }
        Ok(self.entries.clone())
    }
}

struct FakeCatalog {
    entries: Vec<CatalogEntry>,
    fetch_calls: AtomicUsize,
    /// Reject every token except this one, when set.
    accept_only: Option<String>,
    /// Block until notified, when set.
    hold: Option<Arc<Notify>>,
    fail: bool,
}

impl FakeCatalog {
    fn returning(entries: Vec<CatalogEntry>) -> Self {
        Self {
            entries,
            fetch_calls: AtomicUsize::new(0),
            accept_only: None,
            hold: None,
            fail: false,
        }
    }
}

#[async_trait]
impl CatalogClient for FakeCatalog {
    async fn fetch_owned(&self, access_token: &str) -> Result<Vec<CatalogEntry>, ProviderError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(hold) = &self.hold {
            hold.notified().await;
        }
        if self.fail {
            return Err(ProviderError::MalformedResponse("boom".into()));
        }
        if let Some(expected) = &self.accept_only {
            if access_token != expected {
                return Err(ProviderError::Unauthorized);
            }
        }
        Ok(self.entries.clone())
    }
}

struct FakeMetadata {
    enriched: Arc<AtomicBool>,
}

#[async_trait]
impl MetadataSource for FakeMetadata {
    async fn fetch_metadata(
        &self,
        _access_token: &str,
        catalog_ids: &[String],
    ) -> Result<Vec<(String, GameMetadata)>, ProviderError> {
        self.enriched.store(true, Ordering::SeqCst);
        Ok(catalog_ids
            .iter()
            .map(|id| {
                (
                    id.clone(),
                    GameMetadata {
                        developer: "Test Studio".to_string(),
                        ..Default::default()
                    },
                )
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Fixture
// ---------------------------------------------------------------------------

fn credential(access_token: &str) -> Credential {
    Credential::new(
        ProviderKind::Epic,
        access_token.to_string(),
        "refresh-token".to_string(),
        "acct-1".to_string(),
        "bearer".to_string(),
        3600,
    )
}

fn installed(key: &str, name: &str) -> InstalledEntry {
    InstalledEntry {
        key: key.into(),
        display_name: name.to_string(),
        install_path: format!("/g/{}", key),
        executable_path: "run.bin".to_string(),
        launch_args: vec![],
    }
}

fn owned(key: &str, name: &str) -> CatalogEntry {
    CatalogEntry {
        key: key.into(),
        display_name: name.to_string(),
        product_id: format!("prod-{}", key),
        namespace_id: "ns".to_string(),
        store_uri: format!("store://apps/ns:{}?action=launch", key),
        ownership_methods: vec!["purchase".to_string()],
    }
}

struct Fixture {
    orchestrator: Arc<SyncOrchestrator>,
    store: Arc<GameRecordStore>,
    session: Arc<AuthSession>,
    broker: Arc<FakeBroker>,
    event_bus: EventBus,
}

impl Fixture {
    /// Wire a full stack around the given plugin fakes, signed in with a
    /// fresh token, with a background task pumping the UI queue.
    async fn new(
        scanner: FakeScanner,
        catalog: FakeCatalog,
        metadata: Option<Arc<dyn MetadataSource>>,
    ) -> Self {
        let (sink, mut queue) = ui_channel();
        let sink = Arc::new(sink);
        tokio::spawn(async move { while queue.run_next().await {} });

        let event_bus = EventBus::new(100);
        let broker = FakeBroker::new();
        let credential_store = CredentialStore::new(MemorySecureStore::new());
        credential_store.save(&credential("access-0")).await.unwrap();

        let session = Arc::new(AuthSession::new(
            ProviderKind::Epic,
            broker.clone(),
            credential_store,
            RequestExecutor::new(sink.clone()),
            event_bus.clone(),
        ));
        session.restore().await.unwrap();

        let store = Arc::new(GameRecordStore::new(event_bus.clone()));
        let orchestrator = Arc::new(
            SyncOrchestrator::new(store.clone(), event_bus.clone(), sink)
                .with_sync_timeout(Duration::from_secs(5)),
        );
        orchestrator
            .register_provider(
                ProviderRegistration {
                    scanner: Arc::new(scanner),
                    catalog: Arc::new(catalog),
                    metadata,
                },
                session.clone(),
            )
            .await;

        Self {
            orchestrator,
            store,
            session,
            broker,
            event_bus,
        }
    }

    async fn wait_terminal(&self) -> core_sync::SyncJob {
        for _ in 0..200 {
            let job = self.orchestrator.status(ProviderKind::Epic).await;
            if job.status.is_terminal() {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("sync did not reach a terminal state");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn local_only_title_becomes_installed_record() {
    let fixture = Fixture::new(
        FakeScanner {
            entries: vec![installed("x", "Game X")],
            fail: false,
        },
        FakeCatalog::returning(vec![]),
        None,
    )
    .await;

    fixture.orchestrator.start_sync(ProviderKind::Epic).await.unwrap();
    let job = fixture.wait_terminal().await;
    assert_eq!(job.status, SyncStatus::Succeeded);
    assert_eq!(job.added_count, 1);

    let record = fixture
        .store
        .get(ProviderKind::Epic, &"x".into())
        .await
        .unwrap();
    assert!(record.installed);
    assert!(!record.is_virtual);
}

#[tokio::test]
async fn remote_only_title_becomes_virtual_record() {
    let fixture = Fixture::new(
        FakeScanner::default(),
        FakeCatalog::returning(vec![owned("x", "Game X")]),
        None,
    )
    .await;

    fixture.orchestrator.start_sync(ProviderKind::Epic).await.unwrap();
    let job = fixture.wait_terminal().await;
    assert_eq!(job.status, SyncStatus::Succeeded);

    let record = fixture
        .store
        .get(ProviderKind::Epic, &"x".into())
        .await
        .unwrap();
    assert!(!record.installed);
    assert!(record.is_virtual);
    assert_eq!(record.display_name, "Game X");
}

#[tokio::test]
async fn favorite_survives_a_cycle_that_does_not_mention_it() {
    let fixture = Fixture::new(
        FakeScanner::default(),
        FakeCatalog::returning(vec![owned("x", "Game X")]),
        None,
    )
    .await;

    fixture.orchestrator.start_sync(ProviderKind::Epic).await.unwrap();
    fixture.wait_terminal().await;
    fixture
        .store
        .set_favorite(ProviderKind::Epic, &"x".into(), true)
        .await
        .unwrap();

    // Second cycle over the same remote data.
    fixture.orchestrator.start_sync(ProviderKind::Epic).await.unwrap();
    let job = fixture.wait_terminal().await;
    assert_eq!(job.status, SyncStatus::Succeeded);
    assert_eq!(job.added_count, 0);
    assert_eq!(job.updated_count, 0);

    let record = fixture
        .store
        .get(ProviderKind::Epic, &"x".into())
        .await
        .unwrap();
    assert!(record.user.favorite);
}

#[tokio::test]
async fn rejected_token_triggers_one_refresh_then_succeeds() {
    let catalog = FakeCatalog {
        // Only the post-refresh token is accepted.
        accept_only: Some("access-1".to_string()),
        ..FakeCatalog::returning(vec![owned("x", "Game X")])
    };
    let fixture = Fixture::new(FakeScanner::default(), catalog, None).await;

    fixture.orchestrator.start_sync(ProviderKind::Epic).await.unwrap();
    let job = fixture.wait_terminal().await;
    assert_eq!(job.status, SyncStatus::Succeeded);
    assert_eq!(job.added_count, 1);
    assert_eq!(fixture.broker.refresh_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn scanner_failure_degrades_to_empty_local_list() {
    let fixture = Fixture::new(
        FakeScanner {
            entries: vec![],
            fail: true,
        },
        FakeCatalog::returning(vec![owned("x", "Game X")]),
        None,
    )
    .await;

    fixture.orchestrator.start_sync(ProviderKind::Epic).await.unwrap();
    let job = fixture.wait_terminal().await;
    assert_eq!(job.status, SyncStatus::Succeeded);
    let record = fixture
        .store
        .get(ProviderKind::Epic, &"x".into())
        .await
        .unwrap();
    assert!(record.is_virtual);
}

#[tokio::test]
async fn fetch_failure_leaves_prior_records_untouched() {
    let fixture = Fixture::new(
        FakeScanner {
            entries: vec![installed("x", "Game X")],
            fail: false,
        },
        FakeCatalog::returning(vec![owned("y", "Game Y")]),
        None,
    )
    .await;

    fixture.orchestrator.start_sync(ProviderKind::Epic).await.unwrap();
    fixture.wait_terminal().await;
    assert_eq!(fixture.store.count(ProviderKind::Epic).await, 2);

    // Rebuild with a failing catalog against the same store.
    let (sink, mut queue) = ui_channel();
    tokio::spawn(async move { while queue.run_next().await {} });
    let orchestrator = Arc::new(SyncOrchestrator::new(
        fixture.store.clone(),
        fixture.event_bus.clone(),
        Arc::new(sink),
    ));
    let catalog = FakeCatalog {
        fail: true,
        ..FakeCatalog::returning(vec![])
    };
    orchestrator
        .register_provider(
            ProviderRegistration {
                scanner: Arc::new(FakeScanner::default()),
                catalog: Arc::new(catalog),
                metadata: None,
            },
            fixture.session.clone(),
        )
        .await;

    orchestrator.start_sync(ProviderKind::Epic).await.unwrap();
    for _ in 0..200 {
        if orchestrator.status(ProviderKind::Epic).await.status.is_terminal() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let job = orchestrator.status(ProviderKind::Epic).await;
    assert_eq!(job.status, SyncStatus::Failed);
    assert_eq!(fixture.store.count(ProviderKind::Epic).await, 2);
}

#[tokio::test]
async fn second_start_sync_joins_the_running_job() {
    let hold = Arc::new(Notify::new());
    let catalog = FakeCatalog {
        hold: Some(hold.clone()),
        ..FakeCatalog::returning(vec![owned("x", "Game X")])
    };
    let fixture = Fixture::new(FakeScanner::default(), catalog, None).await;

    let first = fixture.orchestrator.start_sync(ProviderKind::Epic).await.unwrap();
    let second = fixture.orchestrator.start_sync(ProviderKind::Epic).await.unwrap();
    assert_eq!(first, second);

    hold.notify_one();
    let job = fixture.wait_terminal().await;
    assert_eq!(job.id, first);
    assert_eq!(job.status, SyncStatus::Succeeded);
    // One cycle ran, not two.
    assert_eq!(job.added_count, 1);
}

#[tokio::test]
async fn cancellation_commits_nothing() {
    let hold = Arc::new(Notify::new());
    let catalog = FakeCatalog {
        hold: Some(hold.clone()),
        ..FakeCatalog::returning(vec![owned("x", "Game X")])
    };
    let fixture = Fixture::new(FakeScanner::default(), catalog, None).await;

    fixture.orchestrator.start_sync(ProviderKind::Epic).await.unwrap();
    fixture.orchestrator.cancel_sync(ProviderKind::Epic).await;

    let job = fixture.wait_terminal().await;
    assert_eq!(job.status, SyncStatus::Failed);
    assert_eq!(job.error.as_deref(), Some("cancelled"));
    assert_eq!(fixture.store.count(ProviderKind::Epic).await, 0);
}

#[tokio::test]
async fn auth_failure_is_reported_as_not_recoverable() {
    let (sink, mut queue) = ui_channel();
    let sink = Arc::new(sink);
    tokio::spawn(async move { while queue.run_next().await {} });

    let event_bus = EventBus::new(100);
    // No credential was ever stored, so the cycle fails before fetching.
    let session = Arc::new(AuthSession::new(
        ProviderKind::Epic,
        FakeBroker::new(),
        CredentialStore::new(MemorySecureStore::new()),
        RequestExecutor::new(sink.clone()),
        event_bus.clone(),
    ));
    let store = Arc::new(GameRecordStore::new(event_bus.clone()));
    let orchestrator = Arc::new(SyncOrchestrator::new(
        store.clone(),
        event_bus.clone(),
        sink,
    ));
    orchestrator
        .register_provider(
            ProviderRegistration {
                scanner: Arc::new(FakeScanner::default()),
                catalog: Arc::new(FakeCatalog::returning(vec![owned("x", "Game X")])),
                metadata: None,
            },
            session,
        )
        .await;
    let mut events = event_bus.subscribe();

    orchestrator.start_sync(ProviderKind::Epic).await.unwrap();

    let mut reported = None;
    while let Ok(Ok(event)) =
        tokio::time::timeout(Duration::from_millis(500), events.recv()).await
    {
        if let CoreEvent::Sync(SyncEvent::Failed { recoverable, .. }) = event {
            reported = Some(recoverable);
            break;
        }
    }
    // Retrying without signing in again cannot succeed.
    assert_eq!(reported, Some(false));
    assert_eq!(store.count(ProviderKind::Epic).await, 0);
}

#[tokio::test]
async fn cycle_started_after_a_completed_one_is_still_cancellable() {
    let hold = Arc::new(Notify::new());
    let catalog = FakeCatalog {
        hold: Some(hold.clone()),
        ..FakeCatalog::returning(vec![owned("x", "Game X")])
    };
    let fixture = Fixture::new(FakeScanner::default(), catalog, None).await;

    let first = fixture.orchestrator.start_sync(ProviderKind::Epic).await.unwrap();
    hold.notify_one();
    let job = fixture.wait_terminal().await;
    assert_eq!(job.id, first);
    assert_eq!(job.status, SyncStatus::Succeeded);

    // The finished cycle's cleanup must not have swept away the new
    // cycle's cancellation token.
    let second = fixture.orchestrator.start_sync(ProviderKind::Epic).await.unwrap();
    assert_ne!(first, second);
    fixture.orchestrator.cancel_sync(ProviderKind::Epic).await;

    let job = fixture.wait_terminal().await;
    assert_eq!(job.id, second);
    assert_eq!(job.status, SyncStatus::Failed);
    assert_eq!(job.error.as_deref(), Some("cancelled"));
    assert_eq!(fixture.store.count(ProviderKind::Epic).await, 1);
}

#[tokio::test]
async fn completed_cycle_kicks_off_enrichment() {
    let enriched = Arc::new(AtomicBool::new(false));
    let fixture = Fixture::new(
        FakeScanner::default(),
        FakeCatalog::returning(vec![owned("x", "Game X")]),
        Some(Arc::new(FakeMetadata {
            enriched: enriched.clone(),
        })),
    )
    .await;

    fixture.orchestrator.start_sync(ProviderKind::Epic).await.unwrap();
    fixture.wait_terminal().await;

    for _ in 0..200 {
        if enriched.load(Ordering::SeqCst) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let record = fixture
        .store
        .get(ProviderKind::Epic, &"x".into())
        .await
        .unwrap();
    assert_eq!(record.metadata.developer, "Test Studio");
}

#[tokio::test]
async fn sync_events_reach_bus_subscribers() {
    let fixture = Fixture::new(
        FakeScanner::default(),
        FakeCatalog::returning(vec![owned("x", "Game X")]),
        None,
    )
    .await;
    let mut events = fixture.event_bus.subscribe();

    fixture.orchestrator.start_sync(ProviderKind::Epic).await.unwrap();
    fixture.wait_terminal().await;

    let mut saw_started = false;
    let mut saw_completed = false;
    while let Ok(Ok(event)) =
        tokio::time::timeout(Duration::from_millis(500), events.recv()).await
    {
        match event {
            CoreEvent::Sync(SyncEvent::Started { .. }) => saw_started = true,
            CoreEvent::Sync(SyncEvent::Completed { added, .. }) => {
                assert_eq!(added, 1);
                saw_completed = true;
                break;
            }
            _ => {}
        }
    }
    assert!(saw_started);
    assert!(saw_completed);
}
