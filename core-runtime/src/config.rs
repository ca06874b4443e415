//! # Core Configuration
//!
//! Capability container handed to the core at startup. Hosts inject the
//! bridge implementations explicitly; there are no process-wide manager
//! singletons. Missing capabilities fail fast with a descriptive error
//! instead of degrading silently.

use crate::error::{Error, Result};
use bridge_traits::{http::HttpClient, probe::FilesystemProbe, storage::SecureStore, ui::UiEventSink};
use std::sync::Arc;
use std::time::Duration;

/// Tunables that apply across providers.
#[derive(Debug, Clone)]
pub struct CoreSettings {
    /// Buffer size for the event bus channel
    pub event_buffer: usize,
    /// Timeout for a single token exchange or refresh call
    pub auth_timeout: Duration,
    /// Timeout for a full catalog fetch (all pages)
    pub fetch_timeout: Duration,
    /// Timeout for one enrichment batch call
    pub enrich_timeout: Duration,
    /// Number of keys per enrichment batch request
    pub enrich_batch_size: usize,
}

impl Default for CoreSettings {
    fn default() -> Self {
        Self {
            event_buffer: 100,
            auth_timeout: Duration::from_secs(120),
            fetch_timeout: Duration::from_secs(300),
            enrich_timeout: Duration::from_secs(60),
            enrich_batch_size: 25,
        }
    }
}

/// Host capabilities plus settings, validated before the core starts.
#[derive(Default)]
pub struct CoreConfig {
    pub http_client: Option<Arc<dyn HttpClient>>,
    pub secure_store: Option<Arc<dyn SecureStore>>,
    pub filesystem_probe: Option<Arc<dyn FilesystemProbe>>,
    pub ui_sink: Option<Arc<dyn UiEventSink>>,
    pub settings: CoreSettings,
}

impl CoreConfig {
    pub fn new() -> Self {
        Self {
            settings: CoreSettings::default(),
            ..Default::default()
        }
    }

    pub fn with_http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn with_secure_store(mut self, store: Arc<dyn SecureStore>) -> Self {
        self.secure_store = Some(store);
        self
    }

    pub fn with_filesystem_probe(mut self, probe: Arc<dyn FilesystemProbe>) -> Self {
        self.filesystem_probe = Some(probe);
        self
    }

    pub fn with_ui_sink(mut self, sink: Arc<dyn UiEventSink>) -> Self {
        self.ui_sink = Some(sink);
        self
    }

    pub fn with_settings(mut self, settings: CoreSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Validate that every required capability is present.
    pub fn require_http_client(&self) -> Result<Arc<dyn HttpClient>> {
        self.http_client
            .clone()
            .ok_or_else(|| missing("HttpClient", "inject a transport (e.g. bridge-desktop)"))
    }

    pub fn require_secure_store(&self) -> Result<Arc<dyn SecureStore>> {
        self.secure_store
            .clone()
            .ok_or_else(|| missing("SecureStore", "inject a credential vault adapter"))
    }

    pub fn require_filesystem_probe(&self) -> Result<Arc<dyn FilesystemProbe>> {
        self.filesystem_probe
            .clone()
            .ok_or_else(|| missing("FilesystemProbe", "inject a filesystem probe"))
    }

    pub fn require_ui_sink(&self) -> Result<Arc<dyn UiEventSink>> {
        self.ui_sink
            .clone()
            .ok_or_else(|| missing("UiEventSink", "inject the UI hand-off queue"))
    }
}

fn missing(capability: &str, message: &str) -> Error {
    Error::CapabilityMissing {
        capability: capability.to_string(),
        message: message.to_string(),
    }
}
