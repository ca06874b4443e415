//! # Event Bus System
//!
//! Event-driven communication between core modules and the host UI using
//! `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! - **Event Types**: strongly-typed enum hierarchies per domain
//! - **EventBus**: central broadcast channel for publishing events
//! - **Subscription**: every `subscribe()` call creates an independent
//!   receiver
//!
//! Sync and auth code emits events from background tasks, but the
//! orchestration layer marshals the emission itself onto the UI thread via
//! the `UiEventSink`, so GUI subscribers always observe events on their own
//! thread.
//!
//! ## Error Handling
//!
//! `tokio::sync::broadcast` produces two receive errors:
//!
//! - `RecvError::Lagged(n)`: the subscriber missed `n` events. Non-fatal;
//!   keep receiving.
//! - `RecvError::Closed`: all senders dropped; treat as shutdown.
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{EventBus, CoreEvent, SyncEvent};
//!
//! let event_bus = EventBus::new(100);
//! let mut subscriber = event_bus.subscribe();
//!
//! let event = CoreEvent::Sync(SyncEvent::Started {
//!     job_id: "7d2f".to_string(),
//!     provider: "epic".to_string(),
//! });
//! event_bus.emit(event).ok();
//! ```

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// Re-export commonly used types
pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// Subscribers that fall behind by more than this receive
/// `RecvError::Lagged`.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Authentication-related events
    Auth(AuthEvent),
    /// Sync-related events
    Sync(SyncEvent),
    /// Canonical library changes
    Library(LibraryEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Auth(e) => e.description(),
            CoreEvent::Sync(e) => e.description(),
            CoreEvent::Library(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Auth(AuthEvent::AuthError { .. }) => EventSeverity::Error,
            CoreEvent::Sync(SyncEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Auth(AuthEvent::SignedIn { .. }) => EventSeverity::Info,
            CoreEvent::Sync(SyncEvent::Completed { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Debug-level events (verbose)
    Debug,
    /// Informational events
    Info,
    /// Warning events
    Warning,
    /// Error events
    Error,
}

// ============================================================================
// Authentication Events
// ============================================================================

/// Events related to provider authentication.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum AuthEvent {
    /// Login flow started; the host should open the authorization URL.
    SigningIn {
        /// The provider being authenticated with (e.g. "epic").
        provider: String,
    },
    /// Code exchange completed and a credential is stored.
    SignedIn {
        /// The provider that was authenticated.
        provider: String,
        /// The provider account id from the credential.
        account_id: String,
    },
    /// Access token is being refreshed.
    TokenRefreshing {
        /// The provider whose token is being refreshed.
        provider: String,
    },
    /// Token refresh completed successfully.
    TokenRefreshed {
        /// The provider whose token was refreshed.
        provider: String,
        /// Timestamp when the new token expires (Unix epoch seconds).
        expires_at: i64,
    },
    /// Credential cleared; the provider requires a fresh login.
    SignedOut {
        /// The provider that was signed out.
        provider: String,
    },
    /// The session state machine moved to a new state.
    StateChanged {
        /// The provider whose session changed.
        provider: String,
        /// The new state, by name (e.g. "authenticated", "expired").
        state: String,
    },
    /// Authentication error occurred.
    AuthError {
        /// The provider if known.
        provider: Option<String>,
        /// Human-readable error message.
        message: String,
        /// Whether the error is recoverable (e.g. retry possible).
        recoverable: bool,
    },
}

impl AuthEvent {
    fn description(&self) -> &str {
        match self {
            AuthEvent::SigningIn { .. } => "Authentication in progress",
            AuthEvent::SignedIn { .. } => "Provider signed in",
            AuthEvent::TokenRefreshing { .. } => "Refreshing access token",
            AuthEvent::TokenRefreshed { .. } => "Token refreshed successfully",
            AuthEvent::SignedOut { .. } => "Provider signed out",
            AuthEvent::StateChanged { .. } => "Auth state changed",
            AuthEvent::AuthError { .. } => "Authentication error",
        }
    }
}

// ============================================================================
// Sync Events
// ============================================================================

/// Events related to library synchronization cycles.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SyncEvent {
    /// Sync cycle started for a provider.
    Started {
        /// Unique identifier for this sync job.
        job_id: String,
        /// The provider being synced.
        provider: String,
    },
    /// Sync cycle finished successfully.
    Completed {
        /// The sync job ID.
        job_id: String,
        /// The provider that was synced.
        provider: String,
        /// Number of new records created this cycle.
        added: u64,
        /// Number of existing records updated this cycle.
        updated: u64,
        /// Duration of the cycle in milliseconds.
        duration_ms: u64,
    },
    /// Sync cycle failed; the canonical record set is untouched.
    Failed {
        /// The sync job ID.
        job_id: String,
        /// The provider that failed.
        provider: String,
        /// Human-readable error message.
        message: String,
        /// Whether another sync attempt may succeed.
        recoverable: bool,
    },
    /// Sync cycle was cancelled before completion.
    Cancelled {
        /// The sync job ID.
        job_id: String,
        /// The provider whose cycle was cancelled.
        provider: String,
    },
}

impl SyncEvent {
    fn description(&self) -> &str {
        match self {
            SyncEvent::Started { .. } => "Sync started",
            SyncEvent::Completed { .. } => "Sync completed successfully",
            SyncEvent::Failed { .. } => "Sync failed",
            SyncEvent::Cancelled { .. } => "Sync cancelled",
        }
    }
}

// ============================================================================
// Library Events
// ============================================================================

/// Events related to canonical record changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum LibraryEvent {
    /// A record was created for a newly seen key.
    RecordAdded {
        /// The canonical key.
        key: String,
        /// The provider owning the record.
        provider: String,
        /// Display name at creation time.
        display_name: String,
    },
    /// Provider or enrichment fields changed on an existing record.
    RecordUpdated {
        /// The canonical key.
        key: String,
        /// The provider owning the record.
        provider: String,
    },
    /// A record was removed after an explicit ownership revocation.
    RecordRemoved {
        /// The canonical key.
        key: String,
        /// The provider owning the record.
        provider: String,
    },
}

impl LibraryEvent {
    fn description(&self) -> &str {
        match self {
            LibraryEvent::RecordAdded { .. } => "Record added to library",
            LibraryEvent::RecordUpdated { .. } => "Record updated",
            LibraryEvent::RecordRemoved { .. } => "Record removed from library",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Uses `tokio::sync::broadcast` internally, which provides:
/// - Multiple producers (clone the `EventBus`)
/// - Multiple consumers (each `subscribe()` creates a new receiver)
/// - Non-blocking sends (events are cloned for each subscriber)
/// - Lagging detection (slow subscribers get `RecvError::Lagged`)
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an
    /// error if there are no active subscribers.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber to receive events.
    ///
    /// Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}
