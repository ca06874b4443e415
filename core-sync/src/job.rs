//! # Sync Job State Machine
//!
//! Tracks the lifecycle of one library sync cycle.
//!
//! ## State Machine
//!
//! ```text
//! Idle → Running → Succeeded
//!            ↓
//!          Failed
//! ```
//!
//! A job is created `Running` when the orchestrator accepts a sync
//! request; `Idle` only appears in status queries for providers that
//! never synced. Cancellation is reported as `Failed` with a cancelled
//! error message, mirroring how the UI presents it.

use crate::{Result, SyncError};
use chrono::{DateTime, Utc};
use core_auth::ProviderKind;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a sync job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SyncJobId(Uuid);

impl SyncJobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self> {
        Ok(Self(
            Uuid::parse_str(s).map_err(|e| SyncError::InvalidJobId(e.to_string()))?,
        ))
    }
}

impl Default for SyncJobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SyncJobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The current status of a sync job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// No sync has run for this provider yet
    Idle,
    /// Job is currently running
    Running,
    /// Job completed and the library was committed
    Succeeded,
    /// Job failed; the library was left untouched
    Failed,
}

impl SyncStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SyncStatus::Succeeded | SyncStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Idle => "idle",
            SyncStatus::Running => "running",
            SyncStatus::Succeeded => "succeeded",
            SyncStatus::Failed => "failed",
        }
    }
}

/// One sync cycle's bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncJob {
    pub id: SyncJobId,
    pub provider: ProviderKind,
    pub status: SyncStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Records created this cycle
    pub added_count: usize,
    /// Records materially changed this cycle
    pub updated_count: usize,
    pub error: Option<String>,
}

impl SyncJob {
    /// Create a job already in the `Running` state.
    pub fn start(provider: ProviderKind) -> Self {
        Self {
            id: SyncJobId::new(),
            provider,
            status: SyncStatus::Running,
            started_at: Utc::now(),
            finished_at: None,
            added_count: 0,
            updated_count: 0,
            error: None,
        }
    }

    /// Placeholder returned from status queries before any sync ran.
    pub fn idle(provider: ProviderKind) -> Self {
        Self {
            id: SyncJobId::new(),
            provider,
            status: SyncStatus::Idle,
            started_at: Utc::now(),
            finished_at: None,
            added_count: 0,
            updated_count: 0,
            error: None,
        }
    }

    pub fn succeed(&mut self, added: usize, updated: usize) {
        self.status = SyncStatus::Succeeded;
        self.finished_at = Some(Utc::now());
        self.added_count = added;
        self.updated_count = updated;
        self.error = None;
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.status = SyncStatus::Failed;
        self.finished_at = Some(Utc::now());
        self.error = Some(message.into());
    }

    pub fn duration_ms(&self) -> u64 {
        let end = self.finished_at.unwrap_or_else(Utc::now);
        (end - self.started_at).num_milliseconds().max(0) as u64
    }
}
