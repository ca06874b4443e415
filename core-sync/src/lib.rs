//! # Sync Module
//!
//! Orchestrates library synchronization between local game installs and
//! provider catalogs.
//!
//! ## Overview
//!
//! This module manages the lifecycle of sync jobs, including:
//! - Scanning local install manifests via an `InventoryScanner`
//! - Fetching the owned catalog via a `CatalogClient`
//! - Reconciling both snapshots into the canonical record set
//! - Backfilling metadata for new records via a `MetadataSource`
//! - Emitting progress events through the UI sink and event bus
//!
//! ## Components
//!
//! - **Sync Job** (`job`): Per-cycle bookkeeping with a small status machine
//! - **Provider Traits** (`provider`): The surface a storefront plugin implements
//! - **Reconciliation Engine** (`reconcile`): The three-way merge by key
//! - **Metadata Enricher** (`enrich`): Best-effort descriptive backfill
//! - **Sync Orchestrator** (`orchestrator`): Ties the cycle together,
//!   single-flight per provider

pub mod enrich;
pub mod error;
pub mod job;
pub mod orchestrator;
pub mod provider;
pub mod reconcile;

pub use enrich::MetadataEnricher;
pub use error::{ProviderError, Result, SyncError};
pub use job::{SyncJob, SyncJobId, SyncStatus};
pub use orchestrator::{ProviderRegistration, SyncOrchestrator};
pub use provider::{CatalogClient, InventoryScanner, MetadataSource};
pub use reconcile::{ReconcileOutcome, ReconciliationEngine};
