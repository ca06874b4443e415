//! # Library Management Module
//!
//! Owns the canonical game library and its mutation rules.
//!
//! ## Overview
//!
//! This module manages:
//! - The domain models: installed snapshots, catalog snapshots, and the
//!   canonical [`GameRecord`]
//! - The in-memory record store with all-or-nothing sync commits
//! - User-owned fields (favorites, hidden flags, play history) that no
//!   sync cycle may touch
//! - Enrichment metadata application with non-empty-overwrite rules

pub mod error;
pub mod models;
pub mod store;

pub use error::{LibraryError, Result};
pub use models::{CatalogEntry, GameKey, GameMetadata, GameRecord, InstalledEntry, UserFields};
pub use store::{CommitSummary, GameRecordStore};
