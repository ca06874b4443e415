//! # Epic Provider
//!
//! The reference storefront plugin: Epic Games launcher and account
//! services.
//!
//! ## Overview
//!
//! This module provides:
//! - OAuth 2.0 authorization-code flow with PKCE against the Epic
//!   account service ([`EpicTokenBroker`])
//! - Install discovery from the launcher's `.item` manifest directory
//!   ([`EpicInventoryScanner`])
//! - Owned-catalog listing from the library service with cursor
//!   pagination ([`EpicCatalogClient`])
//! - Bulk catalog metadata for enrichment ([`EpicMetadataClient`])

pub mod broker;
pub mod catalog;
pub mod scanner;
pub mod types;

pub use broker::{EpicAuthConfig, EpicTokenBroker};
pub use catalog::{EpicCatalogClient, EpicMetadataClient};
pub use scanner::EpicInventoryScanner;
