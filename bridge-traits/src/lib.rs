//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host
//! application embedding the game library core.
//!
//! ## Overview
//!
//! This crate defines the contract between the core crates and the host
//! environment. Each trait represents a capability the core requires but
//! that is supplied from outside: the HTTP transport, the OS credential
//! vault, the raw filesystem/registry access used for installed-game
//! discovery, and the hand-off queue that reaches the single UI thread.
//!
//! ## Traits
//!
//! - [`HttpClient`](http::HttpClient) - async HTTP transport with retry policy
//! - [`SecureStore`](storage::SecureStore) - durable credential persistence
//! - [`FilesystemProbe`](probe::FilesystemProbe) - raw manifest access for inventory scans
//! - [`RegistryProbe`](probe::RegistryProbe) - key/value OS store access for inventory scans
//! - [`UiEventSink`](ui::UiEventSink) - thread-safe hand-off of continuations to the UI thread
//!
//! ## Fail-Fast Strategy
//!
//! The core fails fast with a descriptive error when a required capability
//! is missing instead of degrading silently. See `core_runtime::config`.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so they can be shared across
//! background tasks behind `Arc`.

pub mod error;
pub mod http;
pub mod probe;
pub mod storage;
pub mod ui;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use probe::{FilesystemProbe, RegistryProbe};
pub use storage::SecureStore;
pub use ui::{UiEventSink, UiTask};
