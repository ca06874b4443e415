//! # Desktop Bridge Implementations
//!
//! Concrete implementations of the `bridge-traits` capabilities for
//! desktop platforms (Linux, macOS, Windows):
//!
//! - [`ReqwestHttpClient`] - HTTP transport with retry/backoff
//! - [`KeyringSecureStore`] - OS vault credential storage
//! - [`StdFilesystemProbe`] - tokio-fs inventory probe
//! - [`ChannelEventSink`] / [`UiTaskQueue`] - UI thread hand-off queue

pub mod http;
pub mod probe;
#[cfg(feature = "secure-store")]
pub mod secure_store;
pub mod ui;

pub use http::ReqwestHttpClient;
pub use probe::StdFilesystemProbe;
#[cfg(feature = "secure-store")]
pub use secure_store::KeyringSecureStore;
pub use ui::{ui_channel, ChannelEventSink, UiTaskQueue};
