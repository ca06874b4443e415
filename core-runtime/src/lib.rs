//! # Core Runtime
//!
//! Shared runtime services for the game library core:
//!
//! - [`events`] - typed event bus connecting core modules to the host UI
//! - [`executor`] - bounded background request execution with UI-thread
//!   completion delivery
//! - [`logging`] - `tracing` subscriber bootstrap
//! - [`config`] - host capability container with fail-fast validation

pub mod config;
pub mod error;
pub mod events;
pub mod executor;
pub mod logging;

pub use config::CoreConfig;
pub use error::{Error, Result};
pub use events::{AuthEvent, CoreEvent, EventBus, LibraryEvent, SyncEvent};
pub use executor::{ExecutorError, RequestExecutor};
pub use logging::{init_logging, LogFormat, LoggingConfig};
