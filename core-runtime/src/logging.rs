//! # Logging & Tracing Infrastructure
//!
//! Configures the `tracing-subscriber` stack for the core. Supports
//! pretty, compact, and JSON output with module-level env filtering.
//!
//! Credentials never reach the log stream: `core_auth::Credential` has a
//! redacting `Debug` implementation and auth code logs only metadata
//! (provider, expiry), never token values.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
//!
//! let config = LoggingConfig::default()
//!     .with_format(LogFormat::Pretty)
//!     .with_filter("core_sync=debug,info");
//! init_logging(config).expect("Failed to initialize logging");
//! ```

use crate::error::{Error, Result};
use std::sync::Once;
use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Output format for log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line human-readable output for development
    Pretty,
    /// Single-line output for terminals and CI
    Compact,
    /// Newline-delimited JSON for log aggregation
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Output format
    pub format: LogFormat,
    /// Env-filter directive string; `RUST_LOG` overrides it when set
    pub filter: String,
    /// Include span enter/exit events
    pub with_spans: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Compact,
            filter: "info".to_string(),
            with_spans: false,
        }
    }
}

impl LoggingConfig {
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    pub fn with_spans(mut self, enabled: bool) -> Self {
        self.with_spans = enabled;
        self
    }
}

/// Initialize the global tracing subscriber.
///
/// Safe to call more than once; subsequent calls are no-ops. Returns an
/// error only if the filter directive cannot be parsed.
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .map_err(|e| Error::Config(format!("Invalid log filter: {}", e)))?;

    let mut result = Ok(());
    INIT.call_once(|| {
        let span_events = if config.with_spans {
            fmt::format::FmtSpan::ENTER | fmt::format::FmtSpan::CLOSE
        } else {
            fmt::format::FmtSpan::NONE
        };

        let builder = fmt()
            .with_env_filter(filter)
            .with_span_events(span_events)
            .with_target(true);

        let install = match config.format {
            LogFormat::Pretty => builder.pretty().try_init(),
            LogFormat::Compact => builder.compact().try_init(),
            LogFormat::Json => builder.json().try_init(),
        };

        if let Err(e) = install {
            result = Err(Error::Config(format!(
                "Failed to install tracing subscriber: {}",
                e
            )));
        }
    });

    result
}
