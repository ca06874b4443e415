use thiserror::Error;

/// Failures a provider plugin can surface to the orchestrator.
///
/// `Unauthorized` is separated from the generic variants because the
/// orchestrator reacts to it (one token refresh, one retry) instead of
/// failing the job outright.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider rejected the access token")]
    Unauthorized,

    #[error("Provider request failed: {0}")]
    Request(#[from] bridge_traits::error::BridgeError),

    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("Scan failed: {0}")]
    Scan(String),
}

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Sync job {job_id} not found")]
    JobNotFound { job_id: String },

    #[error("No provider registered for {provider}")]
    ProviderNotRegistered { provider: String },

    #[error("Authentication error: {0}")]
    Auth(#[from] core_auth::AuthError),

    #[error("Catalog fetch failed: {0}")]
    Fetch(String),

    #[error("Sync timeout after {0} seconds")]
    Timeout(u64),

    #[error("Sync cancelled")]
    Cancelled,

    #[error("Invalid job ID: {0}")]
    InvalidJobId(String),
}

pub type Result<T> = std::result::Result<T, SyncError>;
