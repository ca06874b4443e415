use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Provider {provider} authentication failed: {reason}")]
    AuthenticationFailed { provider: String, reason: String },

    #[error("Token refresh failed: {0}")]
    TokenRefreshFailed(String),

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("No login in progress for provider {0}")]
    NoLoginInProgress(String),

    #[error("Credential storage failed: {0}")]
    Storage(String),

    #[error("Credential serialization failed: {0}")]
    Serialization(String),

    #[error("{operation} timed out")]
    OperationTimeout { operation: String },

    #[error("Invalid authorize URL: {0}")]
    InvalidUrl(String),
}

pub type Result<T> = std::result::Result<T, AuthError>;
