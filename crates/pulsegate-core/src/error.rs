//! Error types for PulseGate Core

use thiserror::Error;

/// Message shown to callers whose credential location does not exist.
pub const NOT_AUTHENTICATED_MESSAGE: &str = "Not authenticated. Please authenticate first.";

#[derive(Debug, Error)]
pub enum Error {
    #[error("{}", NOT_AUTHENTICATED_MESSAGE)]
    NotAuthenticated,

    #[error("Invalid user id: {0}")]
    InvalidUser(String),

    #[error("Invalid date '{0}': expected YYYY-MM-DD")]
    InvalidDate(String),

    // Upstream errors
    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Upstream returned {status_code}: {message}")]
    UpstreamStatus { status_code: u16, message: String },

    #[error("Upstream rejected credentials: {0}")]
    Unauthorized(String),

    #[error("Malformed upstream response: {0}")]
    MalformedResponse(String),

    // Credential store errors
    #[error("Credential store error: {0}")]
    CredentialStore(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
