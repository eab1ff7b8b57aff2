//! PulseGate Egress Connector
//!
//! This crate provides the connector to the upstream fitness account API
//! (Garmin Connect):
//! - HTTP client construction
//! - OAuth token state handling
//! - Data endpoint calls returning raw JSON

pub mod client;
pub mod garmin;
pub mod token;

pub use garmin::{GarminConfig, GarminConnector};

use thiserror::Error;

/// Egress error types
#[derive(Debug, Error)]
pub enum EgressError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Provider returned error: {status_code} - {message}")]
    ProviderError { status_code: u16, message: String },

    #[error("Authentication rejected: {0}")]
    Unauthorized(String),

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Stored token state is invalid: {0}")]
    InvalidTokenState(String),

    #[error("Token expired and cannot be refreshed")]
    TokenExpired,
}

impl From<EgressError> for pulsegate_core::Error {
    fn from(err: EgressError) -> Self {
        use pulsegate_core::Error;

        match err {
            EgressError::HttpError(e) => Error::Upstream(e.to_string()),
            EgressError::ProviderError {
                status_code,
                message,
            } => Error::UpstreamStatus {
                status_code,
                message,
            },
            EgressError::Unauthorized(msg) => Error::Unauthorized(msg),
            EgressError::ParseError(msg) => Error::MalformedResponse(msg),
            EgressError::ConfigError(msg) => Error::Config(msg),
            EgressError::InvalidTokenState(msg) => Error::CredentialStore(msg),
            EgressError::TokenExpired => Error::NotAuthenticated,
        }
    }
}

pub type Result<T> = std::result::Result<T, EgressError>;
