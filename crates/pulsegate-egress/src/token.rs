//! OAuth token state
//!
//! The token is the only thing persisted per user. It round-trips through
//! `CredentialBlob` as JSON text.

use pulsegate_core::CredentialBlob;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{EgressError, Result};

/// Refresh this many seconds before the access token actually expires
const EXPIRY_SKEW_SECS: i64 = 60;

/// Lifetime assumed when the token endpoint omits `expires_in`
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthToken {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Unix seconds
    pub expires_at: i64,
    /// Unix seconds, `None` if the upstream did not say
    #[serde(default)]
    pub refresh_token_expires_at: Option<i64>,
}

impl fmt::Debug for OAuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthToken")
            .field("access_token", &"<redacted>")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Response body of the token endpoint
#[derive(Deserialize)]
pub(crate) struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token_expires_in: Option<i64>,
}

impl OAuthToken {
    pub(crate) fn from_response(response: TokenResponse, now: i64) -> Self {
        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            token_type: response.token_type.unwrap_or_else(default_token_type),
            expires_at: now + response.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS),
            refresh_token_expires_at: response.refresh_token_expires_in.map(|s| now + s),
        }
    }

    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at - EXPIRY_SKEW_SECS <= now
    }

    /// Refresh token that is still usable at `now`
    pub fn usable_refresh_token(&self, now: i64) -> Option<&str> {
        match self.refresh_token_expires_at {
            Some(expiry) if expiry <= now => None,
            _ => self.refresh_token.as_deref(),
        }
    }

    pub fn to_blob(&self) -> Result<CredentialBlob> {
        serde_json::to_string(self)
            .map(CredentialBlob::new)
            .map_err(|e| EgressError::InvalidTokenState(e.to_string()))
    }

    pub fn from_blob(blob: &CredentialBlob) -> Result<Self> {
        serde_json::from_str(blob.as_str())
            .map_err(|e| EgressError::InvalidTokenState(e.to_string()))
    }
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(expires_in: Option<i64>) -> TokenResponse {
        TokenResponse {
            access_token: "access-1".to_string(),
            refresh_token: Some("refresh-1".to_string()),
            token_type: None,
            expires_in,
            refresh_token_expires_in: Some(86_400),
        }
    }

    #[test]
    fn test_from_response_computes_absolute_expiry() {
        let token = OAuthToken::from_response(response(Some(600)), 1_000);
        assert_eq!(token.expires_at, 1_600);
        assert_eq!(token.refresh_token_expires_at, Some(87_400));
        assert_eq!(token.token_type, "Bearer");
    }

    #[test]
    fn test_missing_expires_in_defaults_to_one_hour() {
        let token = OAuthToken::from_response(response(None), 0);
        assert_eq!(token.expires_at, 3_600);
    }

    #[test]
    fn test_expiry_skew() {
        let token = OAuthToken::from_response(response(Some(600)), 1_000);
        assert!(!token.is_expired_at(1_000));
        assert!(!token.is_expired_at(1_539));
        assert!(token.is_expired_at(1_540));
    }

    #[test]
    fn test_refresh_token_expiry() {
        let token = OAuthToken::from_response(response(Some(600)), 0);
        assert_eq!(token.usable_refresh_token(100), Some("refresh-1"));
        assert_eq!(token.usable_refresh_token(86_400), None);
    }

    #[test]
    fn test_blob_roundtrip_and_debug_redaction() {
        let token = OAuthToken::from_response(response(Some(600)), 0);
        let blob = token.to_blob().unwrap();
        assert_eq!(OAuthToken::from_blob(&blob).unwrap(), token);
        assert!(!format!("{:?}", token).contains("access-1"));
    }

    #[test]
    fn test_from_blob_rejects_garbage() {
        let result = OAuthToken::from_blob(&CredentialBlob::new("not json"));
        assert!(matches!(result, Err(EgressError::InvalidTokenState(_))));
    }
}
