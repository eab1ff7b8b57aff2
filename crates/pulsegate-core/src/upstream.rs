//! Upstream connector and client traits
//!
//! The upstream account provider speaks a loosely-typed JSON API. Clients hand
//! back raw `serde_json::Value` payloads; projection into the fixed schema
//! happens in the sync layer, never here.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;

use crate::{Result, credential_store::CredentialBlob};

/// Entry point that turns credentials into authenticated clients.
#[async_trait]
pub trait UpstreamConnector: Send + Sync {
    /// Log in with account credentials and return the token state to persist
    async fn login(&self, email: &str, password: &str) -> Result<CredentialBlob>;

    /// Rebuild an authenticated client from previously stored token state
    async fn resume(&self, state: CredentialBlob) -> Result<Box<dyn UpstreamClient>>;
}

/// Authenticated client bound to one account for the duration of a request.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    /// Account holder's display name; only used as a liveness probe
    async fn full_name(&self) -> Result<Option<String>>;

    async fn sleep_data(&self, date: NaiveDate) -> Result<Value>;

    async fn user_summary(&self, date: NaiveDate) -> Result<Value>;

    async fn stress_data(&self, date: NaiveDate) -> Result<Value>;

    async fn body_battery(&self, date: NaiveDate) -> Result<Value>;

    async fn heart_rates(&self, date: NaiveDate) -> Result<Value>;

    async fn spo2_data(&self, date: NaiveDate) -> Result<Value>;

    /// All activities whose start falls within `[start, end]`
    async fn activities_by_date(&self, start: NaiveDate, end: NaiveDate) -> Result<Value>;

    /// Token state to write back when resuming refreshed the credentials
    fn refreshed_state(&self) -> Option<CredentialBlob> {
        None
    }
}
