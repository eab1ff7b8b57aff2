//! In-memory upstream doubles for unit tests

use async_trait::async_trait;
use chrono::NaiveDate;
use pulsegate_core::{CredentialBlob, Error, Result, UpstreamClient, UpstreamConnector};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

#[derive(Default)]
pub(crate) struct FakeClient {
    responses: HashMap<&'static str, Value>,
    failing: HashSet<&'static str>,
    fail_all: Option<String>,
    refreshed: Option<CredentialBlob>,
    calls: Mutex<HashMap<&'static str, usize>>,
}

impl FakeClient {
    /// Client whose every call fails with `message`
    pub(crate) fn failing(message: &str) -> Self {
        Self {
            fail_all: Some(message.to_string()),
            ..Default::default()
        }
    }

    pub(crate) fn with(mut self, call: &'static str, value: Value) -> Self {
        self.responses.insert(call, value);
        self
    }

    pub(crate) fn with_heart_rates(self, value: Value) -> Self {
        self.with("heart_rates", value)
    }

    pub(crate) fn with_spo2(self, value: Value) -> Self {
        self.with("spo2_data", value)
    }

    pub(crate) fn failing_on(mut self, call: &'static str) -> Self {
        self.failing.insert(call);
        self
    }

    pub(crate) fn with_refreshed(mut self, blob: CredentialBlob) -> Self {
        self.refreshed = Some(blob);
        self
    }

    pub(crate) fn calls(&self, call: &str) -> usize {
        self.calls.lock().unwrap().get(call).copied().unwrap_or(0)
    }

    fn respond(&self, call: &'static str) -> Result<Value> {
        *self.calls.lock().unwrap().entry(call).or_default() += 1;

        if let Some(message) = &self.fail_all {
            return Err(Error::Upstream(message.clone()));
        }
        if self.failing.contains(call) {
            return Err(Error::Upstream(format!("{} failed", call)));
        }
        Ok(self.responses.get(call).cloned().unwrap_or(Value::Null))
    }
}

#[async_trait]
impl UpstreamClient for FakeClient {
    async fn full_name(&self) -> Result<Option<String>> {
        self.respond("full_name")?;
        Ok(Some("Jane Runner".to_string()))
    }

    async fn sleep_data(&self, _date: NaiveDate) -> Result<Value> {
        self.respond("sleep_data")
    }

    async fn user_summary(&self, _date: NaiveDate) -> Result<Value> {
        self.respond("user_summary")
    }

    async fn stress_data(&self, _date: NaiveDate) -> Result<Value> {
        self.respond("stress_data")
    }

    async fn body_battery(&self, _date: NaiveDate) -> Result<Value> {
        self.respond("body_battery")
    }

    async fn heart_rates(&self, _date: NaiveDate) -> Result<Value> {
        self.respond("heart_rates")
    }

    async fn spo2_data(&self, _date: NaiveDate) -> Result<Value> {
        self.respond("spo2_data")
    }

    async fn activities_by_date(&self, _start: NaiveDate, _end: NaiveDate) -> Result<Value> {
        self.respond("activities_by_date")
    }

    fn refreshed_state(&self) -> Option<CredentialBlob> {
        self.refreshed.clone()
    }
}

type ClientFactory = Arc<dyn Fn() -> FakeClient + Send + Sync>;

/// Connector that accepts one password and hands out `FakeClient`s
pub(crate) struct FakeConnector {
    password: String,
    factory: ClientFactory,
    pub(crate) resumed: Mutex<Vec<CredentialBlob>>,
}

impl FakeConnector {
    pub(crate) fn new(
        password: &str,
        factory: impl Fn() -> FakeClient + Send + Sync + 'static,
    ) -> Self {
        Self {
            password: password.to_string(),
            factory: Arc::new(factory),
            resumed: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl UpstreamConnector for FakeConnector {
    async fn login(&self, email: &str, password: &str) -> Result<CredentialBlob> {
        if password != self.password {
            return Err(Error::Unauthorized("Invalid username or password".to_string()));
        }
        Ok(CredentialBlob::new(format!(r#"{{"account":"{}"}}"#, email)))
    }

    async fn resume(&self, state: CredentialBlob) -> Result<Box<dyn UpstreamClient>> {
        self.resumed.lock().unwrap().push(state);
        Ok(Box::new((self.factory)()))
    }
}
