//! Garmin Connect egress connector

use crate::{
    EgressError, Result,
    client::{HttpClientConfig, create_client},
    token::{OAuthToken, TokenResponse},
};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use pulsegate_core::{CredentialBlob, UpstreamClient, UpstreamConnector};
use reqwest::{Client, StatusCode, Url, header};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};

const TOKEN_PATH: &[&str] = &["oauth-service", "oauth", "token"];
const PROFILE_PATH: &[&str] = &["userprofile-service", "socialProfile"];

/// Garmin Connect connector configuration
#[derive(Debug, Clone)]
pub struct GarminConfig {
    /// Base URL for the Connect API (default: https://connectapi.garmin.com)
    pub base_url: String,

    /// Page size used when listing activities
    pub activities_page_size: u32,

    /// Upper bound on activity pages fetched for one query
    pub max_activity_pages: u32,

    /// HTTP client configuration
    pub client_config: HttpClientConfig,
}

impl Default for GarminConfig {
    fn default() -> Self {
        Self {
            base_url: "https://connectapi.garmin.com".to_string(),
            activities_page_size: 20,
            max_activity_pages: 250,
            client_config: HttpClientConfig::default(),
        }
    }
}

impl GarminConfig {
    /// Set the base URL (for custom endpoints and tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Connector that logs in and resumes Garmin Connect sessions
pub struct GarminConnector {
    config: GarminConfig,
    client: Client,
}

impl GarminConnector {
    /// Create a new Garmin connector
    pub fn new(config: GarminConfig) -> Result<Self> {
        let client = create_client(&config.client_config)?;
        Url::parse(&config.base_url).map_err(|e| {
            EgressError::ConfigError(format!("Invalid base URL '{}': {}", config.base_url, e))
        })?;
        Ok(Self { config, client })
    }

    async fn exchange(&self, form: &[(&str, &str)]) -> Result<OAuthToken> {
        let url = endpoint(&self.config.base_url, TOKEN_PATH, &[])?;
        let body = serde_urlencoded::to_string(form)
            .map_err(|e| EgressError::ConfigError(format!("Failed to encode form: {}", e)))?;

        let response = self
            .client
            .post(url)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(header::ACCEPT, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error body".to_string());
            warn!("Token exchange failed with status {}", status);
            return Err(match status {
                StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    EgressError::Unauthorized(message)
                }
                _ => EgressError::ProviderError {
                    status_code: status.as_u16(),
                    message,
                },
            });
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| EgressError::ParseError(format!("Invalid token response: {}", e)))?;

        Ok(OAuthToken::from_response(token, Utc::now().timestamp()))
    }
}

#[async_trait]
impl UpstreamConnector for GarminConnector {
    #[instrument(skip(self, email, password))]
    async fn login(&self, email: &str, password: &str) -> pulsegate_core::Result<CredentialBlob> {
        debug!("Exchanging account credentials for a token");

        let token = self
            .exchange(&[
                ("grant_type", "password"),
                ("username", email),
                ("password", password),
            ])
            .await?;

        info!("Upstream login succeeded");
        Ok(token.to_blob()?)
    }

    #[instrument(skip(self, state))]
    async fn resume(
        &self,
        state: CredentialBlob,
    ) -> pulsegate_core::Result<Box<dyn UpstreamClient>> {
        let mut token = OAuthToken::from_blob(&state)?;
        let mut refreshed = false;
        let now = Utc::now().timestamp();

        if token.is_expired_at(now) {
            let Some(refresh_token) = token.usable_refresh_token(now).map(str::to_string) else {
                return Err(EgressError::TokenExpired.into());
            };

            debug!("Access token expired, refreshing");
            let mut renewed = self
                .exchange(&[
                    ("grant_type", "refresh_token"),
                    ("refresh_token", refresh_token.as_str()),
                ])
                .await?;

            // Some token endpoints rotate the refresh token, others omit it
            if renewed.refresh_token.is_none() {
                renewed.refresh_token = Some(refresh_token);
                renewed.refresh_token_expires_at = token.refresh_token_expires_at;
            }
            token = renewed;
            refreshed = true;
        }

        Ok(Box::new(GarminClient {
            http: self.client.clone(),
            base_url: self.config.base_url.clone(),
            page_size: self.config.activities_page_size.max(1),
            max_pages: self.config.max_activity_pages.max(1),
            token,
            refreshed,
            profile: OnceCell::new(),
        }))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SocialProfile {
    display_name: Option<String>,
    full_name: Option<String>,
}

/// Authenticated Garmin Connect client for one request
struct GarminClient {
    http: Client,
    base_url: String,
    page_size: u32,
    max_pages: u32,
    token: OAuthToken,
    refreshed: bool,
    profile: OnceCell<SocialProfile>,
}

impl GarminClient {
    async fn get_json(&self, segments: &[&str], query: &[(&str, String)]) -> Result<Value> {
        let url = endpoint(&self.base_url, segments, query)?;
        debug!("GET {}", url.path());

        let response = self
            .http
            .get(url)
            .bearer_auth(&self.token.access_token)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            return Ok(Value::Null);
        }

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error body".to_string());
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    EgressError::Unauthorized(message)
                }
                _ => EgressError::ProviderError {
                    status_code: status.as_u16(),
                    message,
                },
            });
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| {
            EgressError::ParseError(format!("{} returned invalid JSON: {}", segments.join("/"), e))
        })
    }

    async fn profile(&self) -> Result<&SocialProfile> {
        self.profile
            .get_or_try_init(|| async {
                let value = self.get_json(PROFILE_PATH, &[]).await?;
                serde_json::from_value::<SocialProfile>(value)
                    .map_err(|e| EgressError::ParseError(format!("Invalid profile: {}", e)))
            })
            .await
    }

    /// Many wellness endpoints are addressed by the account's display name
    async fn display_name(&self) -> Result<String> {
        self.profile()
            .await?
            .display_name
            .clone()
            .ok_or_else(|| EgressError::ParseError("Profile has no displayName".to_string()))
    }
}

#[async_trait]
impl UpstreamClient for GarminClient {
    #[instrument(skip(self))]
    async fn full_name(&self) -> pulsegate_core::Result<Option<String>> {
        Ok(self.profile().await?.full_name.clone())
    }

    #[instrument(skip(self))]
    async fn sleep_data(&self, date: NaiveDate) -> pulsegate_core::Result<Value> {
        let display_name = self.display_name().await?;
        Ok(self
            .get_json(
                &["wellness-service", "wellness", "dailySleepData", &display_name],
                &[
                    ("date", date.to_string()),
                    ("nonSleepBufferMinutes", "60".to_string()),
                ],
            )
            .await?)
    }

    #[instrument(skip(self))]
    async fn user_summary(&self, date: NaiveDate) -> pulsegate_core::Result<Value> {
        let display_name = self.display_name().await?;
        Ok(self
            .get_json(
                &["usersummary-service", "usersummary", "daily", &display_name],
                &[("calendarDate", date.to_string())],
            )
            .await?)
    }

    #[instrument(skip(self))]
    async fn stress_data(&self, date: NaiveDate) -> pulsegate_core::Result<Value> {
        Ok(self
            .get_json(
                &["wellness-service", "wellness", "dailyStress", &date.to_string()],
                &[],
            )
            .await?)
    }

    #[instrument(skip(self))]
    async fn body_battery(&self, date: NaiveDate) -> pulsegate_core::Result<Value> {
        Ok(self
            .get_json(
                &["wellness-service", "wellness", "bodyBattery", "reports", "daily"],
                &[("startDate", date.to_string()), ("endDate", date.to_string())],
            )
            .await?)
    }

    #[instrument(skip(self))]
    async fn heart_rates(&self, date: NaiveDate) -> pulsegate_core::Result<Value> {
        let display_name = self.display_name().await?;
        Ok(self
            .get_json(
                &["wellness-service", "wellness", "dailyHeartRate", &display_name],
                &[("date", date.to_string())],
            )
            .await?)
    }

    #[instrument(skip(self))]
    async fn spo2_data(&self, date: NaiveDate) -> pulsegate_core::Result<Value> {
        Ok(self
            .get_json(
                &["wellness-service", "wellness", "daily", "spo2", &date.to_string()],
                &[],
            )
            .await?)
    }

    #[instrument(skip(self))]
    async fn activities_by_date(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> pulsegate_core::Result<Value> {
        let mut activities = Vec::new();
        let mut offset: u32 = 0;

        for page_number in 1..=self.max_pages {
            let page = self
                .get_json(
                    &["activitylist-service", "activities", "search", "activities"],
                    &[
                        ("startDate", start.to_string()),
                        ("endDate", end.to_string()),
                        ("start", offset.to_string()),
                        ("limit", self.page_size.to_string()),
                    ],
                )
                .await?;

            let page = match page {
                Value::Array(items) => items,
                Value::Null => Vec::new(),
                other => {
                    return Err(pulsegate_core::Error::MalformedResponse(format!(
                        "activity search returned {} instead of a list",
                        json_kind(&other)
                    )));
                }
            };

            let fetched = page.len();
            activities.extend(page);
            if fetched < self.page_size as usize {
                break;
            }
            if page_number == self.max_pages {
                warn!(
                    "Activity listing stopped after {} pages ({} activities)",
                    self.max_pages,
                    activities.len()
                );
                break;
            }
            match offset.checked_add(self.page_size) {
                Some(next) => offset = next,
                None => {
                    warn!("Activity listing offset overflow after {} activities", activities.len());
                    break;
                }
            }
        }

        debug!("Fetched {} activities", activities.len());
        Ok(Value::Array(activities))
    }

    fn refreshed_state(&self) -> Option<CredentialBlob> {
        if !self.refreshed {
            return None;
        }
        match self.token.to_blob() {
            Ok(blob) => Some(blob),
            Err(e) => {
                warn!("Failed to serialize refreshed token: {}", e);
                None
            }
        }
    }
}

/// Build an endpoint URL, percent-encoding each path segment
fn endpoint(base_url: &str, segments: &[&str], query: &[(&str, String)]) -> Result<Url> {
    let mut url = Url::parse(base_url)
        .map_err(|e| EgressError::ConfigError(format!("Invalid base URL '{}': {}", base_url, e)))?;

    url.path_segments_mut()
        .map_err(|_| {
            EgressError::ConfigError(format!("Base URL '{}' cannot have a path", base_url))
        })?
        .pop_if_empty()
        .extend(segments);

    if !query.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in query {
            pairs.append_pair(key, value);
        }
    }

    Ok(url)
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
