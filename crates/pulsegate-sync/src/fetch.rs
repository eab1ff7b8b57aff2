//! Per-metric fetchers
//!
//! Each fetcher resolves a session, makes exactly one upstream call and
//! projects the payload. The free functions take an existing client so the
//! range aggregator can reuse one session for every day.

use chrono::NaiveDate;
use pulsegate_core::schema::{
    ActivitiesByDate, ActivityRecord, ActivitySummary, BodyBatterySample, HeartRateSummary,
    SleepSummary, StressSummary,
};
use pulsegate_core::{Error, Result, UpstreamClient};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::session::{AuthOutcome, AuthStatus, SessionResolver};
use crate::{enrich, parse_date, projection};

/// Sleep summary with heart rate and SpO2 enrichment applied
pub async fn sleep(client: &dyn UpstreamClient, date: NaiveDate) -> Result<SleepSummary> {
    let raw = client.sleep_data(date).await?;
    let mut summary = projection::sleep(&raw);
    enrich::enrich_sleep(client, date, &mut summary).await;
    Ok(summary)
}

pub async fn activity_summary(
    client: &dyn UpstreamClient,
    date: NaiveDate,
) -> Result<ActivitySummary> {
    let raw = client.user_summary(date).await?;
    Ok(projection::activity_summary(&raw))
}

pub async fn stress(client: &dyn UpstreamClient, date: NaiveDate) -> Result<StressSummary> {
    let raw = client.stress_data(date).await?;
    Ok(projection::stress(&raw))
}

pub async fn body_battery(
    client: &dyn UpstreamClient,
    date: NaiveDate,
) -> Result<Vec<BodyBatterySample>> {
    let raw = client.body_battery(date).await?;
    Ok(projection::body_battery(&raw))
}

pub async fn heart_rate(client: &dyn UpstreamClient, date: NaiveDate) -> Result<HeartRateSummary> {
    let raw = client.heart_rates(date).await?;
    Ok(projection::heart_rate(&raw))
}

fn activity_list(raw: Value) -> Result<Vec<Value>> {
    match raw {
        Value::Array(items) => Ok(items),
        Value::Null => Ok(Vec::new()),
        _ => Err(Error::MalformedResponse(
            "activity list is not an array".to_string(),
        )),
    }
}

/// Activities on a single day
pub async fn activities(
    client: &dyn UpstreamClient,
    date: NaiveDate,
) -> Result<Vec<ActivityRecord>> {
    let raw = client.activities_by_date(date, date).await?;
    Ok(activity_list(raw)?
        .iter()
        .filter(|a| a.is_object())
        .map(projection::activity)
        .collect())
}

/// Activities in `[start, end]` grouped by the local date they started on
pub async fn activities_batch(
    client: &dyn UpstreamClient,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<ActivitiesByDate> {
    let raw = client.activities_by_date(start, end).await?;
    Ok(group_by_local_date(&activity_list(raw)?))
}

/// Group activities by the date prefix of `startTimeLocal`
/// (`"2024-03-05 07:00:00"` → `"2024-03-05"`). Activities without a
/// parseable date are dropped.
pub fn group_by_local_date(activities: &[Value]) -> ActivitiesByDate {
    let mut grouped = ActivitiesByDate::new();

    for raw in activities.iter().filter(|a| a.is_object()) {
        let Some(date) = raw
            .get("startTimeLocal")
            .and_then(Value::as_str)
            .and_then(|s| s.split(' ').next())
            .and_then(|prefix| parse_date(prefix).ok())
        else {
            debug!("Dropping activity without a local start date");
            continue;
        };

        grouped
            .entry(date.to_string())
            .or_default()
            .push(projection::activity(raw));
    }

    grouped
}

/// Request-level entry points used by the HTTP and command surfaces
#[derive(Clone)]
pub struct SyncService {
    sessions: SessionResolver,
}

impl SyncService {
    pub fn new(sessions: SessionResolver) -> Self {
        Self { sessions }
    }

    pub fn sessions(&self) -> &SessionResolver {
        &self.sessions
    }

    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
        user_id: Option<&str>,
    ) -> AuthOutcome {
        self.sessions.authenticate(email, password, user_id).await
    }

    pub async fn check_auth(&self, user_id: Option<&str>) -> AuthStatus {
        self.sessions.check_auth(user_id).await
    }

    #[instrument(skip(self))]
    pub async fn sleep(&self, date: &str, user_id: Option<&str>) -> Result<SleepSummary> {
        let client = self.sessions.client(user_id).await?;
        sleep(client.as_ref(), parse_date(date)?).await
    }

    #[instrument(skip(self))]
    pub async fn activity_summary(
        &self,
        date: &str,
        user_id: Option<&str>,
    ) -> Result<ActivitySummary> {
        let client = self.sessions.client(user_id).await?;
        activity_summary(client.as_ref(), parse_date(date)?).await
    }

    #[instrument(skip(self))]
    pub async fn stress(&self, date: &str, user_id: Option<&str>) -> Result<StressSummary> {
        let client = self.sessions.client(user_id).await?;
        stress(client.as_ref(), parse_date(date)?).await
    }

    #[instrument(skip(self))]
    pub async fn body_battery(
        &self,
        date: &str,
        user_id: Option<&str>,
    ) -> Result<Vec<BodyBatterySample>> {
        let client = self.sessions.client(user_id).await?;
        body_battery(client.as_ref(), parse_date(date)?).await
    }

    #[instrument(skip(self))]
    pub async fn heart_rate(&self, date: &str, user_id: Option<&str>) -> Result<HeartRateSummary> {
        let client = self.sessions.client(user_id).await?;
        heart_rate(client.as_ref(), parse_date(date)?).await
    }

    #[instrument(skip(self))]
    pub async fn activities(
        &self,
        date: &str,
        user_id: Option<&str>,
    ) -> Result<Vec<ActivityRecord>> {
        let client = self.sessions.client(user_id).await?;
        activities(client.as_ref(), parse_date(date)?).await
    }

    #[instrument(skip(self))]
    pub async fn activities_batch(
        &self,
        start_date: &str,
        end_date: &str,
        user_id: Option<&str>,
    ) -> Result<ActivitiesByDate> {
        let client = self.sessions.client(user_id).await?;
        let start = parse_date(start_date)?;
        let end = parse_date(end_date)?;
        activities_batch(client.as_ref(), start, end).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeClient;
    use serde_json::{Number, json};

    fn day(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    #[tokio::test]
    async fn test_sleep_fetch_is_enriched() {
        let client = FakeClient::default()
            .with(
                "sleep_data",
                json!({ "dailySleepDTO": {
                    "sleepStartTimestampGMT": 1000,
                    "sleepEndTimestampGMT": 2000,
                    "averageSpO2Value": 91.0
                }}),
            )
            .with_heart_rates(json!({ "heartRateValues": [[1500, 64], [1600, 66]] }))
            .with_spo2(json!({ "averageSpO2": 95.0 }));

        let summary = sleep(&client, day("2024-01-05")).await.unwrap();
        assert_eq!(summary.avg_sleep_hr, Some(65));
        assert_eq!(summary.min_sleep_hr, Some(Number::from(64)));
        assert_eq!(summary.max_sleep_hr, Some(Number::from(66)));
        assert_eq!(summary.average_spo2_value, Number::from_f64(95.0));
    }

    #[tokio::test]
    async fn test_sleep_fetch_error_propagates() {
        let client = FakeClient::default().failing_on("sleep_data");
        assert!(sleep(&client, day("2024-01-05")).await.is_err());
        assert_eq!(client.calls("heart_rates"), 0);
    }

    #[tokio::test]
    async fn test_body_battery_null_payload_is_empty() {
        let client = FakeClient::default();
        assert!(
            body_battery(&client, day("2024-01-05"))
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_activities_single_day() {
        let client = FakeClient::default().with(
            "activities_by_date",
            json!([
                {
                    "activityId": 17,
                    "activityName": "Morning Run",
                    "activityType": { "typeKey": "running" },
                    "startTimeLocal": "2024-03-05 07:00:00",
                    "duration": 1800.5,
                    "ownerDisplayName": "runner42"
                },
                "junk"
            ]),
        );

        let records = activities(&client, day("2024-03-05")).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].activity_id, Some(Number::from(17)));
        assert_eq!(records[0].activity_type.as_deref(), Some("running"));
        assert_eq!(records[0].duration, Number::from_f64(1800.5));
    }

    #[tokio::test]
    async fn test_activities_non_array_is_malformed() {
        let client = FakeClient::default().with("activities_by_date", json!({ "oops": true }));
        assert!(matches!(
            activities(&client, day("2024-03-05")).await,
            Err(Error::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_group_by_local_date() {
        let raw = vec![
            json!({ "activityId": 1, "startTimeLocal": "2024-03-05 07:00:00" }),
            json!({ "activityId": 2, "startTimeLocal": "2024-03-06 18:30:00" }),
            json!({ "activityId": 3, "startTimeLocal": "2024-03-05 19:15:00" }),
            json!({ "activityId": 4, "startTimeLocal": "" }),
            json!({ "activityId": 5 }),
            json!({ "activityId": 6, "startTimeLocal": "sometime" }),
            json!({ "activityId": 7, "startTimeLocal": null }),
        ];

        let grouped = group_by_local_date(&raw);
        assert_eq!(grouped.keys().collect::<Vec<_>>(), vec!["2024-03-05", "2024-03-06"]);

        let ids: Vec<_> = grouped["2024-03-05"]
            .iter()
            .filter_map(|a| a.activity_id.as_ref().and_then(Number::as_i64))
            .collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(grouped["2024-03-06"].len(), 1);
    }

    #[tokio::test]
    async fn test_activities_batch_single_upstream_call() {
        let client = FakeClient::default().with(
            "activities_by_date",
            json!([{ "activityId": 1, "startTimeLocal": "2024-03-05 07:00:00" }]),
        );

        let grouped = activities_batch(&client, day("2024-03-01"), day("2024-03-31"))
            .await
            .unwrap();
        assert_eq!(grouped.len(), 1);
        assert_eq!(client.calls("activities_by_date"), 1);
    }
}
