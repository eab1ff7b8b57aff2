//! Depersonalized output schema
//!
//! Every struct here serializes all of its declared keys, using `null` for
//! values the upstream payload did not provide. Numbers keep the exact value
//! the upstream sent, integral or not. Only the sleep enrichment keys are
//! omitted when they could not be computed.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::collections::BTreeMap;

/// Upstream scalar whose JSON type varies between payloads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Integer(i64),
    Decimal(f64),
    Text(String),
}

/// Nightly sleep summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepSummary {
    pub calendar_date: Option<String>,
    pub sleep_time_seconds: Option<Number>,
    pub deep_sleep_seconds: Option<Number>,
    pub light_sleep_seconds: Option<Number>,
    pub rem_sleep_seconds: Option<Number>,
    pub awake_sleep_seconds: Option<Number>,
    pub sleep_score: Option<Number>,
    #[serde(rename = "averageSpO2Value")]
    pub average_spo2_value: Option<Number>,
    pub average_respiration_value: Option<Number>,
    #[serde(rename = "sleepStartTimestampGMT")]
    pub sleep_start_timestamp_gmt: Option<Number>,
    #[serde(rename = "sleepEndTimestampGMT")]
    pub sleep_end_timestamp_gmt: Option<Number>,
    pub avg_sleep_stress: Option<Number>,

    // Heart rate during the sleep window, present only when computed
    #[serde(rename = "avgSleepHR", skip_serializing_if = "Option::is_none", default)]
    pub avg_sleep_hr: Option<i64>,
    #[serde(rename = "minSleepHR", skip_serializing_if = "Option::is_none", default)]
    pub min_sleep_hr: Option<Number>,
    #[serde(rename = "maxSleepHR", skip_serializing_if = "Option::is_none", default)]
    pub max_sleep_hr: Option<Number>,
}

/// Daily activity aggregates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySummary {
    pub calendar_date: Option<String>,
    pub total_steps: Option<Number>,
    pub total_distance_meters: Option<Number>,
    pub active_kilocalories: Option<Number>,
    pub total_kilocalories: Option<Number>,
    pub floors_ascended: Option<Number>,
    pub floors_descended: Option<Number>,
    pub intensity_minutes_goal: Option<Number>,
    pub moderate_intensity_minutes: Option<Number>,
    pub vigorous_intensity_minutes: Option<Number>,
    pub resting_heart_rate: Option<Number>,
    pub min_heart_rate: Option<Number>,
    pub max_heart_rate: Option<Number>,
    pub average_stress_level: Option<Number>,
    pub max_stress_level: Option<Number>,
    pub stress_duration: Option<Number>,
    pub rest_stress_duration: Option<Number>,
    pub activity_stress_duration: Option<Number>,
    pub low_stress_duration: Option<Number>,
    pub medium_stress_duration: Option<Number>,
    pub high_stress_duration: Option<Number>,
    pub body_battery_charged_value: Option<Number>,
    pub body_battery_drained_value: Option<Number>,
    pub body_battery_highest_value: Option<Number>,
    pub body_battery_lowest_value: Option<Number>,
    pub body_battery_most_recent_value: Option<Number>,
}

/// Daily stress breakdown
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StressSummary {
    pub calendar_date: Option<String>,
    pub overall_stress_level: Option<Number>,
    pub rest_stress_duration: Option<Number>,
    pub activity_stress_duration: Option<Number>,
    pub low_stress_duration: Option<Number>,
    pub medium_stress_duration: Option<Number>,
    pub high_stress_duration: Option<Number>,
    pub stress_qualifier: Option<String>,
}

/// One body battery reading
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BodyBatterySample {
    #[serde(rename = "startTimestampGMT")]
    pub start_timestamp_gmt: Option<Scalar>,
    #[serde(rename = "endTimestampGMT")]
    pub end_timestamp_gmt: Option<Scalar>,
    #[serde(rename = "bodyBatteryLevel")]
    pub level: Option<Scalar>,
    #[serde(rename = "bodyBatteryStatus")]
    pub status: Option<Scalar>,
}

/// Daily heart rate summary. `heartRateValues` is the upstream series as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartRateSummary {
    pub calendar_date: Option<String>,
    pub resting_heart_rate: Option<Number>,
    pub max_heart_rate: Option<Number>,
    pub min_heart_rate: Option<Number>,
    pub heart_rate_values: Option<Vec<Value>>,
}

/// One recorded activity (run, ride, ...)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    #[serde(rename = "activityId")]
    pub activity_id: Option<Number>,
    #[serde(rename = "activityName")]
    pub activity_name: Option<String>,
    #[serde(rename = "activityType")]
    pub activity_type: Option<String>,
    #[serde(rename = "startTimeLocal")]
    pub start_time_local: Option<String>,
    /// Seconds
    pub duration: Option<Number>,
    /// Meters
    pub distance: Option<Number>,
    pub calories: Option<Number>,
    #[serde(rename = "averageHR")]
    pub average_hr: Option<Number>,
    #[serde(rename = "maxHR")]
    pub max_hr: Option<Number>,
    /// Meters per second
    #[serde(rename = "averageSpeed")]
    pub average_speed: Option<Number>,
    #[serde(rename = "elevationGain")]
    pub elevation_gain: Option<Number>,
    pub steps: Option<Number>,
}

/// Activities grouped by local calendar date
pub type ActivitiesByDate = BTreeMap<String, Vec<ActivityRecord>>;

/// Every metric for one calendar date, each either data or an error string
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayBundle {
    pub sleep: Option<SleepSummary>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sleep_error: Option<String>,

    pub activity: Option<ActivitySummary>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub activity_error: Option<String>,

    pub stress: Option<StressSummary>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub stress_error: Option<String>,

    pub body_battery: Option<Vec<BodyBatterySample>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub body_battery_error: Option<String>,

    pub heart_rate: Option<HeartRateSummary>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub heart_rate_error: Option<String>,
}

impl DayBundle {
    /// Names (as serialized) of the metrics that failed for this day
    pub fn failed_metrics(&self) -> Vec<&'static str> {
        [
            ("sleep", &self.sleep_error),
            ("activity", &self.activity_error),
            ("stress", &self.stress_error),
            ("bodyBattery", &self.body_battery_error),
            ("heartRate", &self.heart_rate_error),
        ]
        .into_iter()
        .filter(|(_, error)| error.is_some())
        .map(|(name, _)| name)
        .collect()
    }

    /// Number of metrics that failed for this day
    pub fn error_count(&self) -> usize {
        self.failed_metrics().len()
    }
}

/// Day bundles keyed by ISO date, in calendar order
pub type RangeResult = BTreeMap<String, DayBundle>;
