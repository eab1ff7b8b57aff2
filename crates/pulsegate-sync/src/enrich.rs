//! Sleep enrichment from the heart rate and SpO2 series
//!
//! Both steps are best effort. A failed upstream call or missing data leaves
//! the sleep summary untouched and is never reported to the caller.

use chrono::NaiveDate;
use pulsegate_core::UpstreamClient;
use pulsegate_core::schema::SleepSummary;
use serde_json::{Number, Value};
use tracing::debug;

use crate::projection;

/// Heart rate statistics over the sleep window
#[derive(Debug, Clone, PartialEq)]
pub struct SleepHeartRate {
    pub avg: i64,
    pub min: Number,
    pub max: Number,
}

/// `[timestampMs, bpm, ..]` entry with a numeric timestamp and bpm
fn reading(entry: &Value) -> Option<(f64, &Number)> {
    let pair = entry.as_array()?;
    let timestamp = pair.first()?.as_f64()?;
    match pair.get(1)? {
        Value::Number(bpm) => Some((timestamp, bpm)),
        _ => None,
    }
}

/// Summarize series entries whose timestamp lies in `[start, end]` and whose
/// bpm is set. Entries of any other shape are ignored.
pub fn sleep_heart_rate(start: f64, end: f64, series: &[Value]) -> Option<SleepHeartRate> {
    let in_window: Vec<(f64, &Number)> = series
        .iter()
        .filter_map(reading)
        .filter(|(timestamp, _)| (start..=end).contains(timestamp))
        .filter_map(|(_, bpm)| Some((bpm.as_f64()?, bpm)))
        .collect();

    let min = in_window.iter().min_by(|a, b| a.0.total_cmp(&b.0))?.1;
    let max = in_window.iter().max_by(|a, b| a.0.total_cmp(&b.0))?.1;
    let mean = in_window.iter().map(|(bpm, _)| bpm).sum::<f64>() / in_window.len() as f64;

    Some(SleepHeartRate {
        avg: mean.round() as i64,
        min: min.clone(),
        max: max.clone(),
    })
}

/// Apply both enrichments to a freshly projected sleep summary
pub async fn enrich_sleep(client: &dyn UpstreamClient, date: NaiveDate, sleep: &mut SleepSummary) {
    add_heart_rate(client, date, sleep).await;
    add_spo2(client, date, sleep).await;
}

async fn add_heart_rate(client: &dyn UpstreamClient, date: NaiveDate, sleep: &mut SleepSummary) {
    let start = sleep.sleep_start_timestamp_gmt.as_ref().and_then(Number::as_f64);
    let end = sleep.sleep_end_timestamp_gmt.as_ref().and_then(Number::as_f64);
    let (Some(start), Some(end)) = (start, end) else {
        return;
    };

    let raw = match client.heart_rates(date).await {
        Ok(raw) => raw,
        Err(e) => {
            debug!("Heart rate during sleep unavailable for {}: {}", date, e);
            return;
        }
    };

    let series = projection::heart_rate(&raw).heart_rate_values.unwrap_or_default();
    if series.is_empty() {
        return;
    }

    if let Some(hr) = sleep_heart_rate(start, end, &series) {
        sleep.avg_sleep_hr = Some(hr.avg);
        sleep.min_sleep_hr = Some(hr.min);
        sleep.max_sleep_hr = Some(hr.max);
    }
}

async fn add_spo2(client: &dyn UpstreamClient, date: NaiveDate, sleep: &mut SleepSummary) {
    match client.spo2_data(date).await {
        Ok(raw) => {
            if let Some(spo2) = projection::sleep_spo2(&raw) {
                sleep.average_spo2_value = Some(spo2);
            }
        }
        Err(e) => debug!("SpO2 during sleep unavailable for {}: {}", date, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeClient;
    use serde_json::json;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()
    }

    fn window(start: i64, end: i64) -> SleepSummary {
        SleepSummary {
            sleep_start_timestamp_gmt: Some(Number::from(start)),
            sleep_end_timestamp_gmt: Some(Number::from(end)),
            average_spo2_value: Number::from_f64(93.0),
            ..Default::default()
        }
    }

    fn series(value: Value) -> Vec<Value> {
        value.as_array().cloned().unwrap()
    }

    #[test]
    fn test_window_is_inclusive_and_filters_outside() {
        let samples = series(json!([[500, 60], [1500, 70], [2500, 80]]));
        let hr = sleep_heart_rate(1000.0, 2000.0, &samples).unwrap();
        assert_eq!(hr.avg, 70);
        assert_eq!(hr.min, Number::from(70));
        assert_eq!(hr.max, Number::from(70));

        let edges = series(json!([[1000, 50], [2000, 55]]));
        let hr = sleep_heart_rate(1000.0, 2000.0, &edges).unwrap();
        assert_eq!(hr.min, Number::from(50));
        assert_eq!(hr.max, Number::from(55));
    }

    #[test]
    fn test_malformed_entries_ignored() {
        let samples = series(json!([
            [null, 90],
            [1200, null],
            [1250],
            "gap",
            [1300, 61, "extra"]
        ]));
        let hr = sleep_heart_rate(1000.0, 2000.0, &samples).unwrap();
        assert_eq!(hr.avg, 61);
        assert_eq!(hr.min, Number::from(61));
    }

    #[test]
    fn test_fractional_bpm_counted() {
        let samples = series(json!([[1100, 58.5], [1200, 62], [1300, 60]]));
        let hr = sleep_heart_rate(1000.0, 2000.0, &samples).unwrap();
        assert_eq!(hr.avg, 60);
        assert_eq!(hr.min, Number::from_f64(58.5).unwrap());
        assert_eq!(hr.max, Number::from(62));
    }

    #[test]
    fn test_mean_rounds_half_away_from_zero() {
        let samples = series(json!([[1100, 60], [1200, 61]]));
        assert_eq!(sleep_heart_rate(1000.0, 2000.0, &samples).unwrap().avg, 61);
    }

    #[test]
    fn test_no_samples_in_window() {
        let samples = series(json!([[5000, 60]]));
        assert!(sleep_heart_rate(1000.0, 2000.0, &samples).is_none());
    }

    #[tokio::test]
    async fn test_enrich_sets_hr_and_spo2() {
        let client = FakeClient::default()
            .with_heart_rates(json!({ "heartRateValues": [[500, 60], [1500, 70], [2500, 80]] }))
            .with_spo2(json!({ "avgSleepSpO2": 96.0 }));

        let mut sleep = window(1000, 2000);
        enrich_sleep(&client, day(), &mut sleep).await;

        assert_eq!(sleep.avg_sleep_hr, Some(70));
        assert_eq!(sleep.min_sleep_hr, Some(Number::from(70)));
        assert_eq!(sleep.max_sleep_hr, Some(Number::from(70)));
        assert_eq!(sleep.average_spo2_value, Number::from_f64(96.0));
    }

    #[tokio::test]
    async fn test_enrich_keeps_spo2_on_zero_reading() {
        let client = FakeClient::default().with_spo2(json!({ "avgSleepSpO2": 0 }));

        let mut sleep = window(1000, 2000);
        enrich_sleep(&client, day(), &mut sleep).await;

        assert_eq!(sleep.average_spo2_value, Number::from_f64(93.0));
    }

    #[tokio::test]
    async fn test_enrich_failures_leave_summary_untouched() {
        let client = FakeClient::failing("upstream down");

        let mut sleep = window(1000, 2000);
        enrich_sleep(&client, day(), &mut sleep).await;

        assert_eq!(sleep, window(1000, 2000));
    }

    #[tokio::test]
    async fn test_enrich_skips_hr_without_window() {
        let client = FakeClient::default()
            .with_heart_rates(json!({ "heartRateValues": [[1500, 70]] }));

        let mut sleep = SleepSummary::default();
        enrich_sleep(&client, day(), &mut sleep).await;

        assert_eq!(sleep.avg_sleep_hr, None);
        assert_eq!(client.calls("heart_rates"), 0);
    }
}
