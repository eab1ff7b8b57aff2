//! Projections from raw upstream payloads to the depersonalized schema
//!
//! Every function here is total: missing, null or wrongly-typed inputs become
//! `None` in the output and never an error. Numbers are copied as sent. The
//! raw `Value` does not leave this module.

use pulsegate_core::schema::{
    ActivityRecord, ActivitySummary, BodyBatterySample, HeartRateSummary, Scalar, SleepSummary,
    StressSummary,
};
use serde_json::{Number, Value};

fn num(value: Option<&Value>) -> Option<Number> {
    match value? {
        Value::Number(n) => Some(n.clone()),
        _ => None,
    }
}

fn text(value: Option<&Value>) -> Option<String> {
    value?.as_str().map(str::to_string)
}

fn scalar(value: Option<&Value>) -> Option<Scalar> {
    match value? {
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(Scalar::Integer(i)),
            None => n.as_f64().map(Scalar::Decimal),
        },
        Value::String(s) => Some(Scalar::Text(s.clone())),
        _ => None,
    }
}

/// Project a sleep payload. The summary usually sits under `dailySleepDTO`.
pub fn sleep(raw: &Value) -> SleepSummary {
    let dto = raw.get("dailySleepDTO").unwrap_or(raw);
    let overall_score = dto
        .get("sleepScores")
        .and_then(|scores| scores.get("overall"))
        .and_then(|overall| overall.get("value"));

    SleepSummary {
        calendar_date: text(dto.get("calendarDate")),
        sleep_time_seconds: num(dto.get("sleepTimeSeconds")),
        deep_sleep_seconds: num(dto.get("deepSleepSeconds")),
        light_sleep_seconds: num(dto.get("lightSleepSeconds")),
        rem_sleep_seconds: num(dto.get("remSleepSeconds")),
        awake_sleep_seconds: num(dto.get("awakeSleepSeconds")),
        sleep_score: num(overall_score),
        average_spo2_value: num(dto.get("averageSpO2Value")),
        average_respiration_value: num(dto.get("averageRespirationValue")),
        sleep_start_timestamp_gmt: num(dto.get("sleepStartTimestampGMT")),
        sleep_end_timestamp_gmt: num(dto.get("sleepEndTimestampGMT")),
        avg_sleep_stress: num(dto.get("avgSleepStress")),
        avg_sleep_hr: None,
        min_sleep_hr: None,
        max_sleep_hr: None,
    }
}

pub fn activity_summary(raw: &Value) -> ActivitySummary {
    ActivitySummary {
        calendar_date: text(raw.get("calendarDate")),
        total_steps: num(raw.get("totalSteps")),
        total_distance_meters: num(raw.get("totalDistanceMeters")),
        active_kilocalories: num(raw.get("activeKilocalories")),
        total_kilocalories: num(raw.get("totalKilocalories")),
        floors_ascended: num(raw.get("floorsAscended")),
        floors_descended: num(raw.get("floorsDescended")),
        intensity_minutes_goal: num(raw.get("intensityMinutesGoal")),
        moderate_intensity_minutes: num(raw.get("moderateIntensityMinutes")),
        vigorous_intensity_minutes: num(raw.get("vigorousIntensityMinutes")),
        resting_heart_rate: num(raw.get("restingHeartRate")),
        min_heart_rate: num(raw.get("minHeartRate")),
        max_heart_rate: num(raw.get("maxHeartRate")),
        average_stress_level: num(raw.get("averageStressLevel")),
        max_stress_level: num(raw.get("maxStressLevel")),
        stress_duration: num(raw.get("stressDuration")),
        rest_stress_duration: num(raw.get("restStressDuration")),
        activity_stress_duration: num(raw.get("activityStressDuration")),
        low_stress_duration: num(raw.get("lowStressDuration")),
        medium_stress_duration: num(raw.get("mediumStressDuration")),
        high_stress_duration: num(raw.get("highStressDuration")),
        body_battery_charged_value: num(raw.get("bodyBatteryChargedValue")),
        body_battery_drained_value: num(raw.get("bodyBatteryDrainedValue")),
        body_battery_highest_value: num(raw.get("bodyBatteryHighestValue")),
        body_battery_lowest_value: num(raw.get("bodyBatteryLowestValue")),
        body_battery_most_recent_value: num(raw.get("bodyBatteryMostRecentValue")),
    }
}

pub fn stress(raw: &Value) -> StressSummary {
    StressSummary {
        calendar_date: text(raw.get("calendarDate")),
        overall_stress_level: num(raw.get("overallStressLevel")),
        rest_stress_duration: num(raw.get("restStressDuration")),
        activity_stress_duration: num(raw.get("activityStressDuration")),
        low_stress_duration: num(raw.get("lowStressDuration")),
        medium_stress_duration: num(raw.get("mediumStressDuration")),
        high_stress_duration: num(raw.get("highStressDuration")),
        stress_qualifier: text(raw.get("stressQualifier")),
    }
}

/// Project body battery readings, skipping entries that are not objects
pub fn body_battery(raw: &Value) -> Vec<BodyBatterySample> {
    let Some(entries) = raw.as_array() else {
        return Vec::new();
    };

    entries
        .iter()
        .filter(|entry| entry.is_object())
        .map(|entry| BodyBatterySample {
            start_timestamp_gmt: scalar(entry.get("startTimestampGMT")),
            end_timestamp_gmt: scalar(entry.get("endTimestampGMT")),
            level: scalar(entry.get("bodyBatteryLevel")),
            status: scalar(entry.get("bodyBatteryStatus")),
        })
        .collect()
}

pub fn heart_rate(raw: &Value) -> HeartRateSummary {
    HeartRateSummary {
        calendar_date: text(raw.get("calendarDate")),
        resting_heart_rate: num(raw.get("restingHeartRate")),
        max_heart_rate: num(raw.get("maxHeartRate")),
        min_heart_rate: num(raw.get("minHeartRate")),
        heart_rate_values: raw.get("heartRateValues").and_then(Value::as_array).cloned(),
    }
}

/// Project one activity. `activityType` is reduced to its `typeKey`.
pub fn activity(raw: &Value) -> ActivityRecord {
    let activity_type = match raw.get("activityType") {
        Some(Value::Object(kind)) => text(kind.get("typeKey")),
        _ => None,
    };

    ActivityRecord {
        activity_id: num(raw.get("activityId")),
        activity_name: text(raw.get("activityName")),
        activity_type,
        start_time_local: text(raw.get("startTimeLocal")),
        duration: num(raw.get("duration")),
        distance: num(raw.get("distance")),
        calories: num(raw.get("calories")),
        average_hr: num(raw.get("averageHR")),
        max_hr: num(raw.get("maxHR")),
        average_speed: num(raw.get("averageSpeed")),
        elevation_gain: num(raw.get("elevationGain")),
        steps: num(raw.get("steps")),
    }
}

/// First positive average SpO2 reading from a daily SpO2 payload.
/// A zero reading means the watch recorded nothing.
pub fn sleep_spo2(raw: &Value) -> Option<Number> {
    ["avgSleepSpO2", "averageSpO2"]
        .iter()
        .filter_map(|key| num(raw.get(*key)))
        .find(|n| n.as_f64().is_some_and(|v| v > 0.0))
}
