//! Range aggregator
//!
//! Walks every date in an inclusive range and collects all five daily metrics
//! per date. Calls are issued strictly one after another.

use chrono::NaiveDate;
use pulsegate_core::schema::{DayBundle, RangeResult};
use pulsegate_core::{Result, UpstreamClient};
use tracing::{debug, info, instrument};

use crate::{SyncService, fetch, parse_date};

/// Collect one day's metrics. A failing metric is recorded on the bundle and
/// never stops the others.
pub async fn collect_day(client: &dyn UpstreamClient, date: NaiveDate) -> DayBundle {
    let mut bundle = DayBundle::default();

    match fetch::sleep(client, date).await {
        Ok(sleep) => bundle.sleep = Some(sleep),
        Err(e) => bundle.sleep_error = Some(e.to_string()),
    }
    match fetch::activity_summary(client, date).await {
        Ok(activity) => bundle.activity = Some(activity),
        Err(e) => bundle.activity_error = Some(e.to_string()),
    }
    match fetch::stress(client, date).await {
        Ok(stress) => bundle.stress = Some(stress),
        Err(e) => bundle.stress_error = Some(e.to_string()),
    }
    match fetch::body_battery(client, date).await {
        Ok(samples) => bundle.body_battery = Some(samples),
        Err(e) => bundle.body_battery_error = Some(e.to_string()),
    }
    match fetch::heart_rate(client, date).await {
        Ok(heart_rate) => bundle.heart_rate = Some(heart_rate),
        Err(e) => bundle.heart_rate_error = Some(e.to_string()),
    }

    if bundle.error_count() > 0 {
        debug!("{}: {} metric(s) failed", date, bundle.error_count());
    }
    bundle
}

/// Collect every date in `[start, end]`; empty when `start > end`
pub async fn collect_range(
    client: &dyn UpstreamClient,
    start: NaiveDate,
    end: NaiveDate,
) -> RangeResult {
    let mut dates = RangeResult::new();
    for date in start.iter_days().take_while(|d| *d <= end) {
        dates.insert(date.to_string(), collect_day(client, date).await);
    }
    dates
}

impl SyncService {
    /// Sync every metric for each date in the range.
    ///
    /// Session resolution failures abort the call; per-metric failures only
    /// mark the affected day.
    #[instrument(skip(self))]
    pub async fn sync_all(
        &self,
        start_date: &str,
        end_date: &str,
        user_id: Option<&str>,
    ) -> Result<RangeResult> {
        let client = self.sessions().client(user_id).await?;
        let start = parse_date(start_date)?;
        let end = parse_date(end_date)?;

        let dates = collect_range(client.as_ref(), start, end).await;
        info!(
            "Synced {} day(s) from {} to {}",
            dates.len(),
            start_date,
            end_date
        );
        Ok(dates)
    }
}
