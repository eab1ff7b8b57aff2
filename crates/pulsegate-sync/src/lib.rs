//! PulseGate Sync Pipeline
//!
//! This crate turns a logical user and a date (or date range) into
//! depersonalized metrics:
//! - Session resolution against the credential store
//! - Total projections from raw upstream payloads to the output schema
//! - Per-metric fetchers and the sleep enrichment
//! - The range aggregator behind sync-all

pub mod aggregate;
pub mod enrich;
pub mod fetch;
pub mod projection;
pub mod session;

pub use fetch::SyncService;
pub use session::{AuthOutcome, AuthStatus, SessionResolver};

use chrono::NaiveDate;
use pulsegate_core::{Error, Result};

/// Parse an ISO `YYYY-MM-DD` calendar date from a request
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| Error::InvalidDate(value.to_string()))
}

#[cfg(test)]
pub(crate) mod fake;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2024-03-05").unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
        );
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        for bad in ["", "yesterday", "2024-02-30", "2024/03/05"] {
            assert!(
                matches!(parse_date(bad), Err(Error::InvalidDate(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }
}
