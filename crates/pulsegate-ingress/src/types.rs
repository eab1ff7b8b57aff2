//! Request bodies and response envelopes

use axum::extract::{FromRequest, Request};
use bytes::Bytes;
use pulsegate_core::Result;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;

/// JSON body extractor that never rejects.
///
/// A missing, empty or unparsable body yields `T::default()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LenientJson<T>(pub T);

impl<S, T> FromRequest<S> for LenientJson<T>
where
    T: DeserializeOwned + Default,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request(req: Request, state: &S) -> std::result::Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state).await.unwrap_or_default();
        Ok(Self(parse_lenient(&bytes)))
    }
}

/// Parse a JSON body, falling back to `T::default()`
pub fn parse_lenient<T: DeserializeOwned + Default>(bytes: &[u8]) -> T {
    serde_json::from_slice(bytes).unwrap_or_default()
}

/// Body of `/authenticate`
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthRequest {
    pub email: String,
    pub password: String,
    pub user_id: Option<String>,
}

impl AuthRequest {
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }
}

/// Body of `/check-auth`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UserRequest {
    pub user_id: Option<String>,
}

impl UserRequest {
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }
}

/// Body of the single-day metric endpoints
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DateRequest {
    pub date: String,
    pub user_id: Option<String>,
}

impl DateRequest {
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }
}

/// Body of `/activities-batch` and `/sync-all`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RangeRequest {
    pub start_date: String,
    pub end_date: String,
    pub user_id: Option<String>,
}

impl RangeRequest {
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }
}

/// `{success, data}`, `{success, dates}` or `{success: false, error}`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Envelope<T> {
    Data { success: bool, data: T },
    Dates { success: bool, dates: T },
    Failure { success: bool, error: String },
}

impl<T> Envelope<T> {
    /// Wrap a fetch result under `data`
    pub fn data(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::Data {
                success: true,
                data,
            },
            Err(e) => Self::failure(e.to_string()),
        }
    }

    /// Wrap a range sync result under `dates`
    pub fn dates(result: Result<T>) -> Self {
        match result {
            Ok(dates) => Self::Dates {
                success: true,
                dates,
            },
            Err(e) => Self::failure(e.to_string()),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self::Failure {
            success: false,
            error: error.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failure { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulsegate_core::Error;
    use serde_json::json;

    #[test]
    fn test_parse_lenient_defaults() {
        let empty: DateRequest = parse_lenient(b"");
        assert_eq!(empty.date, "");
        assert!(empty.user_id.is_none());

        let garbage: DateRequest = parse_lenient(b"{not json");
        assert_eq!(garbage.date, "");

        let null: RangeRequest = parse_lenient(b"null");
        assert_eq!(null.start_date, "");
    }

    #[test]
    fn test_parse_lenient_partial_body() {
        let req: RangeRequest = parse_lenient(br#"{"start_date":"2024-01-01","user_id":null}"#);
        assert_eq!(req.start_date, "2024-01-01");
        assert_eq!(req.end_date, "");
        assert_eq!(req.user_id(), None);
    }

    #[test]
    fn test_envelope_shapes() {
        assert_eq!(
            serde_json::to_value(Envelope::data(Ok(vec![1, 2]))).unwrap(),
            json!({"success": true, "data": [1, 2]})
        );
        assert_eq!(
            serde_json::to_value(Envelope::dates(Ok(json!({})))).unwrap(),
            json!({"success": true, "dates": {}})
        );
        assert_eq!(
            serde_json::to_value(Envelope::<()>::data(Err(Error::NotAuthenticated))).unwrap(),
            json!({
                "success": false,
                "error": "Not authenticated. Please authenticate first."
            })
        );
    }

    #[test]
    fn test_envelope_is_success() {
        assert!(Envelope::data(Ok(1)).is_success());
        assert!(!Envelope::<i32>::failure("nope").is_success());
    }
}
