//! HTTP endpoints
//!
//! Every endpoint answers 200 with a JSON body. Upstream and session failures
//! are reported inside the envelope, never as HTTP status codes.

use axum::{Json, Router, extract::State, middleware, routing::post};
use pulsegate_core::Result;
use pulsegate_core::schema::{
    ActivitiesByDate, ActivityRecord, ActivitySummary, BodyBatterySample, HeartRateSummary,
    RangeResult, SleepSummary, StressSummary,
};
use pulsegate_observability::{HealthState, Metrics, health_router};
use pulsegate_sync::{AuthOutcome, AuthStatus, SyncService};
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::middleware::{
    ApiKeyGate, api_key_middleware, cors_middleware, request_context_middleware,
};
use crate::types::{AuthRequest, DateRequest, Envelope, LenientJson, RangeRequest, UserRequest};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub sync: SyncService,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(sync: SyncService, metrics: Arc<Metrics>) -> Self {
        Self { sync, metrics }
    }

    fn finish<T>(
        &self,
        endpoint: &str,
        started: Instant,
        envelope: Envelope<T>,
    ) -> Json<Envelope<T>> {
        if let Envelope::Failure { error, .. } = &envelope {
            warn!("{} failed: {}", endpoint, error);
        }
        self.metrics.record_request(
            endpoint,
            envelope.is_success(),
            started.elapsed().as_secs_f64(),
        );
        Json(envelope)
    }

    fn data<T>(&self, endpoint: &str, started: Instant, result: Result<T>) -> Json<Envelope<T>> {
        self.finish(endpoint, started, Envelope::data(result))
    }
}

/// JSON API routes without middleware
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/authenticate", post(authenticate))
        .route("/check-auth", post(check_auth))
        .route("/sleep", post(sleep))
        .route("/activity", post(activity))
        .route("/stress", post(stress))
        .route("/body-battery", post(body_battery))
        .route("/heart-rate", post(heart_rate))
        .route("/activities", post(activities))
        .route("/activities-batch", post(activities_batch))
        .route("/sync-all", post(sync_all))
        .with_state(state)
}

/// Complete application: API routes, health endpoints and middleware.
///
/// The API-key gate covers every route; CORS sits outside it so preflight
/// requests and 401 responses still carry CORS headers.
pub fn app(state: AppState, api_key: Option<&str>) -> Router {
    let gate = ApiKeyGate::new(api_key);
    let health = health_router(HealthState::new(state.metrics.clone()));

    api_router(state)
        .merge(health)
        .layer(middleware::from_fn_with_state(gate, api_key_middleware))
        .layer(middleware::from_fn(cors_middleware))
        .layer(middleware::from_fn(request_context_middleware))
        .layer(TraceLayer::new_for_http())
}

async fn authenticate(
    State(state): State<AppState>,
    LenientJson(body): LenientJson<AuthRequest>,
) -> Json<AuthOutcome> {
    let started = Instant::now();
    let outcome = state
        .sync
        .authenticate(&body.email, &body.password, body.user_id())
        .await;

    state.metrics.record_auth_attempt(outcome.success);
    state.metrics.record_request(
        "/authenticate",
        outcome.success,
        started.elapsed().as_secs_f64(),
    );
    Json(outcome)
}

async fn check_auth(
    State(state): State<AppState>,
    LenientJson(body): LenientJson<UserRequest>,
) -> Json<AuthStatus> {
    let started = Instant::now();
    let status = state.sync.check_auth(body.user_id()).await;

    state
        .metrics
        .record_request("/check-auth", true, started.elapsed().as_secs_f64());
    Json(status)
}

async fn sleep(
    State(state): State<AppState>,
    LenientJson(body): LenientJson<DateRequest>,
) -> Json<Envelope<SleepSummary>> {
    let started = Instant::now();
    let result = state.sync.sleep(&body.date, body.user_id()).await;
    state.data("/sleep", started, result)
}

async fn activity(
    State(state): State<AppState>,
    LenientJson(body): LenientJson<DateRequest>,
) -> Json<Envelope<ActivitySummary>> {
    let started = Instant::now();
    let result = state.sync.activity_summary(&body.date, body.user_id()).await;
    state.data("/activity", started, result)
}

async fn stress(
    State(state): State<AppState>,
    LenientJson(body): LenientJson<DateRequest>,
) -> Json<Envelope<StressSummary>> {
    let started = Instant::now();
    let result = state.sync.stress(&body.date, body.user_id()).await;
    state.data("/stress", started, result)
}

async fn body_battery(
    State(state): State<AppState>,
    LenientJson(body): LenientJson<DateRequest>,
) -> Json<Envelope<Vec<BodyBatterySample>>> {
    let started = Instant::now();
    let result = state.sync.body_battery(&body.date, body.user_id()).await;
    state.data("/body-battery", started, result)
}

async fn heart_rate(
    State(state): State<AppState>,
    LenientJson(body): LenientJson<DateRequest>,
) -> Json<Envelope<HeartRateSummary>> {
    let started = Instant::now();
    let result = state.sync.heart_rate(&body.date, body.user_id()).await;
    state.data("/heart-rate", started, result)
}

async fn activities(
    State(state): State<AppState>,
    LenientJson(body): LenientJson<DateRequest>,
) -> Json<Envelope<Vec<ActivityRecord>>> {
    let started = Instant::now();
    let result = state.sync.activities(&body.date, body.user_id()).await;
    state.data("/activities", started, result)
}

async fn activities_batch(
    State(state): State<AppState>,
    LenientJson(body): LenientJson<RangeRequest>,
) -> Json<Envelope<ActivitiesByDate>> {
    let started = Instant::now();
    let result = state
        .sync
        .activities_batch(&body.start_date, &body.end_date, body.user_id())
        .await;
    state.data("/activities-batch", started, result)
}

async fn sync_all(
    State(state): State<AppState>,
    LenientJson(body): LenientJson<RangeRequest>,
) -> Json<Envelope<RangeResult>> {
    let started = Instant::now();
    let result = state
        .sync
        .sync_all(&body.start_date, &body.end_date, body.user_id())
        .await;

    if let Ok(dates) = &result {
        for bundle in dates.values() {
            state.metrics.record_sync_day(&bundle.failed_metrics());
        }
    }
    state.finish("/sync-all", started, Envelope::dates(result))
}
