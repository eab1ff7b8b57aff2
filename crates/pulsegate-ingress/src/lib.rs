//! PulseGate Ingress
//!
//! This crate provides the HTTP surface:
//! - JSON endpoints for authentication, per-metric fetches and range syncs
//! - Lenient request body parsing and response envelopes
//! - API-key gate, CORS and request ID middleware

pub mod middleware;
pub mod routes;
pub mod types;

pub use routes::{AppState, api_router, app};
pub use types::{Envelope, LenientJson};
