//! PulseGate Core Types and Traits
//!
//! This crate provides the fundamental types and traits used throughout PulseGate:
//! - User identity and the default-tenant rules
//! - Credential store abstraction
//! - Upstream connector/client traits
//! - Depersonalized output schema
//! - Core error types

pub mod credential_store;
pub mod error;
pub mod schema;
pub mod upstream;
pub mod user;

pub use credential_store::{CredentialBlob, CredentialStore};
pub use error::{Error, Result};
pub use upstream::{UpstreamClient, UpstreamConnector};
pub use user::UserKey;
