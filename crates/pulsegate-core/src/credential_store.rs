//! Credential store trait
//!
//! The `CredentialStore` trait abstracts where per-user token state lives, so
//! the fetch and merge logic never touches filesystem paths directly. The
//! shipped implementation keeps one directory per user on local disk.

use async_trait::async_trait;
use std::fmt;

use crate::{Result, user::UserKey};

/// Opaque serialized authentication state for one user.
///
/// Only the upstream connector understands the contents; everything else
/// moves it around as text.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialBlob(String);

impl CredentialBlob {
    pub fn new(contents: impl Into<String>) -> Self {
        Self(contents.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

// Token material must never reach logs.
impl fmt::Debug for CredentialBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CredentialBlob(<{} bytes>)", self.0.len())
    }
}

/// Credential store trait
///
/// # Example
/// ```no_run
/// # use pulsegate_core::{CredentialStore, UserKey};
/// # async fn example(store: &dyn CredentialStore) -> pulsegate_core::Result<()> {
/// let user = UserKey::from_request(Some("user-42"))?;
/// if store.exists(&user).await? {
///     let blob = store.load(&user).await?;
///     assert!(blob.is_some());
/// }
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Resolve the storage location for a user, preparing any parent
    /// structure the location needs. Returns a human-readable description.
    async fn location(&self, user: &UserKey) -> Result<String>;

    /// Whether the user's location exists (i.e. the user has authenticated)
    async fn exists(&self, user: &UserKey) -> Result<bool>;

    /// Load the stored blob, `None` if nothing has been stored yet
    async fn load(&self, user: &UserKey) -> Result<Option<CredentialBlob>>;

    /// Create the user's location if needed and persist the blob
    ///
    /// Concurrent writers for the same user are serialized; the last write
    /// wins and readers never observe a partial blob.
    async fn store(&self, user: &UserKey, blob: &CredentialBlob) -> Result<()>;
}
