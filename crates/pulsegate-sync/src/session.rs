//! Session resolution
//!
//! A session is an authenticated upstream client for one user, rebuilt from the
//! stored credential blob on every request and dropped when the request ends.

use pulsegate_core::{CredentialStore, Error, Result, UpstreamClient, UpstreamConnector, UserKey};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Result of an `authenticate` call, already in response shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuthOutcome {
    fn succeeded() -> Self {
        Self {
            success: true,
            message: Some("Authentication successful".to_string()),
            error: None,
        }
    }

    fn failed(err: &Error) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(err.to_string()),
        }
    }
}

/// Result of a `check_auth` call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AuthStatus {
    pub authenticated: bool,
}

/// Maps logical users to credential locations and authenticated clients
#[derive(Clone)]
pub struct SessionResolver {
    store: Arc<dyn CredentialStore>,
    connector: Arc<dyn UpstreamConnector>,
}

impl SessionResolver {
    pub fn new(store: Arc<dyn CredentialStore>, connector: Arc<dyn UpstreamConnector>) -> Self {
        Self { store, connector }
    }

    /// Credential location for a request's user id
    pub async fn resolve(&self, user_id: Option<&str>) -> Result<String> {
        let user = UserKey::from_request(user_id)?;
        self.store.location(&user).await
    }

    /// Build an authenticated client for the user.
    ///
    /// Fails with `NotAuthenticated` when the user has no stored credentials.
    #[instrument(skip(self))]
    pub async fn client(&self, user_id: Option<&str>) -> Result<Box<dyn UpstreamClient>> {
        let user = UserKey::from_request(user_id)?;
        let location = self.store.location(&user).await?;

        if !self.store.exists(&user).await? {
            debug!("No credential location at {}", location);
            return Err(Error::NotAuthenticated);
        }
        let Some(blob) = self.store.load(&user).await? else {
            debug!("Credential location {} holds no token", location);
            return Err(Error::NotAuthenticated);
        };

        let client = self.connector.resume(blob).await?;

        if let Some(refreshed) = client.refreshed_state() {
            // The session is still usable if the write-back fails
            match self.store.store(&user, &refreshed).await {
                Ok(()) => debug!("Persisted refreshed credentials for {}", user),
                Err(e) => warn!("Failed to persist refreshed credentials for {}: {}", user, e),
            }
        }

        Ok(client)
    }

    /// Log in upstream and persist the resulting token state.
    ///
    /// Never fails; errors are reported inside the outcome.
    #[instrument(skip(self, email, password))]
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
        user_id: Option<&str>,
    ) -> AuthOutcome {
        match self.try_authenticate(email, password, user_id).await {
            Ok(()) => AuthOutcome::succeeded(),
            Err(e) => {
                warn!("Authentication failed: {}", e);
                AuthOutcome::failed(&e)
            }
        }
    }

    async fn try_authenticate(
        &self,
        email: &str,
        password: &str,
        user_id: Option<&str>,
    ) -> Result<()> {
        let user = UserKey::from_request(user_id)?;
        let blob = self.connector.login(email, password).await?;
        self.store.store(&user, &blob).await?;
        info!("Authenticated {}", user);
        Ok(())
    }

    /// Whether stored credentials still work upstream
    #[instrument(skip(self))]
    pub async fn check_auth(&self, user_id: Option<&str>) -> AuthStatus {
        let probe = async {
            let client = self.client(user_id).await?;
            client.full_name().await
        };

        match probe.await {
            Ok(_) => AuthStatus {
                authenticated: true,
            },
            Err(e) => {
                debug!("Auth check failed: {}", e);
                AuthStatus {
                    authenticated: false,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{FakeClient, FakeConnector};
    use pulsegate_core::CredentialBlob;
    use pulsegate_storage::FileCredentialStore;
    use tempfile::TempDir;

    fn resolver(
        temp: &TempDir,
        factory: impl Fn() -> FakeClient + Send + Sync + 'static,
    ) -> (SessionResolver, Arc<FileCredentialStore>, Arc<FakeConnector>) {
        let store = Arc::new(
            FileCredentialStore::new(temp.path().join("default"), temp.path().join("users"))
                .unwrap(),
        );
        let connector = Arc::new(FakeConnector::new("hunter2", factory));
        (
            SessionResolver::new(store.clone(), connector.clone()),
            store,
            connector,
        )
    }

    #[tokio::test]
    async fn test_resolve_default_aliases() {
        let temp = TempDir::new().unwrap();
        let (resolver, _, _) = resolver(&temp, FakeClient::default);

        let a = resolver.resolve(None).await.unwrap();
        let b = resolver.resolve(Some("")).await.unwrap();
        let c = resolver.resolve(Some("local-user")).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);

        let alice = resolver.resolve(Some("alice")).await.unwrap();
        let bob = resolver.resolve(Some("bob")).await.unwrap();
        assert_ne!(alice, bob);
        assert!(alice.ends_with("alice"));
    }

    #[tokio::test]
    async fn test_client_not_authenticated_without_location() {
        let temp = TempDir::new().unwrap();
        let (resolver, _, connector) = resolver(&temp, FakeClient::default);

        let result = resolver.client(Some("nobody")).await;
        assert!(matches!(result, Err(Error::NotAuthenticated)));
        assert!(connector.resumed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_client_not_authenticated_with_empty_location() {
        let temp = TempDir::new().unwrap();
        let (resolver, _, _) = resolver(&temp, FakeClient::default);
        std::fs::create_dir_all(temp.path().join("users/ghost")).unwrap();

        let result = resolver.client(Some("ghost")).await;
        assert!(matches!(result, Err(Error::NotAuthenticated)));
    }

    #[tokio::test]
    async fn test_authenticate_then_client() {
        let temp = TempDir::new().unwrap();
        let (resolver, store, connector) = resolver(&temp, FakeClient::default);

        let outcome = resolver
            .authenticate("jane@example.com", "hunter2", Some("jane"))
            .await;
        assert_eq!(
            outcome,
            AuthOutcome {
                success: true,
                message: Some("Authentication successful".to_string()),
                error: None,
            }
        );
        assert!(temp.path().join("users/jane").is_dir());

        resolver.client(Some("jane")).await.unwrap();
        let stored = store
            .load(&UserKey::Named("jane".to_string()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(connector.resumed.lock().unwrap().as_slice(), &[stored]);
    }

    #[tokio::test]
    async fn test_authenticate_failure_is_reported_not_raised() {
        let temp = TempDir::new().unwrap();
        let (resolver, _, _) = resolver(&temp, FakeClient::default);

        let outcome = resolver.authenticate("jane@example.com", "wrong", None).await;
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("Invalid username or password"));
        assert!(!temp.path().join("default").exists());
    }

    #[tokio::test]
    async fn test_authenticate_rejects_unsafe_user_id() {
        let temp = TempDir::new().unwrap();
        let (resolver, _, _) = resolver(&temp, FakeClient::default);

        let outcome = resolver.authenticate("a@b.c", "hunter2", Some("../escape")).await;
        assert!(!outcome.success);
        assert!(!temp.path().join("escape").exists());
    }

    #[tokio::test]
    async fn test_refreshed_state_is_written_back() {
        let temp = TempDir::new().unwrap();
        let (resolver, store, _) = resolver(&temp, || {
            FakeClient::default().with_refreshed(CredentialBlob::new(r#"{"account":"renewed"}"#))
        });

        resolver.authenticate("jane@example.com", "hunter2", None).await;
        resolver.client(None).await.unwrap();

        let stored = store.load(&UserKey::Default).await.unwrap().unwrap();
        assert_eq!(stored.as_str(), r#"{"account":"renewed"}"#);
    }

    #[tokio::test]
    async fn test_check_auth() {
        let temp = TempDir::new().unwrap();
        let (resolver, _, _) = resolver(&temp, FakeClient::default);

        assert_eq!(
            resolver.check_auth(Some("nobody")).await,
            AuthStatus {
                authenticated: false
            }
        );

        resolver.authenticate("a@b.c", "hunter2", Some("nobody")).await;
        assert!(resolver.check_auth(Some("nobody")).await.authenticated);
    }

    #[tokio::test]
    async fn test_check_auth_false_when_probe_fails() {
        let temp = TempDir::new().unwrap();
        let (resolver, _, _) = resolver(&temp, || FakeClient::failing("token revoked"));

        resolver.authenticate("a@b.c", "hunter2", None).await;
        assert!(!resolver.check_auth(None).await.authenticated);
    }

    #[test]
    fn test_auth_outcome_shape() {
        let ok = serde_json::to_value(AuthOutcome::succeeded()).unwrap();
        assert_eq!(
            ok,
            serde_json::json!({"success": true, "message": "Authentication successful"})
        );

        let failed = serde_json::to_value(AuthOutcome::failed(&Error::NotAuthenticated)).unwrap();
        assert_eq!(
            failed,
            serde_json::json!({
                "success": false,
                "error": "Not authenticated. Please authenticate first."
            })
        );
    }
}
