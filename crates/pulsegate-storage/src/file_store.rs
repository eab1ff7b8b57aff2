//! File-based CredentialStore implementation
//!
//! Layout on disk:
//! - default tenant: `<default_dir>/oauth2_token.json`
//! - named tenant:   `<users_dir>/<user_id>/oauth2_token.json`

use async_trait::async_trait;
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use pulsegate_core::{CredentialBlob, CredentialStore, Result, UserKey};

use crate::paths::{DEFAULT_CREDENTIAL_DIR, DEFAULT_USERS_DIR, expand_tilde};
use crate::{AtomicWriter, StorageError};

/// File holding the serialized token state inside a credential location
pub const TOKEN_FILE_NAME: &str = "oauth2_token.json";

/// Credential store keeping one directory per user on local disk
#[derive(Debug)]
pub struct FileCredentialStore {
    /// Location used by the default (local) tenant
    default_dir: PathBuf,
    /// Parent of every named user's location
    users_dir: PathBuf,
    /// Serializes writers per location
    write_locks: DashMap<PathBuf, Arc<Mutex<()>>>,
}

impl FileCredentialStore {
    /// Create a store rooted at explicit directories (supports `~`)
    pub fn new(default_dir: impl AsRef<Path>, users_dir: impl AsRef<Path>) -> Result<Self> {
        let default_dir = expand_tilde(default_dir.as_ref())?;
        let users_dir = expand_tilde(users_dir.as_ref())?;

        info!(
            "Initialized FileCredentialStore (default: {}, users: {})",
            default_dir.display(),
            users_dir.display()
        );

        Ok(Self {
            default_dir,
            users_dir,
            write_locks: DashMap::new(),
        })
    }

    /// Store using `~/.garminconnect` and `~/.garminconnect-users`
    pub fn with_home_defaults() -> Result<Self> {
        Self::new(DEFAULT_CREDENTIAL_DIR, DEFAULT_USERS_DIR)
    }

    /// Resolve the credential location for a user.
    ///
    /// For named users the shared base directory is created if missing; the
    /// per-user directory itself is only created on `store`.
    pub fn resolve(&self, user: &UserKey) -> Result<PathBuf> {
        match user {
            UserKey::Default => Ok(self.default_dir.clone()),
            UserKey::Named(id) => {
                std::fs::create_dir_all(&self.users_dir)
                    .map_err(|e| StorageError::io(&self.users_dir, e))?;
                Ok(self.users_dir.join(id))
            }
        }
    }

    /// Location without touching the filesystem
    fn location_path(&self, user: &UserKey) -> PathBuf {
        match user {
            UserKey::Default => self.default_dir.clone(),
            UserKey::Named(id) => self.users_dir.join(id),
        }
    }

    fn write_lock(&self, location: &Path) -> Arc<Mutex<()>> {
        self.write_locks
            .entry(location.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the lock entry once no other writer holds or waits on it
    fn release_write_lock(&self, location: &Path, lock: Arc<Mutex<()>>) {
        drop(lock);
        self.write_locks.remove_if(location, |_, entry| Arc::strong_count(entry) == 1);
    }

    fn write_token(location: &Path, blob: &CredentialBlob) -> Result<()> {
        std::fs::create_dir_all(location).map_err(|e| StorageError::io(location, e))?;

        let mut writer = AtomicWriter::new(location.join(TOKEN_FILE_NAME))?;
        writer.write(blob.as_str().as_bytes())?;
        writer.commit()?;
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn location(&self, user: &UserKey) -> Result<String> {
        Ok(self.resolve(user)?.display().to_string())
    }

    async fn exists(&self, user: &UserKey) -> Result<bool> {
        Ok(self.location_path(user).exists())
    }

    async fn load(&self, user: &UserKey) -> Result<Option<CredentialBlob>> {
        let token_path = self.location_path(user).join(TOKEN_FILE_NAME);

        match std::fs::read_to_string(&token_path) {
            Ok(contents) => {
                debug!("Loaded credentials for {} from {}", user, token_path.display());
                Ok(Some(CredentialBlob::new(contents)))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No stored credentials for {}", user);
                Ok(None)
            }
            Err(e) => Err(StorageError::io(&token_path, e).into()),
        }
    }

    async fn store(&self, user: &UserKey, blob: &CredentialBlob) -> Result<()> {
        let location = self.resolve(user)?;
        let lock = self.write_lock(&location);
        let written = {
            let _guard = lock.lock().await;
            Self::write_token(&location, blob)
        };
        self.release_write_lock(&location, lock);
        written?;

        info!("Stored credentials for {} at {}", user, location.display());
        Ok(())
    }
}
