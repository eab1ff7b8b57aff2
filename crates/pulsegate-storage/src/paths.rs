//! Path helpers

use crate::{StorageError, StorageResult};
use std::path::{Path, PathBuf};

/// Default single-tenant credential directory, relative to the home directory
pub const DEFAULT_CREDENTIAL_DIR: &str = "~/.garminconnect";

/// Base directory holding one credential directory per named user
pub const DEFAULT_USERS_DIR: &str = "~/.garminconnect-users";

/// Expand tilde (~) in path to home directory
pub fn expand_tilde(path: &Path) -> StorageResult<PathBuf> {
    let path_str = path
        .to_str()
        .ok_or_else(|| StorageError::InvalidPath("Invalid UTF-8 in path".to_string()))?;

    if let Some(stripped) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir().ok_or(StorageError::NoHomeDir)?;
        Ok(home.join(stripped))
    } else if path_str == "~" {
        dirs::home_dir().ok_or(StorageError::NoHomeDir)
    } else {
        Ok(path.to_path_buf())
    }
}
