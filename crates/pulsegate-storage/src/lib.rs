//! PulseGate Credential Storage
//!
//! Filesystem-backed implementation of `CredentialStore`:
//! - Deterministic per-user credential locations
//! - Atomic token writes (temp file + rename)
//! - Per-user write serialization

pub mod atomic_writer;
pub mod file_store;
pub mod paths;

pub use atomic_writer::AtomicWriter;
pub use file_store::{FileCredentialStore, TOKEN_FILE_NAME};
pub use paths::expand_tilde;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not determine home directory")]
    NoHomeDir,

    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

impl StorageError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

impl From<StorageError> for pulsegate_core::Error {
    fn from(err: StorageError) -> Self {
        pulsegate_core::Error::CredentialStore(err.to_string())
    }
}

pub type StorageResult<T> = Result<T, StorageError>;
