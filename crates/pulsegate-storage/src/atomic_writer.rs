//! Atomic file writer to ensure safe file operations

use crate::{StorageError, StorageResult};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Atomic file writer that writes to a temporary file and renames on success
///
/// Readers of the final path see either the previous contents or the new
/// contents, never a partial write.
pub struct AtomicWriter {
    temp_path: PathBuf,
    final_path: PathBuf,
    file: Option<File>,
}

impl AtomicWriter {
    /// Create a new atomic writer for the given path
    pub fn new<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        let final_path = path.as_ref().to_path_buf();

        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
        }

        let temp_path = Self::temp_path(&final_path);
        let file = File::create(&temp_path).map_err(|e| StorageError::io(&temp_path, e))?;

        Ok(Self {
            temp_path,
            final_path,
            file: Some(file),
        })
    }

    /// Write data to the temporary file
    pub fn write(&mut self, data: &[u8]) -> StorageResult<()> {
        if let Some(file) = self.file.as_mut() {
            file.write_all(data)
                .map_err(|e| StorageError::io(&self.temp_path, e))?;
        }
        Ok(())
    }

    /// Commit the write by renaming the temp file to the final path
    pub fn commit(mut self) -> StorageResult<()> {
        if let Some(mut file) = self.file.take() {
            file.flush()
                .map_err(|e| StorageError::io(&self.temp_path, e))?;
            file.sync_all()
                .map_err(|e| StorageError::io(&self.temp_path, e))?;
        }

        fs::rename(&self.temp_path, &self.final_path)
            .map_err(|e| StorageError::io(&self.final_path, e))
    }

    /// Unique sibling path, so writers from other processes never share one
    fn temp_path(final_path: &Path) -> PathBuf {
        let mut temp = final_path.as_os_str().to_owned();
        temp.push(format!(".{}.tmp", uuid::Uuid::new_v4().simple()));
        PathBuf::from(temp)
    }
}

impl Drop for AtomicWriter {
    fn drop(&mut self) {
        // After a successful commit the temp file has been renamed away
        let _ = fs::remove_file(&self.temp_path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_atomic_write_success() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("oauth2_token.json");

        let mut writer = AtomicWriter::new(&file_path).unwrap();
        writer.write(br#"{"access_token":"abc"}"#).unwrap();
        writer.commit().unwrap();

        let content = fs::read_to_string(&file_path).unwrap();
        assert_eq!(content, r#"{"access_token":"abc"}"#);
    }

    #[test]
    fn test_atomic_write_creates_parent_dir() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("user-1/oauth2_token.json");

        let mut writer = AtomicWriter::new(&file_path).unwrap();
        writer.write(b"{}").unwrap();
        writer.commit().unwrap();

        assert!(file_path.exists());
    }

    #[test]
    fn test_atomic_write_rollback_on_drop() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("oauth2_token.json");

        {
            let mut writer = AtomicWriter::new(&file_path).unwrap();
            writer.write(b"never committed").unwrap();
        }

        assert!(!file_path.exists());
        // No stray temp files either
        assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_atomic_write_overwrites_existing() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("oauth2_token.json");
        fs::write(&file_path, b"old token").unwrap();

        let mut writer = AtomicWriter::new(&file_path).unwrap();
        writer.write(b"new token").unwrap();
        writer.commit().unwrap();

        assert_eq!(fs::read_to_string(&file_path).unwrap(), "new token");
        assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 1);
    }
}
