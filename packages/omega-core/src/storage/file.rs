//! JSON-file session storage.
//!
//! The whole key space lives in one small JSON object. Every mutation rewrites
//! it with an atomic write (temp file, then rename) so a crash never leaves a
//! token without its user or the other way round. Reads always go to disk, so
//! edits made by another process are visible on the next read.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::SessionStorage;
use crate::error::{Error, Result};

/// File name used by [`FileStorage::in_dir`].
pub const SESSION_FILE_NAME: &str = "session.json";

/// Session storage persisted to a JSON file.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl FileStorage {
    /// Use the file at `path`. It is created on first write.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        tracing::debug!(path = %path.display(), "Using file session storage");
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    /// Use `session.json` inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::open(dir.as_ref().join(SESSION_FILE_NAME))
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let contents = std::fs::read_to_string(&self.path)
            .map_err(|e| Error::StorageReadError(format!("{}: {}", self.path.display(), e)))?;

        match serde_json::from_str(&contents) {
            Ok(map) => Ok(map),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    path = %self.path.display(),
                    "Session file is corrupt, treating it as empty"
                );
                Ok(BTreeMap::new())
            }
        }
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<()> {
        let json = serde_json::to_string_pretty(map)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    Error::StorageWriteError(format!("{}: {}", parent.display(), e))
                })?;
            }
        }

        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, json)
            .map_err(|e| Error::StorageWriteError(format!("{}: {}", tmp_path.display(), e)))?;

        if let Err(e) = std::fs::rename(&tmp_path, &self.path) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(Error::StorageWriteError(format!(
                "{}: {}",
                self.path.display(),
                e
            )));
        }

        Ok(())
    }
}

impl SessionStorage for FileStorage {
    fn retrieve(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_map()?.remove(key))
    }

    fn store_all(&self, entries: &[(&str, &str)]) -> Result<()> {
        let _guard = self.write_lock.lock();
        let mut map = self.read_map()?;
        for (key, value) in entries {
            map.insert(key.to_string(), value.to_string());
        }
        self.write_map(&map)
    }

    fn delete_all(&self, keys: &[&str]) -> Result<()> {
        let _guard = self.write_lock.lock();
        let mut map = self.read_map()?;
        let before = map.len();
        for key in keys {
            map.remove(*key);
        }
        if map.len() == before && !self.path.exists() {
            return Ok(());
        }
        self.write_map(&map)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();

        let storage = FileStorage::in_dir(dir.path());
        storage
            .store_all(&[("token", "abc"), ("user", r#"{"username":"ann"}"#)])
            .unwrap();

        let reopened = FileStorage::in_dir(dir.path());
        assert_eq!(reopened.retrieve("token").unwrap().as_deref(), Some("abc"));
        assert!(reopened.exists("user").unwrap());
        assert!(!dir.path().join("session.json.tmp").exists());
    }

    #[test]
    fn test_delete_all_removes_keys_together() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::in_dir(dir.path());

        storage
            .store_all(&[("token", "abc"), ("user", "{}"), ("theme", "dark")])
            .unwrap();
        storage.delete_all(&["token", "user"]).unwrap();

        assert!(storage.retrieve("token").unwrap().is_none());
        assert!(storage.retrieve("user").unwrap().is_none());
        assert_eq!(storage.retrieve("theme").unwrap().as_deref(), Some("dark"));
    }

    #[test]
    fn test_missing_file_reads_empty_and_delete_does_not_create_it() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::in_dir(dir.path().join("nested"));

        assert!(storage.retrieve("token").unwrap().is_none());
        storage.delete_all(&["token"]).unwrap();
        assert!(!storage.path().exists());
    }

    #[test]
    fn test_corrupt_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::in_dir(dir.path());
        std::fs::write(storage.path(), "not json at all").unwrap();

        assert!(storage.retrieve("token").unwrap().is_none());

        // The next write replaces the corrupt document
        storage.store("token", "fresh").unwrap();
        assert_eq!(storage.retrieve("token").unwrap().as_deref(), Some("fresh"));
    }

    #[test]
    fn test_unwritable_location_is_a_write_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "a file, not a directory").unwrap();

        let storage = FileStorage::in_dir(&blocker);
        let err = storage.store("token", "abc").unwrap_err();
        assert!(matches!(err, Error::StorageWriteError(_)));
        assert_eq!(err.code(), 401);
    }
}
