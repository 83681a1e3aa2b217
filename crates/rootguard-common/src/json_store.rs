//! JSON persistence utilities
//!
//! Loading and saving of the serialized record sets. Writes that replace
//! security state go through [`save_json_atomic`] so a crash mid-write never
//! leaves a truncated file behind.

use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;
use thiserror::Error;

/// JSON store errors
#[derive(Debug, Error)]
pub enum JsonStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type for JSON store operations
pub type JsonStoreResult<T> = Result<T, JsonStoreError>;

/// Load JSON from file, returning default if file doesn't exist
pub fn load_json_or_default<T, P>(path: P) -> JsonStoreResult<T>
where
    T: DeserializeOwned + Default,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    if !path.exists() {
        return Ok(T::default());
    }
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Save value as JSON atomically (write to temp, then rename)
pub fn save_json_atomic<T, P>(path: P, value: &T) -> JsonStoreResult<()>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = serde_json::to_string_pretty(value)?;

    let temp_path = path.with_extension("tmp");
    std::fs::write(&temp_path, &content)?;
    restrict_permissions(&temp_path)?;
    std::fs::rename(&temp_path, path)?;

    Ok(())
}

/// Owner-only read/write on unix; no-op elsewhere.
#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use tempfile::tempdir;

    #[derive(Debug, Serialize, Deserialize, Default, PartialEq)]
    struct TestRecords {
        name: String,
        count: i32,
    }

    #[test]
    fn test_load_or_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nonexistent.json");

        let records: TestRecords = load_json_or_default(&path).unwrap();
        assert_eq!(records, TestRecords::default());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("corrupt.json");
        std::fs::write(&path, "{not json").unwrap();

        let result: JsonStoreResult<TestRecords> = load_json_or_default(&path);
        assert!(matches!(result, Err(JsonStoreError::Serialize(_))));
    }

    #[test]
    fn test_atomic_save_replaces_existing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("records.json");

        save_json_atomic(&path, &TestRecords::default()).unwrap();
        let records = TestRecords {
            name: "second".to_string(),
            count: 2,
        };
        save_json_atomic(&path, &records).unwrap();

        let loaded: TestRecords = load_json_or_default(&path).unwrap();
        assert_eq!(records, loaded);
    }

    #[test]
    fn test_atomic_save() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("atomic.json");

        let records = TestRecords {
            name: "atomic".to_string(),
            count: 100,
        };

        save_json_atomic(&path, &records).unwrap();

        assert!(!path.with_extension("tmp").exists());

        let loaded: TestRecords = load_json_or_default(&path).unwrap();
        assert_eq!(records, loaded);
    }

    #[cfg(unix)]
    #[test]
    fn test_atomic_save_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("private.json");
        save_json_atomic(&path, &TestRecords::default()).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
