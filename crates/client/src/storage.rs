//! Persistent key-value storage for session state.
//!
//! Two backends implement [`Storage`]:
//! - [`FileStorage`]: JSON files in the platform-appropriate config directory:
//!   - Linux: `~/.config/xphub/`
//!   - macOS: `~/Library/Application Support/xphub/`
//!   - Windows: `%APPDATA%\xphub\`
//! - [`MemoryStorage`]: an in-process map, for tests and throwaway sessions.

use std::path::PathBuf;

use dashmap::DashMap;
use serde::{de::DeserializeOwned, Serialize};

pub trait Storage: Send + Sync {
    fn load_raw(&self, key: &str) -> Option<String>;

    /// Returns `true` if the value was written.
    fn save_raw(&self, key: &str, value: &str) -> bool;

    fn remove(&self, key: &str);
}

/// Save a value to storage as JSON.
///
/// Returns `true` if the operation succeeded.
pub fn save<T: Serialize>(storage: &dyn Storage, key: &str, value: &T) -> bool {
    match serde_json::to_string(value) {
        Ok(json) => storage.save_raw(key, &json),
        Err(_) => false,
    }
}

/// Load a JSON value from storage.
///
/// Returns `None` if the key doesn't exist or deserialization fails.
pub fn load<T: DeserializeOwned>(storage: &dyn Storage, key: &str) -> Option<T> {
    let json = storage.load_raw(key)?;
    serde_json::from_str(&json).ok()
}

/// Check if a key exists in storage.
pub fn exists(storage: &dyn Storage, key: &str) -> bool {
    storage.load_raw(key).is_some()
}

// =========================================
// File-backed storage
// =========================================

#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Storage rooted in the platform config directory.
    pub fn in_config_dir() -> Option<Self> {
        let dir = dirs::config_dir()?.join("xphub");
        Some(Self { dir })
    }

    /// Storage rooted in an explicit directory.
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn file_path(&self, key: &str) -> Option<PathBuf> {
        if !self.dir.exists() {
            std::fs::create_dir_all(&self.dir).ok()?;
        }
        // Sanitize key to be a valid filename
        let safe_key = key.replace(['/', '\\', ':', '*', '?', '"', '<', '>', '|'], "_");
        Some(self.dir.join(format!("{}.json", safe_key)))
    }
}

impl Storage for FileStorage {
    fn load_raw(&self, key: &str) -> Option<String> {
        let path = self.file_path(key)?;
        std::fs::read_to_string(path).ok()
    }

    fn save_raw(&self, key: &str, value: &str) -> bool {
        let Some(path) = self.file_path(key) else {
            return false;
        };
        match std::fs::write(&path, value) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to persist key");
                false
            }
        }
    }

    fn remove(&self, key: &str) {
        if let Some(path) = self.file_path(key) {
            let _ = std::fs::remove_file(path);
        }
    }
}

// =========================================
// In-memory storage
// =========================================

#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: DashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn load_raw(&self, key: &str) -> Option<String> {
        self.values.get(key).map(|v| v.value().clone())
    }

    fn save_raw(&self, key: &str, value: &str) -> bool {
        self.values.insert(key.to_string(), value.to_string());
        true
    }

    fn remove(&self, key: &str) {
        self.values.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_storage_round_trips_and_removes() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::at(dir.path().join("nested"));

        assert!(!exists(&storage, "discord_id"));
        assert!(save(&storage, "discord_id", &"123".to_string()));
        assert_eq!(load::<String>(&storage, "discord_id").as_deref(), Some("123"));
        assert!(dir.path().join("nested/discord_id.json").exists());

        storage.remove("discord_id");
        assert!(load::<String>(&storage, "discord_id").is_none());
    }

    #[test]
    fn file_storage_sanitizes_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::at(dir.path());

        assert!(storage.save_raw("a/b:c", "\"x\""));
        assert!(dir.path().join("a_b_c.json").exists());
    }

    #[test]
    fn corrupt_value_loads_as_none() {
        let storage = MemoryStorage::new();
        storage.save_raw("auth_token", "not json");
        assert!(load::<String>(&storage, "auth_token").is_none());
        assert!(exists(&storage, "auth_token"));
    }
}
