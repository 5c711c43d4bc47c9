//! Key-namespaced snapshot storage for session state.
//!
//! Stores write a whole-state JSON snapshot after every mutating action and
//! read it back once when a session is opened. Writes are best-effort: a
//! failure is logged and the action still succeeds.

use std::{
    collections::HashMap,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Mutex,
};

use serde::{Serialize, de::DeserializeOwned};

use crate::error::{AppError, AppResult};

pub const AUTH_STORAGE_KEY: &str = "auth-storage";
pub const CART_STORAGE_KEY: &str = "cart-storage";
pub const PURCHASE_STORAGE_KEY: &str = "purchase-storage";

/// Every key a session writes; purged when the session goes away.
pub const SNAPSHOT_KEYS: [&str; 3] = [AUTH_STORAGE_KEY, CART_STORAGE_KEY, PURCHASE_STORAGE_KEY];

pub trait LocalStorage: Send + Sync {
    fn get_item(&self, key: &str) -> AppResult<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> AppResult<()>;
    fn remove_item(&self, key: &str) -> AppResult<()>;
}

/// One `<key>.json` file per key under a base directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    base_path: PathBuf,
}

impl FileStorage {
    pub fn new(base_path: impl AsRef<Path>) -> AppResult<Self> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)?;
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.base_path.join(format!("{key}.json"))
    }
}

impl LocalStorage for FileStorage {
    fn get_item(&self, key: &str) -> AppResult<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> AppResult<()> {
        // Write to a sibling file first so a crash never leaves half a snapshot.
        let target = self.path_for(key);
        let tmp = self.base_path.join(format!("{key}.json.tmp"));
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &target)?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> AppResult<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_items<T>(&self, f: impl FnOnce(&mut HashMap<String, String>) -> T) -> AppResult<T> {
        let mut items = self
            .items
            .lock()
            .map_err(|_| AppError::Internal(anyhow::anyhow!("memory storage lock poisoned")))?;
        Ok(f(&mut items))
    }
}

impl LocalStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> AppResult<Option<String>> {
        self.with_items(|items| items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> AppResult<()> {
        self.with_items(|items| {
            items.insert(key.to_string(), value.to_string());
        })
    }

    fn remove_item(&self, key: &str) -> AppResult<()> {
        self.with_items(|items| {
            items.remove(key);
        })
    }
}

/// Serializes `value` under `key`, logging instead of failing.
pub fn persist<T: Serialize>(storage: &dyn LocalStorage, key: &str, value: &T) {
    let result = serde_json::to_string(value)
        .map_err(AppError::from)
        .and_then(|json| storage.set_item(key, &json));
    if let Err(err) = result {
        tracing::warn!(key, error = %err, "failed to persist snapshot");
    }
}

/// Reads the snapshot under `key`; missing or unreadable snapshots yield `None`.
pub fn restore<T: DeserializeOwned>(storage: &dyn LocalStorage, key: &str) -> Option<T> {
    let raw = match storage.get_item(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(err) => {
            tracing::warn!(key, error = %err, "failed to read snapshot");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(key, error = %err, "discarding unreadable snapshot");
            None
        }
    }
}
