//! Durable client-side key/value state (token, username, theme).
//!
//! A single JSON map on disk, read tolerantly: a missing or corrupt file
//! behaves like an empty store so a damaged state dir never locks the user
//! out of the login screen.

use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use crate::error::{SatchelError, SatchelResult};

pub const TOKEN_KEY: &str = "auth_token";
pub const USERNAME_KEY: &str = "auth_username";
pub const THEME_KEY: &str = "theme";

const STORE_FILE: &str = "storage.json";

pub struct KeyValueStore {
    path: PathBuf,
    values: Map<String, Value>,
}

impl KeyValueStore {
    /// Open the store under `state_dir`, loading any existing values.
    pub fn open(state_dir: &Path) -> Self {
        let path = state_dir.join(STORE_FILE);
        let values = std::fs::read_to_string(&path)
            .ok()
            .and_then(|raw| serde_json::from_str::<Value>(&raw).ok())
            .and_then(|value| match value {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .unwrap_or_default();

        Self { path, values }
    }

    /// Returns the stored string for `key`, or an empty string when absent.
    pub fn get(&self, key: &str) -> String {
        self.values
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    pub fn set(&mut self, key: &str, value: &str) -> SatchelResult<()> {
        self.values
            .insert(key.to_string(), Value::String(value.to_string()));
        self.persist()
    }

    pub fn remove(&mut self, key: &str) -> SatchelResult<()> {
        self.values.remove(key);
        self.persist()
    }

    fn persist(&self) -> SatchelResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SatchelError::storage(parent.to_string_lossy(), e))?;
        }
        let body = serde_json::to_string_pretty(&Value::Object(self.values.clone()))
            .map_err(|e| SatchelError::storage(self.path.to_string_lossy(), e.into()))?;
        std::fs::write(&self.path, body)
            .map_err(|e| SatchelError::storage(self.path.to_string_lossy(), e))
    }
}
