//! Local preferences, persisted as JSON blobs under string keys in a small
//! key/value file.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to access settings store: {0}")]
    Io(#[from] std::io::Error),
    #[error("settings are not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub push_notifications_enabled: bool,
    /// UI preferences this crate does not interpret, kept for round-tripping.
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl Settings {
    pub fn parse(raw: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// String-keyed store whose values are opaque strings, backed by one JSON file.
#[derive(Debug, Clone)]
pub struct LocalStore {
    path: PathBuf,
}

impl LocalStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get_item(&self, key: &str) -> Result<Option<String>, SettingsError> {
        Ok(self.read_all()?.remove(key))
    }

    pub fn set_item(&self, key: &str, value: &str) -> Result<(), SettingsError> {
        let mut items = self.read_all()?;
        items.insert(key.to_string(), value.to_string());
        let contents = serde_json::to_string_pretty(&items)?;
        std::fs::write(&self.path, contents)?;
        Ok(())
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, SettingsError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Reads the settings blob under `key`. Missing or unreadable settings mean
/// push notifications are disabled.
pub fn load_settings(store: &LocalStore, key: &str) -> Settings {
    let raw = match store.get_item(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Settings::default(),
        Err(err) => {
            tracing::warn!(error = %err, path = %store.path().display(), "failed to read settings store");
            return Settings::default();
        }
    };

    match Settings::parse(&raw) {
        Ok(settings) => settings,
        Err(err) => {
            tracing::warn!(error = %err, %key, "failed to parse settings; push notifications disabled");
            Settings::default()
        }
    }
}

pub fn save_settings(store: &LocalStore, key: &str, settings: &Settings) -> Result<(), SettingsError> {
    let raw = serde_json::to_string(settings)?;
    store.set_item(key, &raw)
}
