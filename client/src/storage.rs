//! Durable key/value storage for the few values that outlive a session.
//!
//! DESIGN
//! ======
//! A single JSON object on disk, read once on open and rewritten whole on
//! every change. Writes land in a sibling temp file first and are renamed
//! over the target so a crash never leaves a truncated file behind.
//!
//! ERROR HANDLING
//! ==============
//! A value of the wrong shape reads as absent. IO and parse failures on open
//! or write surface as `StorageError`.

#[cfg(test)]
#[path = "storage_test.rs"]
mod storage_test;

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::StorageError;

pub const TOKEN_KEY: &str = "token";
pub const SIDEBAR_COLLAPSED_KEY: &str = "sidebar_collapsed";

const APP_DIR: &str = "catalyst";
const FILE_NAME: &str = "storage.json";

#[derive(Debug)]
pub struct LocalStorage {
    path: PathBuf,
    values: Map<String, Value>,
}

impl LocalStorage {
    /// Open the storage file for `config`: `state_dir` when set, otherwise
    /// the platform config directory.
    ///
    /// # Errors
    ///
    /// `NoStateDir` when neither is available, plus any read failure.
    pub fn open(config: &ClientConfig) -> Result<Self, StorageError> {
        let dir = match &config.state_dir {
            Some(dir) => dir.clone(),
            None => dirs::config_dir().ok_or(StorageError::NoStateDir)?.join(APP_DIR),
        };
        Self::open_at(dir.join(FILE_NAME))
    }

    /// Open a storage file at an explicit path. A missing or empty file is
    /// an empty store.
    ///
    /// # Errors
    ///
    /// Read failures other than not-found, and non-object JSON content.
    pub fn open_at(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => Map::new(),
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), keys = values.len(), "storage opened");
        Ok(Self { path, values })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.values.get(key)?;
        serde_json::from_value(value.clone()).ok()
    }

    /// Store `value` under `key` and write the file.
    ///
    /// # Errors
    ///
    /// Serialization or write failure. The in-memory value is kept either way.
    pub fn set<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), StorageError> {
        self.values.insert(key.to_owned(), serde_json::to_value(value)?);
        self.flush()
    }

    /// # Errors
    ///
    /// Write failure.
    pub fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        if self.values.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }

    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.get::<String>(TOKEN_KEY).filter(|t| !t.is_empty())
    }

    /// Persist or forget the session token.
    ///
    /// # Errors
    ///
    /// Write failure.
    pub fn set_token(&mut self, token: Option<&str>) -> Result<(), StorageError> {
        match token {
            Some(token) if !token.is_empty() => self.set(TOKEN_KEY, &token),
            _ => self.remove(TOKEN_KEY),
        }
    }

    fn flush(&self) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&self.values)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
