//! Durable key/value storage for the roster and the remembered device.
//!
//! Values are plain strings keyed by name, the same shape as browser local storage.

use std::{
    collections::HashMap,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use thiserror::Error;

use crate::{link::DeviceId, roster::Roster};

pub const ROSTER_KEY: &str = "players";
pub const DEVICE_ID_KEY: &str = "myBleDeviceId";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization Error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid storage key '{0}'")]
    InvalidKey(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

pub trait Storage {
    fn get(&self, key: &str) -> StorageResult<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> StorageResult<()>;
}

impl<S: Storage + ?Sized> Storage for &mut S {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> StorageResult<()> {
        (**self).set(key, value)
    }
}

/// Stores each key as a file inside `dir`.
///
/// Clones share the directory; callers are expected to write disjoint keys.
#[derive(Clone, Debug)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> StorageResult<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_owned()));
        }
        Ok(self.dir.join(key))
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        match std::fs::read_to_string(self.path(key)?) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> StorageResult<()> {
        let path = self.path(key)?;
        std::fs::create_dir_all(&self.dir)?;
        // Replace atomically, a torn write would lose the whole roster
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, value)?;
        std::fs::rename(tmp, path)?;
        Ok(())
    }
}

#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    values: HashMap<String, String>,
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> StorageResult<()> {
        self.values.insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

/// Restores the roster saved by [`save_roster`].
///
/// A missing or unreadable roster is never fatal, the application simply starts empty.
pub fn load_roster(storage: &impl Storage) -> Roster {
    let json = match storage.get(ROSTER_KEY) {
        Ok(Some(json)) => json,
        Ok(None) => return Roster::new(),
        Err(e) => {
            tracing::error!(%e, "Failed to read saved players");
            return Roster::new();
        }
    };
    match Roster::from_json(&json) {
        Ok(roster) => {
            tracing::info!(count = roster.len(), "Restored saved players");
            roster
        }
        Err(e) => {
            tracing::error!(%e, "Saved players are corrupt, starting with an empty list");
            Roster::new()
        }
    }
}

pub fn save_roster(storage: &mut impl Storage, roster: &Roster) -> StorageResult<()> {
    storage.set(ROSTER_KEY, &roster.to_json()?)
}

pub fn remembered_device(storage: &impl Storage) -> StorageResult<Option<DeviceId>> {
    Ok(storage
        .get(DEVICE_ID_KEY)?
        .map(|id| id.trim().to_owned())
        .filter(|id| !id.is_empty())
        .map(DeviceId::from))
}

pub fn remember_device(storage: &mut impl Storage, id: &DeviceId) -> StorageResult<()> {
    storage.set(DEVICE_ID_KEY, id.as_str())
}
