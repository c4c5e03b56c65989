use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Mutex,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::StoreError;

/// Durable slot holding at most one bearer credential.
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> Option<StoredCredential>;
    fn save(&self, token: &str) -> Result<(), StoreError>;
    fn clear(&self) -> Result<(), StoreError>;
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredential {
    pub token: String,
    pub saved_at: DateTime<Utc>,
}

impl StoredCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            saved_at: Utc::now(),
        }
    }
}

impl std::fmt::Debug for StoredCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredCredential")
            .field("token", &"<redacted>")
            .field("saved_at", &self.saved_at)
            .finish()
    }
}

pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Option<StoredCredential> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return None,
            Err(err) => {
                warn!(path = %self.path.display(), "credential store: unreadable file: {err}");
                return None;
            }
        };

        match serde_json::from_slice::<StoredCredential>(&raw) {
            Ok(stored) if !stored.token.trim().is_empty() => Some(stored),
            Ok(_) => None,
            Err(err) => {
                warn!(path = %self.path.display(), "credential store: corrupt file ignored: {err}");
                None
            }
        }
    }

    fn save(&self, token: &str) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
            }
        }
        let encoded = serde_json::to_vec_pretty(&StoredCredential::new(token))?;
        fs::write(&self.path, encoded).map_err(|e| self.io_error(e))
    }

    fn clear(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(self.io_error(err)),
        }
    }
}

#[derive(Default)]
pub struct MemoryCredentialStore {
    slot: Mutex<Option<StoredCredential>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            slot: Mutex::new(Some(StoredCredential::new(token))),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Option<StoredCredential> {
        self.slot.lock().ok()?.clone()
    }

    fn save(&self, token: &str) -> Result<(), StoreError> {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = Some(StoredCredential::new(token));
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = None;
        }
        Ok(())
    }
}
