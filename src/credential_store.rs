//! Persistence for OAuth credentials between runs.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::error::AuthError;
use crate::models::Credential;

/// Default token cache file, relative to the working directory.
pub const DEFAULT_TOKEN_CACHE: &str = "token.json";

/// Loads and saves the credential reused across runs.
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> Result<Option<Credential>, AuthError>;

    /// Replace whatever was stored before.
    fn save(&self, credential: &Credential) -> Result<(), AuthError>;
}

/// JSON token cache on disk.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn cache_error(&self, source: std::io::Error) -> AuthError {
        AuthError::Cache {
            path: self.path.clone(),
            source,
        }
    }
}

impl Default for FileCredentialStore {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_CACHE)
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<Credential>, AuthError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no cached credential");
                return Ok(None);
            }
            Err(e) => return Err(self.cache_error(e)),
        };

        match serde_json::from_str(&content) {
            Ok(credential) => Ok(Some(credential)),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring unreadable token cache");
                Ok(None)
            }
        }
    }

    fn save(&self, credential: &Credential) -> Result<(), AuthError> {
        let json = serde_json::to_string_pretty(credential)
            .map_err(|e| self.cache_error(std::io::Error::other(e)))?;

        // Write next to the target and rename so a crash never leaves half a file.
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, json).map_err(|e| self.cache_error(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.cache_error(e))?;

        debug!(path = %self.path.display(), "saved credential");
        Ok(())
    }
}

/// In-memory store, mostly useful for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    credential: Mutex<Option<Credential>>,
    saves: AtomicUsize,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(credential: Credential) -> Self {
        Self {
            credential: Mutex::new(Some(credential)),
            saves: AtomicUsize::new(0),
        }
    }

    /// Number of `save` calls so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn current(&self) -> Option<Credential> {
        self.credential
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<Option<Credential>, AuthError> {
        Ok(self.current())
    }

    fn save(&self, credential: &Credential) -> Result<(), AuthError> {
        *self
            .credential
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(credential.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
