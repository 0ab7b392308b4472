//! Credential token persistence.
//!
//! Exactly one item survives a process restart: the opaque bearer token.
//! [`CredentialStore`] is the seam between the transport (which reads the
//! token on every request) and the session store (which owns its lifecycle).

use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::warn;

/// Errors that can occur when persisting the credential.
#[derive(Debug, Error)]
pub enum CredentialStoreError {
    /// Filesystem operation failed.
    #[error("credential storage error: {0}")]
    Io(#[from] std::io::Error),
}

/// Storage for the session credential.
///
/// Absence of a token means the session is anonymous.
pub trait CredentialStore: Send + Sync {
    /// The currently persisted token, if any.
    fn load(&self) -> Option<SecretString>;

    /// Persist a new token, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be written.
    fn store(&self, token: &SecretString) -> Result<(), CredentialStoreError>;

    /// Remove the persisted token. Removing an absent token is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the token exists but cannot be removed.
    fn clear(&self) -> Result<(), CredentialStoreError>;
}

/// File-backed credential store.
///
/// The token is written as-is to a single file; an unreadable or missing
/// file reads as "no credential" so a corrupt token degrades to an
/// anonymous session instead of a hard failure.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    /// Create a store backed by the given file path.
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Option<SecretString> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => {
                let token = contents.trim();
                if token.is_empty() {
                    None
                } else {
                    Some(SecretString::from(token.to_owned()))
                }
            }
            Err(err) if err.kind() == ErrorKind::NotFound => None,
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "Failed to read credential file");
                None
            }
        }
    }

    fn store(&self, token: &SecretString) -> Result<(), CredentialStoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, token.expose_secret())?;
        Ok(())
    }

    fn clear(&self) -> Result<(), CredentialStoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// In-memory credential store for tests and embedded use.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    token: Mutex<Option<SecretString>>,
}

impl MemoryCredentialStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store already holding a token.
    #[must_use]
    pub fn with_token(token: &str) -> Self {
        Self {
            token: Mutex::new(Some(SecretString::from(token.to_owned()))),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Option<SecretString> {
        self.token.lock().ok()?.clone()
    }

    fn store(&self, token: &SecretString) -> Result<(), CredentialStoreError> {
        if let Ok(mut slot) = self.token.lock() {
            *slot = Some(token.clone());
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), CredentialStoreError> {
        if let Ok(mut slot) = self.token.lock() {
            *slot = None;
        }
        Ok(())
    }
}
