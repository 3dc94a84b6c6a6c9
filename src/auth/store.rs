//! auth::store
//!
//! Server-side credential storage.
//!
//! # Security
//!
//! - The file store lives at `~/.pit/credentials.toml` unless configured
//! - File permissions are set to 0600 on Unix (owner read/write only)
//! - All writes are atomic (write to temp file, then rename)
//! - Digests and keys are never logged
//!
//! # Format
//!
//! ```toml
//! [users.alice]
//! salt = "9f2c..."
//! digest = "4b1e..."
//!
//! [keys.key-1a2b3c4d5e6f7a8b]
//! public_key = "d75a98..."
//! ```

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use serde::{Deserialize, Serialize};

use super::errors::CredentialError;
use super::keys::KeyRecord;
use super::password::PasswordRecord;
use crate::core::types::Identity;

/// Storage of password digests and registered public keys.
///
/// Implementations must be thread-safe (Send + Sync) and must never log or
/// include credential material in error messages.
pub trait CredentialStore: Send + Sync {
    /// Password record for `identity`, if registered.
    fn password(&self, identity: &Identity) -> Result<Option<PasswordRecord>, CredentialError>;

    /// Register or replace a password record.
    fn set_password(
        &self,
        identity: &Identity,
        record: PasswordRecord,
    ) -> Result<(), CredentialError>;

    /// Registered public key for a key-derived identity.
    fn public_key(&self, identity: &Identity) -> Result<Option<KeyRecord>, CredentialError>;

    /// Register a public key under its derived identity.
    ///
    /// Fails with [`CredentialError::AlreadyExists`] if a different key is
    /// already registered for the identity.
    fn add_public_key(&self, identity: &Identity, record: KeyRecord)
        -> Result<(), CredentialError>;

    /// Every identity with any registered credential, sorted.
    fn identities(&self) -> Result<Vec<Identity>, CredentialError>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct CredentialFile {
    users: BTreeMap<Identity, PasswordRecord>,
    keys: BTreeMap<Identity, KeyRecord>,
}

impl CredentialFile {
    fn add_key(&mut self, identity: &Identity, record: KeyRecord) -> Result<(), CredentialError> {
        match self.keys.get(identity) {
            Some(existing) if *existing != record => {
                Err(CredentialError::AlreadyExists(identity.to_string()))
            }
            _ => {
                self.keys.insert(identity.clone(), record);
                Ok(())
            }
        }
    }

    fn identities(&self) -> Vec<Identity> {
        let mut all: Vec<Identity> = self.users.keys().chain(self.keys.keys()).cloned().collect();
        all.sort();
        all.dedup();
        all
    }
}

/// File-based credential storage (TOML, 0600).
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_file(&self) -> Result<CredentialFile, CredentialError> {
        if !self.path.exists() {
            return Ok(CredentialFile::default());
        }
        let content = fs::read_to_string(&self.path)
            .map_err(|e| CredentialError::ReadError(format!("cannot read credentials file: {}", e)))?;
        toml::from_str(&content).map_err(|e| {
            CredentialError::ReadError(format!("cannot parse credentials file: {}", e))
        })
    }

    fn write_file(&self, file: &CredentialFile) -> Result<(), CredentialError> {
        let content = toml::to_string_pretty(file)
            .map_err(|e| CredentialError::WriteError(format!("cannot serialize: {}", e)))?;
        write_private(&self.path, content.as_bytes())
    }

    /// Verify file permissions are correct (Unix only).
    ///
    /// Returns true if the file doesn't exist or has 0600 permissions.
    #[cfg(unix)]
    pub fn verify_permissions(&self) -> Result<bool, CredentialError> {
        if !self.path.exists() {
            return Ok(true);
        }
        let metadata = fs::metadata(&self.path)
            .map_err(|e| CredentialError::ReadError(format!("cannot read file metadata: {}", e)))?;
        Ok(metadata.permissions().mode() & 0o777 == 0o600)
    }

    #[cfg(not(unix))]
    pub fn verify_permissions(&self) -> Result<bool, CredentialError> {
        Ok(true)
    }
}

impl CredentialStore for FileCredentialStore {
    fn password(&self, identity: &Identity) -> Result<Option<PasswordRecord>, CredentialError> {
        Ok(self.read_file()?.users.get(identity).cloned())
    }

    fn set_password(
        &self,
        identity: &Identity,
        record: PasswordRecord,
    ) -> Result<(), CredentialError> {
        let mut file = self.read_file()?;
        file.users.insert(identity.clone(), record);
        self.write_file(&file)
    }

    fn public_key(&self, identity: &Identity) -> Result<Option<KeyRecord>, CredentialError> {
        Ok(self.read_file()?.keys.get(identity).cloned())
    }

    fn add_public_key(
        &self,
        identity: &Identity,
        record: KeyRecord,
    ) -> Result<(), CredentialError> {
        let mut file = self.read_file()?;
        file.add_key(identity, record)?;
        self.write_file(&file)
    }

    fn identities(&self) -> Result<Vec<Identity>, CredentialError> {
        Ok(self.read_file()?.identities())
    }
}

/// In-memory credential storage for embedded servers and tests.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    inner: Mutex<CredentialFile>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<T>(&self, f: impl FnOnce(&mut CredentialFile) -> T) -> T {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn password(&self, identity: &Identity) -> Result<Option<PasswordRecord>, CredentialError> {
        Ok(self.with(|file| file.users.get(identity).cloned()))
    }

    fn set_password(
        &self,
        identity: &Identity,
        record: PasswordRecord,
    ) -> Result<(), CredentialError> {
        self.with(|file| file.users.insert(identity.clone(), record));
        Ok(())
    }

    fn public_key(&self, identity: &Identity) -> Result<Option<KeyRecord>, CredentialError> {
        Ok(self.with(|file| file.keys.get(identity).cloned()))
    }

    fn add_public_key(
        &self,
        identity: &Identity,
        record: KeyRecord,
    ) -> Result<(), CredentialError> {
        self.with(|file| file.add_key(identity, record))
    }

    fn identities(&self) -> Result<Vec<Identity>, CredentialError> {
        Ok(self.with(|file| file.identities()))
    }
}

/// Write `content` to `path` atomically with owner-only permissions.
pub(crate) fn write_private(path: &Path, content: &[u8]) -> Result<(), CredentialError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| CredentialError::WriteError(format!("cannot create directory: {}", e)))?;
    }

    let temp_path = path.with_extension("tmp");
    {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .map_err(|e| CredentialError::WriteError(format!("cannot create temp file: {}", e)))?;

        // Restrict permissions before any content lands
        #[cfg(unix)]
        file.set_permissions(fs::Permissions::from_mode(0o600))
            .map_err(|e| CredentialError::WriteError(format!("cannot set permissions: {}", e)))?;

        file.write_all(content)
            .map_err(|e| CredentialError::WriteError(format!("cannot write: {}", e)))?;
        file.sync_all()
            .map_err(|e| CredentialError::WriteError(format!("cannot sync to disk: {}", e)))?;
    }

    fs::rename(&temp_path, path)
        .map_err(|e| CredentialError::WriteError(format!("cannot rename temp file: {}", e)))
}
