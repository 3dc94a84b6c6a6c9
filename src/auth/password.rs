//! auth::password
//!
//! Password scheme: identity + password checked against a salted SHA-256
//! digest held by the credential store.

use std::fmt;
use std::sync::Arc;

use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use super::errors::AuthError;
use super::store::CredentialStore;
use super::{Authenticator, Credentials};
use crate::core::types::Identity;

/// Salted password digest as stored on the server.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PasswordRecord {
    /// Random salt, hex encoded
    pub salt: String,
    /// hex(SHA-256(salt bytes || password))
    pub digest: String,
}

impl PasswordRecord {
    /// Create a record for `password` with a fresh random salt.
    pub fn new(password: &str) -> Self {
        let mut salt = [0u8; 16];
        rand::rngs::OsRng.fill_bytes(&mut salt);
        Self::with_salt(&salt, password)
    }

    fn with_salt(salt: &[u8], password: &str) -> Self {
        Self {
            salt: hex::encode(salt),
            digest: digest(salt, password),
        }
    }

    /// Check a candidate password against this record.
    pub fn matches(&self, password: &str) -> bool {
        let Ok(salt) = hex::decode(&self.salt) else {
            return false;
        };
        constant_time_eq(digest(&salt, password).as_bytes(), self.digest.as_bytes())
    }
}

impl fmt::Debug for PasswordRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordRecord")
            .field("salt", &"[redacted]")
            .field("digest", &"[redacted]")
            .finish()
    }
}

fn digest(salt: &[u8], password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Verifies [`Credentials::Password`] claims.
pub struct PasswordAuthenticator {
    store: Arc<dyn CredentialStore>,
}

impl PasswordAuthenticator {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }
}

impl Authenticator for PasswordAuthenticator {
    fn scheme(&self) -> &'static str {
        "password"
    }

    fn accepts(&self, credentials: &Credentials) -> bool {
        matches!(credentials, Credentials::Password { .. })
    }

    fn verify(&self, credentials: &Credentials) -> Result<Identity, AuthError> {
        let Credentials::Password { identity, password } = credentials else {
            return Err(AuthError::UnsupportedScheme(credentials.scheme()));
        };

        let record = self
            .store
            .password(identity)?
            .ok_or_else(|| AuthError::UnknownIdentity(identity.to_string()))?;

        if !record.matches(password) {
            debug!(identity = %identity, "password rejected");
            return Err(AuthError::BadPassword(identity.to_string()));
        }
        Ok(identity.clone())
    }
}
