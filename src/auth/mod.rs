//! auth - authentication capability and ownership policy
//!
//! # Architecture
//!
//! The sync engine needs exactly two capabilities from this module:
//!
//! - [`Authenticator::verify`]: turn a credential claim into an [`Identity`]
//!   or reject it
//! - [`AccessPolicy::owns`]: decide whether an identity may touch a
//!   repository
//!
//! Schemes are interchangeable behind [`Authenticator`]:
//!
//! - [`PasswordAuthenticator`] - identity + password against a salted digest
//! - [`KeyAuthenticator`] - ed25519 signature over a time-bound challenge;
//!   the identity is derived from the public key
//!
//! [`MultiAuthenticator`] routes a claim to whichever scheme accepts it.
//!
//! # Security
//!
//! Passwords, digests and secret keys never appear in logs, errors or
//! `Debug` output.
//!
//! # Example
//!
//! ```
//! use pit::auth::{create_authenticator, Authenticator, CredentialStore, KeyPair, MemoryCredentialStore};
//! use std::sync::Arc;
//!
//! let store = Arc::new(MemoryCredentialStore::new());
//! let key = KeyPair::generate();
//! store.add_public_key(&key.identity(), key.record()).unwrap();
//!
//! let auth = create_authenticator(store);
//! assert_eq!(auth.verify(&key.credentials()).unwrap(), key.identity());
//! ```

mod errors;
pub mod keys;
pub mod password;
pub mod store;

use std::fmt;
use std::sync::Arc;

pub use errors::{AuthError, CredentialError};
pub use keys::{derive_identity, KeyAuthenticator, KeyPair, KeyRecord, CHALLENGE_WINDOW_SECS};
pub use password::{PasswordAuthenticator, PasswordRecord};
pub use store::{CredentialStore, FileCredentialStore, MemoryCredentialStore};

use crate::core::types::{Identity, RepoRef};

/// A credential claim presented by a client.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Claimed identity plus password.
    Password { identity: Identity, password: String },
    /// Public key, signed timestamp and signature (all hex except the time).
    Signature {
        public_key: String,
        timestamp: i64,
        signature: String,
    },
}

impl Credentials {
    pub fn password(identity: Identity, password: impl Into<String>) -> Self {
        Credentials::Password {
            identity,
            password: password.into(),
        }
    }

    /// Name of the scheme this claim belongs to.
    pub fn scheme(&self) -> &'static str {
        match self {
            Credentials::Password { .. } => "password",
            Credentials::Signature { .. } => "key",
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Password { identity, .. } => f
                .debug_struct("Password")
                .field("identity", identity)
                .field("password", &"[redacted]")
                .finish(),
            Credentials::Signature {
                public_key,
                timestamp,
                ..
            } => f
                .debug_struct("Signature")
                .field("public_key", public_key)
                .field("timestamp", timestamp)
                .finish_non_exhaustive(),
        }
    }
}

/// Capability to verify a credential claim.
///
/// Implementations must be thread-safe; the engine shares one instance
/// across concurrent requests.
pub trait Authenticator: Send + Sync {
    /// Scheme name for logs and errors.
    fn scheme(&self) -> &'static str;

    /// Whether this authenticator handles this kind of claim.
    fn accepts(&self, credentials: &Credentials) -> bool;

    /// Verify the claim, returning the authenticated identity.
    fn verify(&self, credentials: &Credentials) -> Result<Identity, AuthError>;
}

/// Routes each claim to the first scheme that accepts it.
#[derive(Default)]
pub struct MultiAuthenticator {
    schemes: Vec<Box<dyn Authenticator>>,
}

impl MultiAuthenticator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, scheme: impl Authenticator + 'static) -> Self {
        self.schemes.push(Box::new(scheme));
        self
    }
}

impl Authenticator for MultiAuthenticator {
    fn scheme(&self) -> &'static str {
        "multi"
    }

    fn accepts(&self, credentials: &Credentials) -> bool {
        self.schemes.iter().any(|s| s.accepts(credentials))
    }

    fn verify(&self, credentials: &Credentials) -> Result<Identity, AuthError> {
        self.schemes
            .iter()
            .find(|s| s.accepts(credentials))
            .ok_or(AuthError::UnsupportedScheme(credentials.scheme()))?
            .verify(credentials)
    }
}

/// Both built-in schemes over one credential store.
pub fn create_authenticator(store: Arc<dyn CredentialStore>) -> MultiAuthenticator {
    MultiAuthenticator::new()
        .with(PasswordAuthenticator::new(Arc::clone(&store)))
        .with(KeyAuthenticator::new(store))
}

/// Capability to decide repository ownership.
pub trait AccessPolicy: Send + Sync {
    fn owns(&self, identity: &Identity, repo: &RepoRef) -> bool;
}

/// Only the owner named in the repository address may access it.
#[derive(Debug, Clone, Copy, Default)]
pub struct OwnerPolicy;

impl AccessPolicy for OwnerPolicy {
    fn owns(&self, identity: &Identity, repo: &RepoRef) -> bool {
        &repo.owner == identity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_alice() -> Arc<MemoryCredentialStore> {
        let store = Arc::new(MemoryCredentialStore::new());
        store
            .set_password(&Identity::new("alice").unwrap(), PasswordRecord::new("pw"))
            .unwrap();
        store
    }

    #[test]
    fn multi_routes_by_scheme() {
        let store = store_with_alice();
        let key = KeyPair::generate();
        store.add_public_key(&key.identity(), key.record()).unwrap();
        let auth = create_authenticator(store);

        let alice = Identity::new("alice").unwrap();
        assert_eq!(
            auth.verify(&Credentials::password(alice.clone(), "pw"))
                .unwrap(),
            alice
        );
        assert_eq!(auth.verify(&key.credentials()).unwrap(), key.identity());
    }

    #[test]
    fn empty_multi_rejects_everything() {
        let auth = MultiAuthenticator::new();
        let creds = Credentials::password(Identity::new("alice").unwrap(), "pw");
        assert!(!auth.accepts(&creds));
        assert!(matches!(
            auth.verify(&creds),
            Err(AuthError::UnsupportedScheme("password"))
        ));
    }

    #[test]
    fn password_only_rejects_keys() {
        let auth = MultiAuthenticator::new().with(PasswordAuthenticator::new(store_with_alice()));
        let key = KeyPair::generate();
        assert!(matches!(
            auth.verify(&key.credentials()),
            Err(AuthError::UnsupportedScheme("key"))
        ));
    }

    #[test]
    fn debug_redacts_password() {
        let creds = Credentials::password(Identity::new("alice").unwrap(), "s3cret");
        assert!(!format!("{:?}", creds).contains("s3cret"));
    }

    #[test]
    fn owner_policy() {
        let repo = RepoRef::parse("alice/proj").unwrap();
        assert!(OwnerPolicy.owns(&Identity::new("alice").unwrap(), &repo));
        assert!(!OwnerPolicy.owns(&Identity::new("bob").unwrap(), &repo));
    }
}
