//! auth::keys
//!
//! Public-key scheme: the client signs a time-bound challenge with an
//! ed25519 key, the server checks the signature against the registered
//! public key.
//!
//! # Identity Derivation
//!
//! A key's identity is a pure function of its public half
//! ([`derive_identity`]): `key-` followed by the first eight bytes of the
//! SHA-256 of the public key, in hex. No separate user name is needed.
//!
//! # Challenge
//!
//! The signed message is `pit-auth-v1:<public key hex>:<unix seconds>`.
//! The server accepts timestamps within [`CHALLENGE_WINDOW_SECS`] of its own
//! clock in either direction.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use super::errors::{AuthError, CredentialError};
use super::store::{write_private, CredentialStore};
use super::{Authenticator, Credentials};
use crate::core::types::Identity;

/// Accepted clock skew for signed challenges, in seconds.
pub const CHALLENGE_WINDOW_SECS: i64 = 300;

const CHALLENGE_DOMAIN: &str = "pit-auth-v1";

/// Identity owned by a public key.
pub fn derive_identity(key: &VerifyingKey) -> Identity {
    Identity::from_key_digest(&Sha256::digest(key.as_bytes()))
}

/// Bytes signed for a challenge at `timestamp`.
pub fn challenge_message(public_key_hex: &str, timestamp: i64) -> Vec<u8> {
    format!("{CHALLENGE_DOMAIN}:{public_key_hex}:{timestamp}").into_bytes()
}

fn decode_fixed<const N: usize>(hex_str: &str, what: &str) -> Result<[u8; N], String> {
    let bytes = hex::decode(hex_str).map_err(|e| format!("{what} is not hex: {e}"))?;
    bytes
        .try_into()
        .map_err(|_| format!("{what} must be {N} bytes"))
}

fn parse_public_key(hex_str: &str) -> Result<VerifyingKey, String> {
    let bytes = decode_fixed::<32>(hex_str, "public key")?;
    VerifyingKey::from_bytes(&bytes).map_err(|e| format!("invalid public key: {e}"))
}

/// A registered public key as stored on the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyRecord {
    /// ed25519 public key, hex encoded
    pub public_key: String,
}

impl KeyRecord {
    pub fn new(key: &VerifyingKey) -> Self {
        Self {
            public_key: hex::encode(key.as_bytes()),
        }
    }

    /// Parse a hex public key as supplied by `pit keys add`.
    pub fn from_hex(public_key: &str) -> Result<Self, CredentialError> {
        let key = parse_public_key(public_key.trim()).map_err(CredentialError::InvalidKey)?;
        Ok(Self::new(&key))
    }

    pub fn verifying_key(&self) -> Result<VerifyingKey, CredentialError> {
        parse_public_key(&self.public_key).map_err(CredentialError::InvalidKey)
    }

    pub fn identity(&self) -> Result<Identity, CredentialError> {
        Ok(derive_identity(&self.verifying_key()?))
    }
}

/// A client signing key.
pub struct KeyPair {
    signing: SigningKey,
}

impl KeyPair {
    /// Generate a fresh key from the OS RNG.
    pub fn generate() -> Self {
        Self {
            signing: SigningKey::generate(&mut rand::rngs::OsRng),
        }
    }

    /// Load a key file (hex encoded secret key).
    pub fn load(path: &Path) -> Result<Self, CredentialError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CredentialError::ReadError(format!("cannot read key file '{}': {}", path.display(), e))
        })?;
        let bytes =
            decode_fixed::<32>(content.trim(), "secret key").map_err(CredentialError::InvalidKey)?;
        Ok(Self {
            signing: SigningKey::from_bytes(&bytes),
        })
    }

    /// Save the secret key with owner-only permissions.
    ///
    /// Refuses to overwrite an existing key file.
    pub fn save(&self, path: &Path) -> Result<(), CredentialError> {
        if path.exists() {
            return Err(CredentialError::AlreadyExists(path.display().to_string()));
        }
        let content = format!("{}\n", hex::encode(self.signing.to_bytes()));
        write_private(path, content.as_bytes())
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing.verifying_key()
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.verifying_key().as_bytes())
    }

    pub fn identity(&self) -> Identity {
        derive_identity(&self.verifying_key())
    }

    pub fn record(&self) -> KeyRecord {
        KeyRecord::new(&self.verifying_key())
    }

    /// Sign a challenge for the current time.
    pub fn credentials(&self) -> Credentials {
        self.credentials_at(Utc::now().timestamp())
    }

    /// Sign a challenge for `timestamp`.
    pub fn credentials_at(&self, timestamp: i64) -> Credentials {
        let public_key = self.public_key_hex();
        let signature = self
            .signing
            .sign(&challenge_message(&public_key, timestamp));
        Credentials::Signature {
            public_key,
            timestamp,
            signature: hex::encode(signature.to_bytes()),
        }
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key_hex())
            .field("secret", &"[redacted]")
            .finish()
    }
}

/// Verifies [`Credentials::Signature`] claims.
pub struct KeyAuthenticator {
    store: Arc<dyn CredentialStore>,
    window_secs: u64,
}

impl KeyAuthenticator {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self {
            store,
            window_secs: CHALLENGE_WINDOW_SECS.unsigned_abs(),
        }
    }

    /// Verify against an explicit clock reading.
    pub fn verify_at(&self, credentials: &Credentials, now: i64) -> Result<Identity, AuthError> {
        let Credentials::Signature {
            public_key,
            timestamp,
            signature,
        } = credentials
        else {
            return Err(AuthError::UnsupportedScheme(credentials.scheme()));
        };

        let key = parse_public_key(public_key).map_err(AuthError::MalformedProof)?;
        let identity = derive_identity(&key);

        let skew = now.abs_diff(*timestamp);
        if skew > self.window_secs {
            return Err(AuthError::StaleChallenge {
                skew_secs: skew,
                window_secs: self.window_secs,
            });
        }

        let registered = self
            .store
            .public_key(&identity)?
            .ok_or_else(|| AuthError::UnknownIdentity(identity.to_string()))?;
        if registered.verifying_key()? != key {
            return Err(AuthError::BadSignature(identity.to_string()));
        }

        let sig_bytes = decode_fixed::<64>(signature, "signature").map_err(AuthError::MalformedProof)?;
        let signature = Signature::from_bytes(&sig_bytes);
        key.verify_strict(&challenge_message(public_key, *timestamp), &signature)
            .map_err(|_| {
                debug!(identity = %identity, "signature rejected");
                AuthError::BadSignature(identity.to_string())
            })?;

        Ok(identity)
    }
}

impl Authenticator for KeyAuthenticator {
    fn scheme(&self) -> &'static str {
        "key"
    }

    fn accepts(&self, credentials: &Credentials) -> bool {
        matches!(credentials, Credentials::Signature { .. })
    }

    fn verify(&self, credentials: &Credentials) -> Result<Identity, AuthError> {
        self.verify_at(credentials, Utc::now().timestamp())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::store::MemoryCredentialStore;
    use tempfile::TempDir;

    const NOW: i64 = 1_800_000_000;

    fn registered(key: &KeyPair) -> KeyAuthenticator {
        let store = MemoryCredentialStore::new();
        store.add_public_key(&key.identity(), key.record()).unwrap();
        KeyAuthenticator::new(Arc::new(store))
    }

    #[test]
    fn identity_is_deterministic() {
        let key = KeyPair::generate();
        assert_eq!(key.identity(), key.identity());
        assert_eq!(key.record().identity().unwrap(), key.identity());
        assert!(key.identity().as_str().starts_with("key-"));
        assert_eq!(key.identity().as_str().len(), "key-".len() + 16);
    }

    #[test]
    fn distinct_keys_distinct_identities() {
        assert_ne!(KeyPair::generate().identity(), KeyPair::generate().identity());
    }

    #[test]
    fn valid_signature_verifies() {
        let key = KeyPair::generate();
        let creds = key.credentials_at(NOW);
        assert_eq!(registered(&key).verify_at(&creds, NOW + 10).unwrap(), key.identity());
    }

    #[test]
    fn stale_challenge_rejected() {
        let key = KeyPair::generate();
        let creds = key.credentials_at(NOW);
        let auth = registered(&key);

        assert!(auth.verify_at(&creds, NOW + CHALLENGE_WINDOW_SECS).is_ok());
        assert!(matches!(
            auth.verify_at(&creds, NOW + CHALLENGE_WINDOW_SECS + 1),
            Err(AuthError::StaleChallenge { .. })
        ));
    }

    #[test]
    fn extreme_timestamps_are_stale() {
        let key = KeyPair::generate();
        let auth = registered(&key);
        for timestamp in [i64::MIN, i64::MAX] {
            let creds = key.credentials_at(timestamp);
            assert!(matches!(
                auth.verify_at(&creds, NOW),
                Err(AuthError::StaleChallenge { .. })
            ));
        }
        assert!(matches!(
            auth.verify_at(&key.credentials_at(0), i64::MIN),
            Err(AuthError::StaleChallenge { .. })
        ));
    }

    #[test]
    fn unregistered_key_rejected() {
        let key = KeyPair::generate();
        let other = KeyPair::generate();
        let creds = other.credentials_at(NOW);
        assert!(matches!(
            registered(&key).verify_at(&creds, NOW),
            Err(AuthError::UnknownIdentity(_))
        ));
    }

    #[test]
    fn tampered_timestamp_rejected() {
        let key = KeyPair::generate();
        let Credentials::Signature {
            public_key,
            signature,
            ..
        } = key.credentials_at(NOW)
        else {
            panic!("expected signature credentials");
        };
        let forged = Credentials::Signature {
            public_key,
            timestamp: NOW + 1,
            signature,
        };
        assert!(matches!(
            registered(&key).verify_at(&forged, NOW),
            Err(AuthError::BadSignature(_))
        ));
    }

    #[test]
    fn malformed_proof_rejected() {
        let key = KeyPair::generate();
        let creds = Credentials::Signature {
            public_key: "zz".into(),
            timestamp: NOW,
            signature: "00".into(),
        };
        assert!(matches!(
            registered(&key).verify_at(&creds, NOW),
            Err(AuthError::MalformedProof(_))
        ));
    }

    #[test]
    fn key_file_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("id_ed25519");
        let key = KeyPair::generate();
        key.save(&path).unwrap();

        let loaded = KeyPair::load(&path).unwrap();
        assert_eq!(loaded.public_key_hex(), key.public_key_hex());
        assert!(matches!(
            key.save(&path),
            Err(CredentialError::AlreadyExists(_))
        ));
    }

    #[test]
    fn debug_hides_secret() {
        let key = KeyPair::generate();
        let secret = hex::encode(key.signing.to_bytes());
        assert!(!format!("{:?}", key).contains(&secret));
    }
}
