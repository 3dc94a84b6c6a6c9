//! auth::errors
//!
//! Authentication and credential store error types.
//!
//! # Design
//!
//! Error messages never contain passwords, digests or key material. A
//! failed verification names the identity and the scheme at most.
//!
//! # Example
//!
//! ```
//! use pit::auth::AuthError;
//!
//! let err = AuthError::BadPassword("alice".to_string());
//! assert!(err.to_string().contains("alice"));
//! assert!(err.is_rejection());
//! ```

use thiserror::Error;

/// Errors from verifying a credential claim.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No credential is registered for the claimed identity.
    #[error("unknown identity '{0}'")]
    UnknownIdentity(String),

    /// Password did not match the stored digest.
    #[error("password rejected for '{0}'")]
    BadPassword(String),

    /// Signature did not verify against the registered public key.
    #[error("signature rejected for '{0}'")]
    BadSignature(String),

    /// The signed timestamp is outside the accepted window.
    #[error("signed challenge expired ({skew_secs}s outside the {window_secs}s window)")]
    StaleChallenge { skew_secs: u64, window_secs: u64 },

    /// The proof could not be decoded.
    #[error("malformed proof: {0}")]
    MalformedProof(String),

    /// No configured authenticator accepts this kind of proof.
    #[error("unsupported authentication scheme '{0}'")]
    UnsupportedScheme(&'static str),

    /// Credential store failure (not a rejection).
    #[error(transparent)]
    Store(#[from] CredentialError),
}

impl AuthError {
    /// Whether this is a definitive rejection of the claim rather than an
    /// internal failure to check it.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, AuthError::Store(_))
    }
}

/// Errors from credential storage and key files.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("failed to read credentials: {0}")]
    ReadError(String),

    #[error("failed to write credentials: {0}")]
    WriteError(String),

    #[error("credential for '{0}' already exists")]
    AlreadyExists(String),

    #[error("invalid key material: {0}")]
    InvalidKey(String),
}
