//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Global Config
//!
//! Located at (in order of precedence):
//! 1. `$PIT_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/pit/config.toml`
//! 3. `~/.pit/config.toml`
//!
//! # Tracking Record
//!
//! Located at `<workdir>/.pit/tracking.toml`. Binds a working directory to
//! one server repository.
//!
//! # Validation
//!
//! Config values are validated after parsing (e.g. the per-file size
//! ceiling must be positive, the identity must be a valid name).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::types::{Identity, RepoName, RepoRef};

/// Default per-file size ceiling (10 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Default commit message length cap, in characters.
pub const DEFAULT_MAX_MESSAGE_LEN: usize = 200;

/// Global configuration (user scope).
///
/// # Example
///
/// ```toml
/// identity = "alice"
///
/// [server]
/// storage_root = "/srv/pit"
/// max_file_size = 10485760
/// max_message_len = 200
///
/// [auth]
/// method = "key"
/// key_file = "/home/alice/.pit/id_ed25519"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    /// Identity used for password authentication
    pub identity: Option<String>,

    /// Server-side settings
    pub server: Option<ServerConfig>,

    /// Authentication settings
    pub auth: Option<AuthConfig>,
}

impl GlobalConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(identity) = &self.identity {
            Identity::new(identity.as_str())
                .map_err(|e| ConfigError::InvalidValue(format!("invalid identity: {}", e)))?;
        }

        if let Some(server) = &self.server {
            server.validate()?;
        }

        Ok(())
    }
}

/// Server storage and limit settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Root of the snapshot store
    pub storage_root: Option<PathBuf>,

    /// Per-file size ceiling in bytes
    pub max_file_size: Option<u64>,

    /// Commit message length cap in characters
    pub max_message_len: Option<usize>,
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_file_size == Some(0) {
            return Err(ConfigError::InvalidValue(
                "server.max_file_size must be greater than zero".to_string(),
            ));
        }
        if self.max_message_len == Some(0) {
            return Err(ConfigError::InvalidValue(
                "server.max_message_len must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Supported authentication schemes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    /// Identity + password checked against a stored digest
    #[default]
    Password,
    /// Ed25519 signature over a time-bound nonce
    Key,
}

/// Authentication settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    /// Scheme used by the client ("password" or "key")
    pub method: Option<AuthMethod>,

    /// Signing key for the "key" method
    pub key_file: Option<PathBuf>,

    /// Server credential store
    pub credentials_file: Option<PathBuf>,
}

/// Binding of a working directory to a server repository.
///
/// # Example
///
/// ```toml
/// owner = "alice"
/// repo = "proj"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TrackingRecord {
    pub owner: Identity,
    pub repo: RepoName,
}

impl TrackingRecord {
    pub fn new(repo: &RepoRef) -> Self {
        Self {
            owner: repo.owner.clone(),
            repo: repo.name.clone(),
        }
    }

    pub fn repo_ref(&self) -> RepoRef {
        RepoRef::new(self.owner.clone(), self.repo.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_global_config_parses() {
        let toml = r#"
            identity = "alice"

            [server]
            storage_root = "/srv/pit"
            max_file_size = 1024
            max_message_len = 80

            [auth]
            method = "key"
            key_file = "/tmp/id"
        "#;
        let config: GlobalConfig = toml::from_str(toml).unwrap();
        config.validate().unwrap();

        let auth = config.auth.unwrap();
        assert_eq!(auth.method, Some(AuthMethod::Key));
        assert_eq!(config.server.unwrap().max_file_size, Some(1024));
    }

    #[test]
    fn unknown_auth_method_rejected() {
        let result: Result<GlobalConfig, _> = toml::from_str("[auth]\nmethod = \"oauth\"");
        assert!(result.is_err());
    }

    #[test]
    fn zero_limits_rejected() {
        let config = GlobalConfig {
            server: Some(ServerConfig {
                max_file_size: Some(0),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn invalid_identity_rejected() {
        let config = GlobalConfig {
            identity: Some("../root".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn tracking_record_round_trip() {
        let repo = RepoRef::parse("alice/proj").unwrap();
        let record = TrackingRecord::new(&repo);
        let toml = toml::to_string_pretty(&record).unwrap();
        assert!(toml.contains("owner = \"alice\""));

        let parsed: TrackingRecord = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.repo_ref(), repo);
    }

    #[test]
    fn tracking_record_rejects_bad_names() {
        let result: Result<TrackingRecord, _> = toml::from_str("owner = \"a/b\"\nrepo = \"x\"");
        assert!(result.is_err());
    }
}
