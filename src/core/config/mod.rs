//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! pit has two configuration scopes:
//! - **Global**: User-level settings (identity, auth scheme, server limits)
//! - **Tracking**: Per-working-directory binding to a server repository
//!
//! # Global Config Locations
//!
//! Searched in order:
//! 1. `$PIT_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/pit/config.toml`
//! 3. `~/.pit/config.toml`
//!
//! # Tracking Record Location
//!
//! `<workdir>/.pit/tracking.toml`, written by clone.
//!
//! # Example
//!
//! ```no_run
//! use pit::core::config::Config;
//! use std::path::Path;
//!
//! let config = Config::load().unwrap().config;
//! println!("max file size: {}", config.limits().max_file_size);
//!
//! let record = Config::read_tracking(Path::new("/path/to/workdir")).unwrap();
//! println!("tracking {}", record.repo_ref());
//! ```

pub mod schema;

pub use schema::{
    AuthConfig, AuthMethod, GlobalConfig, ServerConfig, TrackingRecord, DEFAULT_MAX_FILE_SIZE,
    DEFAULT_MAX_MESSAGE_LEN,
};

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::paths::WorkspacePaths;
use crate::core::types::Identity;

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("failed to write config file '{path}': {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("home directory not found")]
    NoHomeDir,
}

/// Warnings generated during config loading.
#[derive(Debug, Clone)]
pub struct ConfigWarning {
    /// The warning message.
    pub message: String,
    /// The path that triggered the warning.
    pub path: PathBuf,
}

/// Result of loading configuration.
#[derive(Debug)]
pub struct ConfigLoadResult {
    /// The loaded configuration.
    pub config: Config,
    /// Any warnings generated during loading.
    pub warnings: Vec<ConfigWarning>,
}

/// Size and length limits enforced on commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Per-file size ceiling in bytes (inclusive)
    pub max_file_size: u64,
    /// Commit message cap in characters
    pub max_message_len: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_message_len: DEFAULT_MAX_MESSAGE_LEN,
        }
    }
}

/// Global configuration with defaults applied through accessors.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub global: GlobalConfig,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// # Errors
    ///
    /// Returns an error if config files exist but cannot be parsed.
    /// Missing config files are not an error (defaults are used).
    pub fn load() -> Result<ConfigLoadResult, ConfigError> {
        let global = Self::find_global();
        Self::load_with(global.as_deref())
    }

    /// Load configuration from an explicit global config path.
    pub fn load_with(global_path: Option<&Path>) -> Result<ConfigLoadResult, ConfigError> {
        let mut warnings = Vec::new();

        let global = match global_path {
            Some(path) if path.exists() => read_toml::<GlobalConfig>(path)?,
            _ => GlobalConfig::default(),
        };
        global.validate()?;

        if let (Some(path), Some(auth)) = (global_path, &global.auth) {
            if auth.method != Some(AuthMethod::Key) && auth.key_file.is_some() {
                warnings.push(ConfigWarning {
                    message: "auth.key_file is ignored unless auth.method = \"key\"".to_string(),
                    path: path.to_path_buf(),
                });
            }
        }

        Ok(ConfigLoadResult {
            config: Config { global },
            warnings,
        })
    }

    /// Locate the global config file, if any exists.
    fn find_global() -> Option<PathBuf> {
        // 1. $PIT_CONFIG
        if let Ok(path) = std::env::var("PIT_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        // 2. $XDG_CONFIG_HOME/pit/config.toml
        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("pit/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        // 3. ~/.pit/config.toml
        dirs::home_dir()
            .map(|home| home.join(".pit/config.toml"))
            .filter(|path| path.exists())
    }

    /// Write a working directory's tracking record atomically.
    pub fn write_tracking(work_dir: &Path, record: &TrackingRecord) -> Result<PathBuf, ConfigError> {
        let path = WorkspacePaths::new(work_dir.to_path_buf()).tracking_path();
        write_config_atomic(&path, record)?;
        Ok(path)
    }

    /// Read a working directory's tracking record.
    pub fn read_tracking(work_dir: &Path) -> Result<TrackingRecord, ConfigError> {
        read_toml(&WorkspacePaths::new(work_dir.to_path_buf()).tracking_path())
    }

    // =========================================================================
    // Accessor methods with defaults
    // =========================================================================

    /// Configured identity, if any.
    pub fn identity(&self) -> Option<Identity> {
        self.global
            .identity
            .as_deref()
            .and_then(|s| Identity::new(s).ok())
    }

    /// Commit limits.
    ///
    /// Defaults to 10 MiB per file and 200 message characters.
    pub fn limits(&self) -> Limits {
        let server = self.global.server.as_ref();
        let defaults = Limits::default();
        Limits {
            max_file_size: server
                .and_then(|s| s.max_file_size)
                .unwrap_or(defaults.max_file_size),
            max_message_len: server
                .and_then(|s| s.max_message_len)
                .unwrap_or(defaults.max_message_len),
        }
    }

    /// Root of the snapshot store.
    ///
    /// Defaults to `~/.pit/storage`.
    pub fn storage_root(&self) -> Result<PathBuf, ConfigError> {
        match self.global.server.as_ref().and_then(|s| s.storage_root.clone()) {
            Some(root) => Ok(root),
            None => Ok(pit_home()?.join("storage")),
        }
    }

    /// Authentication scheme.
    ///
    /// Defaults to password.
    pub fn auth_method(&self) -> AuthMethod {
        self.global
            .auth
            .as_ref()
            .and_then(|a| a.method)
            .unwrap_or_default()
    }

    /// Signing key location.
    ///
    /// Defaults to `~/.pit/id_ed25519`.
    pub fn key_file(&self) -> Result<PathBuf, ConfigError> {
        match self.global.auth.as_ref().and_then(|a| a.key_file.clone()) {
            Some(path) => Ok(path),
            None => Ok(pit_home()?.join("id_ed25519")),
        }
    }

    /// Server credential store location.
    ///
    /// Defaults to `~/.pit/credentials.toml`.
    pub fn credentials_file(&self) -> Result<PathBuf, ConfigError> {
        match self
            .global
            .auth
            .as_ref()
            .and_then(|a| a.credentials_file.clone())
        {
            Some(path) => Ok(path),
            None => Ok(pit_home()?.join("credentials.toml")),
        }
    }

}

fn pit_home() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
    Ok(home.join(".pit"))
}

/// Read and parse a TOML file.
fn read_toml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Write a config file atomically (temp file, then rename).
fn write_config_atomic<T: serde::Serialize>(path: &Path, config: &T) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })?;
    }

    let contents =
        toml::to_string_pretty(config).map_err(|e| ConfigError::InvalidValue(e.to_string()))?;

    let temp_path = path.with_extension("toml.tmp");
    let write_err = |source| ConfigError::WriteError {
        path: temp_path.clone(),
        source,
    };
    let mut file = fs::File::create(&temp_path).map_err(write_err)?;
    file.write_all(contents.as_bytes()).map_err(write_err)?;
    file.sync_all().map_err(write_err)?;

    fs::rename(&temp_path, path).map_err(|e| ConfigError::WriteError {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::RepoRef;
    use tempfile::TempDir;

    #[test]
    fn load_empty_defaults() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("absent.toml");
        let result = Config::load_with(Some(missing.as_path())).unwrap();
        let config = result.config;

        assert!(config.identity().is_none());
        assert_eq!(config.limits(), Limits::default());
        assert_eq!(config.auth_method(), AuthMethod::Password);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn load_global_from_path() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("config.toml");
        fs::write(
            &config_path,
            r#"
            identity = "alice"

            [server]
            storage_root = "/srv/pit"
            max_file_size = 4096
            "#,
        )
        .unwrap();

        let config = Config::load_with(Some(config_path.as_path())).unwrap().config;

        assert_eq!(config.identity().unwrap().as_str(), "alice");
        assert_eq!(config.storage_root().unwrap(), PathBuf::from("/srv/pit"));
        assert_eq!(config.limits().max_file_size, 4096);
        assert_eq!(config.limits().max_message_len, DEFAULT_MAX_MESSAGE_LEN);
    }

    #[test]
    fn stray_key_file_warns() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("config.toml");
        fs::write(&config_path, "[auth]\nkey_file = \"/tmp/k\"").unwrap();

        let result = Config::load_with(Some(config_path.as_path())).unwrap();
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].message.contains("key_file"));
    }

    #[test]
    fn tracking_record_write_and_load() {
        let temp = TempDir::new().unwrap();
        let repo = RepoRef::parse("alice/proj").unwrap();

        let path = Config::write_tracking(temp.path(), &TrackingRecord::new(&repo)).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("toml.tmp").exists());

        assert_eq!(Config::read_tracking(temp.path()).unwrap().repo_ref(), repo);
    }

    #[test]
    fn unknown_fields_rejected() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("config.toml");
        fs::write(&config_path, "identity = \"alice\"\nunknown_field = true").unwrap();

        let result = Config::load_with(Some(config_path.as_path()));
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn invalid_values_rejected() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("config.toml");
        fs::write(&config_path, "[server]\nmax_message_len = 0").unwrap();

        let result = Config::load_with(Some(config_path.as_path()));
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn malformed_tracking_record_is_error() {
        let temp = TempDir::new().unwrap();
        let paths = WorkspacePaths::new(temp.path().to_path_buf());
        fs::create_dir_all(paths.control_dir()).unwrap();
        fs::write(paths.tracking_path(), "owner = 3").unwrap();

        assert!(matches!(
            Config::read_tracking(temp.path()),
            Err(ConfigError::ParseError { .. })
        ));
    }
}
