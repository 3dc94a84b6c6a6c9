//! cli::session
//!
//! Server connection and credentials for one invocation.
//!
//! The server runs in-process over the configured storage root and
//! credential file. Credentials come from the configured scheme:
//!
//! - `password`: identity from `--identity` or the config, password from
//!   `$PIT_PASSWORD` or an interactive prompt
//! - `key`: the ed25519 key at `auth.key_file`, signing a fresh challenge

use std::sync::Arc;

use anyhow::{anyhow, Context as _, Result};
use tracing::debug;

use super::Context;
use crate::auth::{create_authenticator, Credentials, FileCredentialStore, KeyPair, OwnerPolicy};
use crate::core::config::{AuthMethod, Config, Limits};
use crate::core::snapshot::SnapshotStore;
use crate::core::types::Identity;
use crate::engine::SyncController;
use crate::remote::LocalRemote;
use crate::ui::output;

/// Environment variable consulted before prompting for a password.
pub const PASSWORD_ENV: &str = "PIT_PASSWORD";

/// An authenticated connection to the server.
pub struct Session {
    pub remote: LocalRemote,
    pub credentials: Credentials,
    pub limits: Limits,
}

impl Session {
    /// Build the server side and resolve credentials.
    pub fn open(ctx: &Context, config: &Config) -> Result<Self> {
        let remote = Self::remote(ctx, config)?;
        let credentials = Self::credentials(ctx, config)?;
        Ok(Self {
            remote,
            credentials,
            limits: config.limits(),
        })
    }

    /// The credential store named by the configuration.
    pub fn credential_store(ctx: &Context, config: &Config) -> Result<FileCredentialStore> {
        let path = config.credentials_file()?;
        let store = FileCredentialStore::with_path(path);
        if !store.verify_permissions()? {
            output::warn(
                format!(
                    "{} is readable by other users; run 'chmod 600' on it",
                    store.path().display()
                ),
                ctx.verbosity(),
            );
        }
        Ok(store)
    }

    fn remote(ctx: &Context, config: &Config) -> Result<LocalRemote> {
        let root = config.storage_root()?;
        debug!(storage_root = %root.display(), "opening snapshot store");
        let store = SnapshotStore::open(root.clone())
            .with_context(|| format!("Failed to open storage at {}", root.display()))?;
        let credentials = Arc::new(Self::credential_store(ctx, config)?);
        let controller = SyncController::new(
            store,
            Arc::new(create_authenticator(credentials)),
            Arc::new(OwnerPolicy),
            config.limits(),
        );
        Ok(LocalRemote::new(Arc::new(controller)))
    }

    fn credentials(ctx: &Context, config: &Config) -> Result<Credentials> {
        match config.auth_method() {
            AuthMethod::Key => {
                let path = config.key_file()?;
                let key = KeyPair::load(&path)
                    .with_context(|| format!("Failed to load signing key {}", path.display()))?;
                debug!(identity = %key.identity(), "signing with key");
                Ok(key.credentials())
            }
            AuthMethod::Password => {
                let identity = match &ctx.identity {
                    Some(name) => Identity::new(name.as_str())?,
                    None => config.identity().ok_or_else(|| {
                        anyhow!("No identity configured. Pass --identity or set 'identity' in the config.")
                    })?,
                };
                let password = match std::env::var(PASSWORD_ENV) {
                    Ok(password) => password,
                    Err(_) => rpassword::prompt_password(format!("Password for {}: ", identity))
                        .context("Failed to read password")?,
                };
                Ok(Credentials::password(identity, password))
            }
        }
    }
}
