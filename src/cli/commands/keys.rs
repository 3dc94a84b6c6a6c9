//! cli::commands::keys
//!
//! Signing key management.
//!
//! `pit keys gen` writes a new ed25519 secret key (0600) and prints the
//! public key plus the identity derived from it. `pit keys add` registers
//! a public key with the server's credential store; the key's holder can
//! then authenticate as the derived identity with `auth.method = "key"`.

use std::path::PathBuf;

use anyhow::{Context as _, Result};

use crate::auth::{CredentialStore, KeyPair, KeyRecord};
use crate::cli::{Context, Session};
use crate::ui::output;

/// Generate a key pair.
pub fn keys_gen(ctx: &Context, out: Option<PathBuf>) -> Result<()> {
    let path = match out {
        Some(path) => path,
        None => ctx.load_config()?.key_file()?,
    };

    let key = KeyPair::generate();
    key.save(&path)
        .with_context(|| format!("Failed to write key to {}", path.display()))?;

    output::success(format!("Wrote secret key to {}", path.display()), ctx.verbosity());
    println!("public key: {}", key.public_key_hex());
    println!("identity:   {}", key.identity());
    Ok(())
}

/// Register a public key under its derived identity.
pub fn keys_add(ctx: &Context, public_key: &str) -> Result<()> {
    let record = KeyRecord::from_hex(public_key.trim())?;
    let identity = record.identity()?;

    let config = ctx.load_config()?;
    let store = Session::credential_store(ctx, &config)?;
    store
        .add_public_key(&identity, record)
        .with_context(|| format!("Failed to register key for {}", identity))?;

    output::success(format!("Registered key for {}", identity), ctx.verbosity());
    Ok(())
}
