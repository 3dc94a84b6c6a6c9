//! cli::commands::user
//!
//! Password user management on the server's credential store.

use anyhow::{bail, Context as _, Result};

use crate::auth::{CredentialStore, PasswordRecord};
use crate::cli::{Context, Session};
use crate::core::types::Identity;
use crate::ui::output;

/// Register (or reset) a password user.
pub fn user_add(ctx: &Context, identity: &str) -> Result<()> {
    let identity = Identity::new(identity)?;
    let config = ctx.load_config()?;
    let store = Session::credential_store(ctx, &config)?;

    let password = rpassword::prompt_password(format!("New password for {}: ", identity))
        .context("Failed to read password")?;
    if password.is_empty() {
        bail!("Password cannot be empty.");
    }
    let confirm =
        rpassword::prompt_password("Repeat password: ").context("Failed to read password")?;
    if password != confirm {
        bail!("Passwords do not match.");
    }

    store
        .set_password(&identity, PasswordRecord::new(&password))
        .with_context(|| format!("Failed to store password for {}", identity))?;
    output::success(format!("Registered {}", identity), ctx.verbosity());
    Ok(())
}

/// List every identity with a password or key.
pub fn user_list(ctx: &Context) -> Result<()> {
    let config = ctx.load_config()?;
    let store = Session::credential_store(ctx, &config)?;
    let identities = store.identities()?;
    if identities.is_empty() {
        output::print("No users registered.", ctx.verbosity());
    } else {
        println!("{}", output::format_list(&identities, ""));
    }
    Ok(())
}
