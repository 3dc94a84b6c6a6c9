//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Loads configuration and, when it talks to the server, a [`Session`]
//! 2. Calls the workspace or remote layer
//! 3. Formats and displays output
//!
//! Handlers do NOT touch storage directly.
//!
//! # Async Commands
//!
//! Server operations go through the async [`Remote`] trait. Handlers are
//! synchronous wrappers that run the async implementation on a tokio
//! runtime.
//!
//! [`Session`]: crate::cli::Session
//! [`Remote`]: crate::remote::Remote

mod completion;
mod keys;
mod repo;
mod sync;
mod user;

pub use completion::completion;
pub use keys::{keys_add, keys_gen};
pub use repo::{create, list, log};
pub use sync::{clone, commit, pull, push, status};
pub use user::{user_add, user_list};

use crate::cli::args::{Command, KeysAction, UserAction};
use crate::cli::Context;
use anyhow::Result;

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        // Server-side repository commands
        Command::Create { name } => repo::create(ctx, &name),
        Command::List => repo::list(ctx),
        Command::Log { repo } => repo::log(ctx, repo.as_deref()),

        // Working directory commands
        Command::Clone { repo } => sync::clone(ctx, &repo),
        Command::Commit { message, push } => sync::commit(ctx, &message, push),
        Command::Push => sync::push(ctx),
        Command::Pull { id } => sync::pull(ctx, id.as_deref()),
        Command::Status => sync::status(ctx),

        // Credential management
        Command::Keys { action } => match action {
            KeysAction::Gen { out } => keys::keys_gen(ctx, out),
            KeysAction::Add { public_key } => keys::keys_add(ctx, &public_key),
        },
        Command::User { action } => match action {
            UserAction::Add { identity } => user::user_add(ctx, &identity),
            UserAction::List => user::user_list(ctx),
        },

        Command::Completion { shell } => completion::completion(shell),
    }
}
