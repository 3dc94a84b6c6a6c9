//! cli
//!
//! Command-line interface layer for pit.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Load configuration and build the server session
//! - Delegate to the workspace and remote layers
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap, resolves
//! configuration into a [`Context`] and dispatches to command handlers.
//! Handlers never touch storage directly: working directory changes go
//! through [`crate::workspace`], server requests through
//! [`crate::remote::Remote`].

pub mod args;
pub mod commands;
mod session;

pub use args::{Cli, Shell};
pub use session::Session;

use std::path::PathBuf;

use anyhow::{Context as _, Result};

use crate::core::config::{Config, ConfigLoadResult};
use crate::ui::output::{self, Verbosity};

/// Resolved invocation context shared by all handlers.
#[derive(Debug, Clone)]
pub struct Context {
    /// Directory the command runs in
    pub cwd: PathBuf,
    /// Explicit global config path (`--config`)
    pub config_path: Option<PathBuf>,
    /// Identity override (`--identity`)
    pub identity: Option<String>,
    pub debug: bool,
    pub quiet: bool,
}

impl Context {
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.debug)
    }

    /// Load configuration for this invocation, reporting warnings.
    pub fn load_config(&self) -> Result<Config> {
        let loaded = match &self.config_path {
            Some(path) => Config::load_with(Some(path.as_path())),
            None => Config::load(),
        };
        let ConfigLoadResult { config, warnings } =
            loaded.context("Failed to load configuration")?;
        for warning in warnings {
            output::warn(
                format!("{} ({})", warning.message, warning.path.display()),
                self.verbosity(),
            );
        }
        Ok(config)
    }
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run(cli: Cli) -> Result<()> {
    let cwd = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir().context("Cannot determine current directory")?,
    };

    let ctx = Context {
        cwd,
        config_path: cli.config,
        identity: cli.identity,
        debug: cli.debug,
        quiet: cli.quiet,
    };

    commands::dispatch(cli.command, &ctx)
}
