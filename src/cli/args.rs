//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--cwd <path>`: Run as if in that directory
//! - `--config <path>`: Use this global config file
//! - `--identity <name>`: Authenticate as this identity (password scheme)
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// pit - snapshot-based file synchronization
#[derive(Parser, Debug)]
#[command(name = "pit")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run as if pit was started in this directory
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Global config file (defaults to $PIT_CONFIG or ~/.pit/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Identity to authenticate as (overrides the configured identity)
    #[arg(long, global = true, value_name = "NAME")]
    pub identity: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a repository on the server
    #[command(
        name = "create",
        long_about = "Create a new repository owned by the authenticated identity.\n\n\
            The repository starts with a single empty commit, 001_initial. \
            Use 'pit clone' to get a working directory for it.",
        after_help = "\
WORKFLOW EXAMPLES:
    pit create notes
    pit clone alice/notes"
    )]
    Create {
        /// Repository name
        name: String,
    },

    /// Commit the working tree
    #[command(
        name = "commit",
        long_about = "Record the working tree as a new commit.\n\n\
            By default the commit is staged locally under .pit/staging and sent \
            to the server by 'pit push'. With --push the commit is staged and \
            the whole queue is pushed immediately.\n\n\
            A working tree identical to the last snapshot is rejected.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Stage now, push later
    pit commit -m \"draft chapter\"
    pit push

    # Straight to the server
    pit commit -m \"fix typo\" --push"
    )]
    Commit {
        /// Commit message (truncated to the configured maximum)
        #[arg(short, long)]
        message: String,

        /// Push immediately after staging
        #[arg(long)]
        push: bool,
    },

    /// Send staged commits to the server
    #[command(
        name = "push",
        long_about = "Replay staged commits to the server in order.\n\n\
            Each accepted commit is marked as acknowledged. If a commit is \
            rejected the push stops, the queue is kept, and a later 'pit push' \
            resumes with the first unacknowledged commit."
    )]
    Push,

    /// Clone a repository into a new directory
    #[command(
        name = "clone",
        long_about = "Download the latest commit of a repository into ./<name>.\n\n\
            Fails if the destination folder already exists."
    )]
    Clone {
        /// Repository as <owner>/<name>
        repo: String,
    },

    /// Replace the working tree with a server commit
    #[command(
        name = "pull",
        long_about = "Replace the working tree with a commit from the server.\n\n\
            Without an id the latest commit is pulled. Everything outside .pit \
            is removed before the snapshot is extracted; the archive is fully \
            validated first, so a failed pull leaves the tree untouched.",
        after_help = "\
WORKFLOW EXAMPLES:
    pit pull
    pit pull 003_fix_typo"
    )]
    Pull {
        /// Commit id (defaults to the latest)
        id: Option<String>,
    },

    /// List your repositories
    #[command(name = "list")]
    List,

    /// Show repository history
    #[command(name = "log")]
    Log {
        /// Repository as <owner>/<name> (defaults to the tracked one)
        repo: Option<String>,
    },

    /// Show working tree changes
    #[command(name = "status")]
    Status,

    /// Manage signing keys
    #[command(name = "keys")]
    Keys {
        #[command(subcommand)]
        action: KeysAction,
    },

    /// Manage password users
    #[command(name = "user")]
    User {
        #[command(subcommand)]
        action: UserAction,
    },

    /// Generate shell completion scripts
    #[command(
        name = "completion",
        long_about = "Generate shell completion scripts for tab-completion.\n\n\
            Outputs a completion script for the specified shell.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Bash (add to ~/.bashrc)
    pit completion bash >> ~/.bashrc

    # Zsh (add to ~/.zshrc)
    pit completion zsh >> ~/.zshrc"
    )]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Key subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum KeysAction {
    /// Generate a key pair and print the derived identity
    Gen {
        /// Where to write the secret key (defaults to the configured key_file)
        #[arg(long, value_name = "PATH")]
        out: Option<PathBuf>,
    },
    /// Register a public key with the credential store
    Add {
        /// Public key, hex encoded
        public_key: String,
    },
}

/// User subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum UserAction {
    /// Register a password user (prompts for the password)
    Add {
        /// Identity to register
        identity: String,
    },
    /// List registered identities
    List,
}

/// Supported shells for completion
#[derive(clap::ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}
