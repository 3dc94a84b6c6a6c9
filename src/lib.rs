//! pit - snapshot-based file synchronization
//!
//! pit keeps working directories in sync with per-user repositories on a
//! server. Every commit is a complete snapshot stored under an
//! `<index>_<slug>` id; clients stage commits locally, push them in order
//! and pull any snapshot back as a zip archive.
//!
//! # Architecture
//!
//! The codebase is layered:
//!
//! - [`cli`] - Command-line interface (parses args, delegates to workspace/remote)
//! - [`workspace`] - Client working tree, staging area, push/pull/clone
//! - [`remote`] - The client's view of a server
//! - [`engine`] - Server-side Sync Controller and error taxonomy
//! - [`auth`] - Authentication schemes, credential store, ownership policy
//! - [`core`] - Domain types, change detection, snapshot store, archive codec
//! - [`ui`] - User-facing output
//!
//! # Correctness Invariants
//!
//! 1. Commit ids within a repository are dense and strictly increasing
//! 2. Stored commits are never modified
//! 3. Authorization happens before any filesystem mutation
//! 4. A partially failed push never loses staged work

pub mod auth;
pub mod cli;
pub mod core;
pub mod engine;
pub mod remote;
pub mod ui;
pub mod workspace;
