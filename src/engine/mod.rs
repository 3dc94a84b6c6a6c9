//! engine
//!
//! Server-side synchronization: the Sync Controller and its error taxonomy.
//!
//! # Architecture
//!
//! The engine composes the core pieces into the five server operations:
//!
//! | Operation | Composes |
//! |---|---|
//! | create_repository | auth, snapshot store |
//! | commit | auth, policy, change detector, snapshot store |
//! | clone / pull | auth, policy, snapshot store, archive codec |
//! | list_repositories / log | auth, snapshot store |
//!
//! Authentication and ownership are capabilities injected at construction
//! ([`Authenticator`], [`AccessPolicy`]), so schemes can be swapped without
//! touching the controller.
//!
//! # Invariants
//!
//! - Authorization is checked before any filesystem mutation
//! - Only the controller appends commits
//! - Errors are terminal and never retried here
//!
//! [`Authenticator`]: crate::auth::Authenticator
//! [`AccessPolicy`]: crate::auth::AccessPolicy

mod controller;
mod errors;

pub use controller::{CommitSummary, Snapshot, SyncController};
pub use errors::{ErrorKind, SyncError};
