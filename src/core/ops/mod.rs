//! core::ops
//!
//! Locking for mutating operations.
//!
//! # Modules
//!
//! - [`lock`] - Exclusive repository / workspace lock
//!
//! # Architecture
//!
//! Every mutating operation acquires the lock for the tree it writes:
//! the server takes one per repository around commit id assignment, the
//! client takes one per working directory around commit, push and pull.

pub mod lock;

pub use lock::{LockError, RepoLock};
