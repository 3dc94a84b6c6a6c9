//! remote
//!
//! Client-side access to a pit server.
//!
//! # Architecture
//!
//! The [`Remote`] trait is the boundary between the client workspace and
//! the server. The transport itself is outside this crate; what ships here
//! is:
//!
//! - [`LocalRemote`]: runs a [`SyncController`](crate::engine::SyncController)
//!   in-process (single-machine setups, tests)
//! - [`mock`]: a recording, fault-injecting wrapper for deterministic tests
//!
//! Workspace code takes `&dyn Remote` and never names a concrete
//! implementation.

mod local;
pub mod mock;
mod traits;

pub use local::LocalRemote;
pub use traits::Remote;
