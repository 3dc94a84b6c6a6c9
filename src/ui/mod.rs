//! ui
//!
//! User interaction utilities.
//!
//! # Modules
//!
//! - [`output`] - Output formatting and display
//!
//! All user-facing text goes through this module so quiet mode is honored
//! consistently.

pub mod output;
