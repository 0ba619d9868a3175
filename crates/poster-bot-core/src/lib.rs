#![deny(missing_docs)]
//! Poster bot core library.
//!
//! Transport-agnostic logic: per-user mode state, the mode router and
//! best-effort poster resolution.

/// Configuration management.
pub mod config;
/// Poster resolution (search, fetch, heuristics, cache).
pub mod poster;
/// Mode router state machine.
pub mod router;
/// Per-user state store.
pub mod state;
/// Utility functions.
pub mod utils;
/// Reply texts.
pub mod views;

/// Test helpers.
#[cfg(test)]
pub mod testing;

pub use router::{Inbound, ModeRouter, Reply};
pub use state::{Mode, UserId, UserStateStore};
