//! core
//!
//! Domain types shared across the crate.
//!
//! # Responsibilities
//!
//! - Validated path type for the asynchronous submission boundary
//! - Validation errors surfaced before any dispatch occurs
//!
//! # Invariants
//!
//! - Invalid values cannot be represented; validation happens at
//!   construction time

pub mod types;

pub use types::{RepoPath, TypeError};
