//! Common Test Utilities
//!
//! Shared spell corpora and session helpers used across test modules.

pub mod fixtures;

pub use fixtures::*;
