//! Crate-internal test suites
//!
//! Shared fixtures live in `common`; invariant checks over generated
//! inputs live in `property`.

mod common;
mod property;
