//! Property-based tests for the spell search core
//!
//! Property tests verify invariants that should hold for all inputs, rather
//! than testing specific cases.
//!
//! ## Running Property Tests
//!
//! ```sh
//! cargo test property --release
//! ```
//!
//! ## Test Modules
//!
//! - `pipeline_props`: filter pipeline
//!   - Output is an order-preserving subset of the input
//!   - Empty state is the identity
//!   - Adding a filter never widens the result
//!   - Advanced queries agree with the state they imply
//! - `query_parser_props`: advanced query parsing
//!   - Parsing never panics
//!   - Cached and uncached parses agree
//! - `range_props`: range units and bounds
//!   - Canonicalization is monotone in the value
//!   - Widening bounds never drops a match
//! - `recent_props`: recent searches list
//!   - Bounded, unique, most recent first
//! - `filter_config_props`: descriptor repair
//!   - `ensure_integrity` is idempotent and keeps every default

mod filter_config_props;
mod pipeline_props;
mod query_parser_props;
mod range_props;
mod recent_props;
