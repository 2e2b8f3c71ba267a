//! Shared test fixtures for idxinteract crates.
//!
//! This crate provides plan cost models and reference computations for
//! testing. It depends only on `idxinteract-core`.
//!
//! - [`scenario`] - Hand-built statements with known interaction outcomes
//! - [`random`] - Seeded random statements and workloads
//! - [`brute`] - Exhaustive reference evaluation over base configurations
//!
//! # Usage
//!
//! Add as a dev-dependency in your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! idxinteract-test = { workspace = true }
//! ```
//!
//! Then import the fixtures you need:
//!
//! ```ignore
//! use idxinteract_test::scenario::{scenario_b, C, D};
//! use idxinteract_test::brute::max_degree;
//! ```

pub mod brute;
pub mod random;
pub mod scenario;

// Re-export commonly used fixtures at crate root for convenience
pub use scenario::{complementary, same_slot, scenario_a, scenario_b, C, D};
