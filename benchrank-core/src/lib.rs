//! Tolerance-based winner determination and convergence search for comparing
//! data-processing systems on benchmark queries.
//!
//! The pipeline over a normalized [`types::BenchmarkSnapshot`]:
//!
//! 1. [`extract`] turns raw harness records into comparable metric values;
//! 2. [`competitive`] selects the queries where at least two systems compete;
//! 3. [`winners`] assigns win credit per query, strictly or within a tolerance;
//! 4. [`bounds`] computes each system's maximum achievable win count;
//! 5. [`convergence`] finds the smallest tolerance at which a system wins
//!    everything it participates in;
//! 6. [`stats`] aggregates per-system summary statistics.
//!
//! Everything here is synchronous, allocation-light, and deterministic: keyed
//! collections are `BTreeMap`s, so identical inputs produce identical outputs
//! byte for byte. The only fallible surface is configuration validation in
//! [`config`]; missing fields, failed queries, and unconverged systems are
//! ordinary data conditions, not errors.

pub mod bounds;
pub mod competitive;
pub mod config;
pub mod convergence;
pub mod extract;
pub mod stats;
pub mod types;
pub mod winners;
