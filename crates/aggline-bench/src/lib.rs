//! Aggline Benchmark Suite
//!
//! Criterion benchmarks for the aggregation engine.
//!
//! # Benchmark Categories
//!
//! - **Pipeline**: the full order analytics run, parallel vs sequential facets
//! - **Join**: hash join build and probe at different cardinalities

pub mod fixtures;

pub use fixtures::{generate_dataset, Scale};
