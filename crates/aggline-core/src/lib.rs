//! Aggline Core - aggregation pipeline execution engine.
//!
//! This crate evaluates [`aggline_proto::Pipeline`] declarations over
//! in-memory record sequences: hash-join lookups, field derivation,
//! filtering, grouping, sorting, limiting and parallel facets.

pub mod cancel;
pub mod config;
pub mod error;
pub mod query;

pub use cancel::CancellationToken;
pub use config::{EngineConfig, MissingFieldPolicy};
pub use error::{EngineError, EvaluationError, JoinKeyError, StageError, StageFailure};
pub use query::{Evaluator, PipelineExecutor, RunStats};

/// Re-export protocol types.
pub use aggline_proto as proto;
