//! Pipeline execution.
//!
//! Each stage kind has its own executor module; [`PipelineExecutor`] threads
//! records through them and fans out terminal facets onto a worker pool.

mod aggregate;
mod derive;
mod eval;
mod executor;
mod facet;
mod filter;
mod join;
mod key;
mod pool;
mod sort;

pub use aggregate::GroupExecutor;
pub use derive::add_fields;
pub use eval::{Evaluator, Number};
pub use executor::{PipelineExecutor, RunStats};
pub use filter::FilterEvaluator;
pub use join::{HashJoinExecutor, JoinIndex, JoinOutput};
pub use key::{values_equal, KeyValue};
pub use pool::{FacetPool, PoolError};
pub use sort::{limit_records, sort_records};
