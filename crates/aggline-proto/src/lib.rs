//! Aggline pipeline declaration types.
//!
//! This crate defines the data a host uses to describe an aggregation
//! pipeline and the values that flow through it. Execution lives in
//! `aggline-core`.
//!
//! # Modules
//!
//! - [`value`] - Runtime values and ordered documents
//! - [`expr`] - Field paths and arithmetic expressions
//! - [`pipeline`] - Stage descriptors and the pipeline builder
//! - [`shape`] - Record shapes for construction-time field checks
//! - [`result`] - Facet and pipeline outputs
//! - [`error`] - Declaration error types
//!
//! # Example
//!
//! ```
//! use aggline_proto::{Expr, Facet, Group, Lookup, Pipeline, Stage};
//!
//! let pipeline = Pipeline::builder()
//!     .lookup(Lookup::new("users", "userId", "id", "user"))
//!     .facet(Facet::new().branch(
//!         "ordersPerUser",
//!         vec![Group::by_field("user.id").count("ordersCount").into(), Stage::limit(10)],
//!     ))
//!     .build()
//!     .unwrap();
//! assert!(pipeline.facet().is_some());
//! ```

pub mod error;
pub mod expr;
pub mod pipeline;
pub mod result;
pub mod shape;
pub mod value;

pub use error::Error;

// Re-export commonly used types at crate root
pub use expr::{BinaryOp, Expr, FieldPath};
pub use pipeline::{
    Accumulator, CompareOp, Facet, Group, JoinMode, Lookup, Pipeline, PipelineBuilder, Predicate,
    Sort, SortDirection, Stage,
};
pub use result::{FacetResult, PipelineOutput};
pub use shape::{FieldShape, Shape};
pub use value::{Document, Value};
