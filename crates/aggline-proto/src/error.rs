//! Declaration error types.

use thiserror::Error;

/// Errors raised while declaring or validating a pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A field path is empty or contains an empty segment.
    #[error("invalid field path: '{0}'")]
    InvalidFieldPath(String),

    /// An output field name is empty or dotted.
    #[error("invalid output field name: '{0}'")]
    InvalidFieldName(String),

    /// A lookup names no source collection.
    #[error("lookup stage has an empty collection name")]
    EmptyCollectionName,

    /// Two accumulators in one group share a name.
    #[error("duplicate accumulator name: '{0}'")]
    DuplicateAccumulator(String),

    /// An accumulator tried to use the group key's output name.
    #[error("accumulator name '_id' is reserved for the group key")]
    ReservedAccumulatorName,

    /// Two facet branches share a name.
    #[error("duplicate facet branch: '{0}'")]
    DuplicateFacetBranch(String),

    /// A facet declares no branches.
    #[error("facet stage has no branches")]
    EmptyFacet,

    /// A facet stage is followed by further stages.
    #[error("facet stage at position {position} must be the last stage")]
    FacetNotTerminal { position: usize },

    /// A facet branch contains another facet.
    #[error("facet branch '{branch}' contains a nested facet")]
    NestedFacet { branch: String },

    /// A lookup references a collection with no registered shape.
    #[error("unknown collection: '{0}'")]
    UnknownCollection(String),

    /// A stage references a field path absent from its input shape.
    #[error("stage '{stage}' references unknown field '{path}'")]
    UnknownField { stage: String, path: String },
}
