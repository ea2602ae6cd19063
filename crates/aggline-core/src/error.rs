//! Engine error types.

use aggline_proto::Document;
use thiserror::Error;

/// Expression evaluation failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluationError {
    /// A referenced field path is absent from the record.
    #[error("missing field '{path}'")]
    MissingField { path: String },

    /// An arithmetic or numeric operator received a non-numeric operand.
    #[error("'{op}' requires a numeric operand, found {found}")]
    NonNumeric { op: &'static str, found: &'static str },

    /// Integer arithmetic overflowed.
    #[error("integer overflow in '{op}'")]
    Overflow { op: &'static str },

    /// Division by zero.
    #[error("division by zero")]
    DivisionByZero,

    /// A float operation produced NaN or infinity.
    #[error("non-finite result from '{op}'")]
    NonFinite { op: &'static str },
}

/// Reasons a record cannot take part in a join.
///
/// These never abort a run: the record is excluded from the join output.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum JoinKeyError {
    /// The input record has no value at the local key path.
    #[error("local key '{path}' is missing")]
    MissingLocalKey { path: String },

    /// The reference record has no value at the foreign key path.
    #[error("foreign key '{path}' is missing")]
    MissingForeignKey { path: String },

    /// The key value cannot be matched (null or an embedded document).
    #[error("value of type {found} cannot be used as a join key")]
    UnjoinableKey { found: &'static str },
}

/// Failure raised inside a single stage.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StageError {
    /// Expression evaluation failed.
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    /// A lookup names a collection the executor does not know.
    #[error("unknown collection '{0}'")]
    UnknownCollection(String),

    /// A facet branch worker panicked.
    #[error("facet branch '{branch}' panicked")]
    WorkerPanicked { branch: String },
}

/// Run-aborting engine error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// A stage failed; carries the stage label and offending record id.
    #[error(
        "stage {stage} failed{}: {source}",
        .record.as_ref().map(|r| format!(" at record {}", r)).unwrap_or_default()
    )]
    Stage {
        stage: String,
        record: Option<String>,
        source: StageError,
    },

    /// The caller cancelled the run.
    #[error("pipeline run cancelled")]
    Cancelled,

    /// The pipeline declaration is invalid.
    #[error("invalid pipeline: {0}")]
    InvalidPipeline(#[from] aggline_proto::Error),
}

impl EngineError {
    /// Label of the failing stage, if the error came from one.
    pub fn stage(&self) -> Option<&str> {
        match self {
            EngineError::Stage { stage, .. } => Some(stage),
            _ => None,
        }
    }

    /// Identity of the offending record, if known.
    pub fn record(&self) -> Option<&str> {
        match self {
            EngineError::Stage { record, .. } => record.as_deref(),
            _ => None,
        }
    }
}

/// A stage failure before the executor attaches the stage label.
#[derive(Debug, Clone, PartialEq)]
pub struct StageFailure {
    /// What went wrong.
    pub error: StageError,
    /// Identity of the record being processed.
    pub record: Option<String>,
}

impl StageFailure {
    /// Failure not tied to a record.
    pub fn new(error: impl Into<StageError>) -> Self {
        Self {
            error: error.into(),
            record: None,
        }
    }

    /// Failure while processing `record`.
    pub fn at(record: &Document, error: impl Into<StageError>) -> Self {
        Self {
            error: error.into(),
            record: record.identity().map(ToString::to_string),
        }
    }

    /// Attach the stage label.
    pub fn into_engine_error(self, stage: impl Into<String>) -> EngineError {
        EngineError::Stage {
            stage: stage.into(),
            record: self.record,
            source: self.error,
        }
    }
}
