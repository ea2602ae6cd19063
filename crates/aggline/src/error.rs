//! Error types for the analytics service.

use aggline_core::EngineError;
use thiserror::Error;

use crate::provider::ProviderError;

/// Analytics errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Loading the dataset failed.
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The pipeline run failed.
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    /// The pipeline produced a different output kind than expected.
    #[error("unexpected pipeline output: expected {expected}")]
    UnexpectedOutput { expected: &'static str },
}

impl From<aggline_core::proto::Error> for Error {
    fn from(err: aggline_core::proto::Error) -> Self {
        Error::Engine(EngineError::InvalidPipeline(err))
    }
}

/// Result type for analytics operations.
pub type Result<T> = std::result::Result<T, Error>;
