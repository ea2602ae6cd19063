//! Facet stage: run named branches over one input snapshot.

use aggline_proto::{Document, Facet, FacetResult};

use super::executor::RunContext;
use super::pool::{FacetPool, PoolError};
use crate::error::{EngineError, StageError, StageFailure};

/// Run every branch of `facet` over `records`.
///
/// Branches only read the shared snapshot, so they run concurrently on a
/// [`FacetPool`] when the configuration allows it. A single-thread pool runs
/// them in declaration order on the calling thread. Output keeps declaration
/// order regardless of completion order.
pub(crate) fn execute_facet(
    ctx: &RunContext<'_>,
    facet: &Facet,
    records: &[Document],
    label: &str,
) -> Result<FacetResult, EngineError> {
    let branches = &facet.branches;
    let pool = FacetPool::new(ctx.config.facet_threads(branches.len()));
    tracing::debug!(
        stage = %label,
        branches = branches.len(),
        threads = pool.threads(),
        "running facet branches"
    );

    let result = pool.run(branches.len(), ctx.cancel, |index, stop| {
        let (name, stages) = &branches[index];
        match ctx.run_stages(stages, Some(name), records, stop) {
            Ok(output) => Ok(Some(output)),
            Err(EngineError::Cancelled) => Ok(None),
            Err(error) => Err(error),
        }
    });

    let outputs = match result {
        Ok(outputs) => outputs,
        Err(PoolError::Task { error, .. }) => return Err(error),
        Err(PoolError::Panicked { index }) => {
            let branch = branches[index].0.clone();
            tracing::error!(stage = %label, branch = %branch, "facet branch panicked");
            return Err(
                StageFailure::new(StageError::WorkerPanicked { branch }).into_engine_error(label)
            );
        }
        Err(PoolError::Cancelled) => return Err(EngineError::Cancelled),
    };

    let mut result = FacetResult::new();
    for ((name, _), output) in branches.iter().zip(outputs) {
        result.push(name.clone(), output);
    }
    Ok(result)
}
