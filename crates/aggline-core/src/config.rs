//! Engine configuration.

/// What evaluation does when a referenced field path is absent.
///
/// The policy is applied by every stage of a run: derivations, accumulators,
/// sort keys and match predicates all resolve fields through the same
/// evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingFieldPolicy {
    /// Abort the run with `EvaluationError::MissingField`.
    #[default]
    Error,
    /// Treat a missing numeric operand as `0` and a missing value as null.
    Zero,
}

fn default_facet_workers() -> usize {
    std::thread::available_parallelism()
        .map(|count| count.get())
        .unwrap_or(4)
        .max(1)
}

/// Pipeline executor configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Size of the facet worker pool.
    pub facet_workers: usize,

    /// Run facet branches on the worker pool. When false, branches run
    /// sequentially on the calling thread.
    pub parallel_facets: bool,

    /// Missing field handling.
    pub missing_fields: MissingFieldPolicy,
}

impl EngineConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self {
            facet_workers: default_facet_workers(),
            parallel_facets: true,
            missing_fields: MissingFieldPolicy::default(),
        }
    }

    /// Set the facet worker pool size (at least 1).
    pub fn with_facet_workers(mut self, workers: usize) -> Self {
        self.facet_workers = workers.max(1);
        self
    }

    /// Run facet branches sequentially on the calling thread.
    pub fn sequential_facets(mut self) -> Self {
        self.parallel_facets = false;
        self
    }

    /// Set the missing field policy.
    pub fn with_missing_fields(mut self, policy: MissingFieldPolicy) -> Self {
        self.missing_fields = policy;
        self
    }

    /// Effective number of threads used for `branches` facet branches.
    pub fn facet_threads(&self, branches: usize) -> usize {
        if self.parallel_facets {
            self.facet_workers.min(branches).max(1)
        } else {
            1
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}
