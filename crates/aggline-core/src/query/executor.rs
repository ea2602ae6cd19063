//! Pipeline executor.
//!
//! The executor threads a record sequence through the stages of a validated
//! [`Pipeline`]. Every stage reads its input as a slice and produces a fresh
//! sequence, so caller data and registered collections are never modified.
//! A terminal facet stage fans the sequence out into named branches.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use aggline_proto::{Document, Pipeline, PipelineOutput, Stage};

use super::aggregate::GroupExecutor;
use super::derive::add_fields;
use super::eval::Evaluator;
use super::facet::execute_facet;
use super::filter::FilterEvaluator;
use super::join::HashJoinExecutor;
use super::sort::{limit_records, sort_records};
use crate::cancel::CancellationToken;
use crate::config::EngineConfig;
use crate::error::{EngineError, StageError, StageFailure};

/// Counters collected during one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStats {
    /// Records handed to the run.
    pub input_records: usize,
    /// Records produced (summed over branches for facet output).
    pub output_records: usize,
    /// Records excluded by lookups, across all branches.
    pub dropped_by_join: usize,
    /// Stages executed, counting each branch stage.
    pub stages_executed: usize,
    /// Wall time of the run.
    pub elapsed: Duration,
}

/// Shared state of one run, borrowed by every stage and facet branch.
pub(crate) struct RunContext<'a> {
    pub(crate) config: &'a EngineConfig,
    pub(crate) cancel: &'a CancellationToken,
    evaluator: Evaluator,
    collections: &'a HashMap<String, Vec<Arc<Document>>>,
    dropped_by_join: AtomicUsize,
    stages_executed: AtomicUsize,
}

impl<'a> RunContext<'a> {
    /// Run a linear stage list. `branch` names the enclosing facet branch.
    pub(crate) fn run_stages(
        &self,
        stages: &[Stage],
        branch: Option<&str>,
        input: &[Document],
        stop: &dyn Fn() -> bool,
    ) -> Result<Vec<Document>, EngineError> {
        let mut current: Cow<'_, [Document]> = Cow::Borrowed(input);

        for (index, stage) in stages.iter().enumerate() {
            if stop() {
                return Err(EngineError::Cancelled);
            }

            if let Stage::Facet(_) = stage {
                let error = match branch {
                    Some(name) => aggline_proto::Error::NestedFacet {
                        branch: name.to_string(),
                    },
                    None => aggline_proto::Error::FacetNotTerminal { position: index },
                };
                return Err(error.into());
            }

            let label = match branch {
                Some(name) => format!("facet.{}[{}]:{}", name, index, stage.name()),
                None => format!("[{}]:{}", index, stage.name()),
            };

            let output = self.run_stage(stage, &label, &current)?;
            self.stages_executed.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(
                stage = %label,
                input = current.len(),
                output = output.len(),
                "stage complete"
            );
            current = Cow::Owned(output);
        }

        Ok(current.into_owned())
    }

    fn run_stage(
        &self,
        stage: &Stage,
        label: &str,
        input: &[Document],
    ) -> Result<Vec<Document>, EngineError> {
        match stage {
            Stage::Lookup(lookup) => {
                let right = self.collections.get(&lookup.from).ok_or_else(|| {
                    StageFailure::new(StageError::UnknownCollection(lookup.from.clone()))
                        .into_engine_error(label)
                })?;

                let joined = HashJoinExecutor::execute(input, right, lookup);
                let dropped = input.len() - joined.records.len();
                self.dropped_by_join.fetch_add(dropped, Ordering::Relaxed);
                if dropped > 0 {
                    tracing::debug!(
                        stage = %label,
                        unmatched = joined.unmatched,
                        key_errors = joined.key_errors,
                        "lookup excluded records"
                    );
                }
                Ok(joined.records)
            }
            Stage::AddFields(fields) => {
                add_fields(input, fields, &self.evaluator).map_err(|f| f.into_engine_error(label))
            }
            Stage::Match(predicate) => {
                let mut output = Vec::new();
                for record in input {
                    let keep = FilterEvaluator::evaluate(predicate, record, &self.evaluator)
                        .map_err(|e| StageFailure::at(record, e).into_engine_error(label))?;
                    if keep {
                        output.push(record.clone());
                    }
                }
                Ok(output)
            }
            Stage::Group(group) => GroupExecutor::new(group, &self.evaluator)
                .execute(input)
                .map_err(|f| f.into_engine_error(label)),
            Stage::Sort(sort) => {
                sort_records(input, sort, &self.evaluator).map_err(|f| f.into_engine_error(label))
            }
            Stage::Limit(n) => Ok(limit_records(input, *n)),
            Stage::Facet(_) => Err(aggline_proto::Error::NestedFacet {
                branch: label.to_string(),
            }
            .into()),
        }
    }
}

/// Executes pipelines against registered reference collections.
///
/// Collections are shared read-only by every run; the executor itself can be
/// shared across threads and used for concurrent runs.
#[derive(Debug, Default)]
pub struct PipelineExecutor {
    config: EngineConfig,
    collections: HashMap<String, Vec<Arc<Document>>>,
    cancel: CancellationToken,
}

impl PipelineExecutor {
    /// Create an executor with no collections.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            collections: HashMap::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Register a reference collection (builder style).
    pub fn with_collection(mut self, name: impl Into<String>, records: Vec<Document>) -> Self {
        self.register_collection(name, records);
        self
    }

    /// Register or replace a reference collection.
    pub fn register_collection(&mut self, name: impl Into<String>, records: Vec<Document>) {
        let name = name.into();
        tracing::debug!(collection = %name, records = records.len(), "registered collection");
        self.collections
            .insert(name, records.into_iter().map(Arc::new).collect());
    }

    /// Use an externally owned cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that cancels runs of this executor.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Records of a registered collection.
    pub fn collection(&self, name: &str) -> Option<&[Arc<Document>]> {
        self.collections.get(name).map(Vec::as_slice)
    }

    /// Run `pipeline` over `input`.
    pub fn run(&self, pipeline: &Pipeline, input: &[Document]) -> Result<PipelineOutput, EngineError> {
        self.run_with_stats(pipeline, input).map(|(output, _)| output)
    }

    /// Run `pipeline` over `input` and report run counters.
    pub fn run_with_stats(
        &self,
        pipeline: &Pipeline,
        input: &[Document],
    ) -> Result<(PipelineOutput, RunStats), EngineError> {
        let start = Instant::now();
        let ctx = RunContext {
            config: &self.config,
            cancel: &self.cancel,
            evaluator: Evaluator::new(self.config.missing_fields),
            collections: &self.collections,
            dropped_by_join: AtomicUsize::new(0),
            stages_executed: AtomicUsize::new(0),
        };

        let stages = pipeline.stages();
        let (linear, facet) = match pipeline.facet() {
            Some(facet) => (&stages[..stages.len() - 1], Some(facet)),
            None => (stages, None),
        };

        let stop = || self.cancel.is_cancelled();
        let result = ctx.run_stages(linear, None, input, &stop).and_then(|records| {
            match facet {
                Some(facet) => {
                    if stop() {
                        return Err(EngineError::Cancelled);
                    }
                    let label = format!("[{}]:facet", linear.len());
                    let facets = execute_facet(&ctx, facet, &records, &label)?;
                    ctx.stages_executed.fetch_add(1, Ordering::Relaxed);
                    Ok(PipelineOutput::Facets(facets))
                }
                None => Ok(PipelineOutput::Records(records)),
            }
        });

        let output = match result {
            Ok(output) => output,
            Err(EngineError::Cancelled) => {
                tracing::warn!(elapsed = ?start.elapsed(), "pipeline run cancelled");
                return Err(EngineError::Cancelled);
            }
            Err(error) => {
                tracing::warn!(error = %error, "pipeline run failed");
                return Err(error);
            }
        };

        let stats = RunStats {
            input_records: input.len(),
            output_records: match &output {
                PipelineOutput::Records(records) => records.len(),
                PipelineOutput::Facets(facets) => facets.iter().map(|(_, r)| r.len()).sum(),
            },
            dropped_by_join: ctx.dropped_by_join.into_inner(),
            stages_executed: ctx.stages_executed.into_inner(),
            elapsed: start.elapsed(),
        };

        tracing::info!(
            input = stats.input_records,
            output = stats.output_records,
            dropped_by_join = stats.dropped_by_join,
            elapsed = ?stats.elapsed,
            "pipeline run complete"
        );

        Ok((output, stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MissingFieldPolicy;
    use aggline_proto::{Expr, Facet, Group, Lookup, Predicate, Value};

    fn users() -> Vec<Document> {
        vec![
            Document::new().with("id", "U1").with("name", "Ann"),
            Document::new().with("id", "U2").with("name", "Bob"),
        ]
    }

    fn products() -> Vec<Document> {
        vec![
            Document::new().with("id", "P1").with("category", "Books").with("price", 10.0),
            Document::new().with("id", "P2").with("category", "Games").with("price", 25.0),
        ]
    }

    fn orders() -> Vec<Document> {
        vec![
            order(1, "U1", "P1", 2),
            order(2, "U2", "P2", 1),
            order(3, "U1", "P2", 1),
            order(4, "U9", "P1", 5),
        ]
    }

    fn order(id: i64, user: &str, product: &str, quantity: i64) -> Document {
        Document::new()
            .with("id", id)
            .with("userId", user)
            .with("productId", product)
            .with("quantity", quantity)
    }

    fn executor() -> PipelineExecutor {
        PipelineExecutor::new(EngineConfig::new().with_facet_workers(2))
            .with_collection("users", users())
            .with_collection("products", products())
    }

    fn enrich() -> aggline_proto::PipelineBuilder {
        Pipeline::builder()
            .lookup(Lookup::new("users", "userId", "id", "user"))
            .lookup(Lookup::new("products", "productId", "id", "product"))
            .add_field(
                "orderValue",
                Expr::field("quantity").mul(Expr::field("product.price")),
            )
    }

    #[test]
    fn test_linear_pipeline() {
        let pipeline = enrich()
            .group(
                Group::by_field("user.id")
                    .first("name", Expr::field("user.name"))
                    .sum("totalSpent", Expr::field("orderValue")),
            )
            .sort(aggline_proto::Sort::desc("totalSpent"))
            .build()
            .unwrap();

        let records = executor()
            .run(&pipeline, &orders())
            .unwrap()
            .into_records()
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("name"), Some(&Value::from("Ann")));
        assert_eq!(records[0].get("totalSpent"), Some(&Value::Float(45.0)));
        assert_eq!(records[1].get("totalSpent"), Some(&Value::Float(25.0)));
    }

    #[test]
    fn test_run_stats_count_dropped_records() {
        let pipeline = enrich().build().unwrap();
        let (output, stats) = executor().run_with_stats(&pipeline, &orders()).unwrap();

        assert_eq!(output.into_records().unwrap().len(), 3);
        assert_eq!(stats.input_records, 4);
        assert_eq!(stats.output_records, 3);
        assert_eq!(stats.dropped_by_join, 1);
        assert_eq!(stats.stages_executed, 3);
    }

    #[test]
    fn test_facet_output_in_declaration_order() {
        let facet = Facet::new()
            .branch(
                "zeta",
                [Stage::Group(Group::by_field("product.category").count("n"))],
            )
            .branch("alpha", [Stage::limit(1)])
            .branch("empty", Vec::new());
        let pipeline = enrich().facet(facet).build().unwrap();

        let facets = executor()
            .run(&pipeline, &orders())
            .unwrap()
            .into_facets()
            .unwrap();

        assert_eq!(facets.names().collect::<Vec<_>>(), vec!["zeta", "alpha", "empty"]);
        assert_eq!(facets.get("zeta").map(<[Document]>::len), Some(2));
        assert_eq!(facets.get("alpha").map(<[Document]>::len), Some(1));
        assert_eq!(facets.get("empty").map(<[Document]>::len), Some(3));
    }

    #[test]
    fn test_sequential_and_parallel_facets_agree() {
        let facet = Facet::new()
            .branch("byUser", [Stage::Group(Group::by_field("user.id").count("n"))])
            .branch("top", [Stage::sort_desc("orderValue"), Stage::limit(2)]);
        let pipeline = enrich().facet(facet).build().unwrap();

        let parallel = executor().run(&pipeline, &orders()).unwrap();
        let sequential = PipelineExecutor::new(EngineConfig::new().sequential_facets())
            .with_collection("users", users())
            .with_collection("products", products())
            .run(&pipeline, &orders())
            .unwrap();
        assert_eq!(parallel, sequential);
    }

    #[test]
    fn test_error_carries_stage_label_and_record() {
        let pipeline = Pipeline::builder()
            .add_field("v", Expr::field("quantity").mul(Expr::field("price")))
            .build()
            .unwrap();
        let err = executor().run(&pipeline, &orders()).unwrap_err();
        assert_eq!(err.stage(), Some("[0]:addFields"));
        assert_eq!(err.record(), Some("1"));
    }

    #[test]
    fn test_facet_branch_error_label() {
        let facet = Facet::new()
            .branch("ok", [Stage::limit(1)])
            .branch("bad", [Stage::sort_desc("user.name")]);
        let pipeline = enrich().facet(facet).build().unwrap();
        let err = executor().run(&pipeline, &orders()).unwrap_err();
        assert_eq!(err.stage(), Some("facet.bad[0]:sort"));
    }

    #[test]
    fn test_unknown_collection() {
        let pipeline = Pipeline::builder()
            .lookup(Lookup::new("customers", "userId", "id", "user"))
            .build()
            .unwrap();
        let err = executor().run(&pipeline, &orders()).unwrap_err();
        assert_eq!(
            err,
            EngineError::Stage {
                stage: "[0]:lookup".into(),
                record: None,
                source: StageError::UnknownCollection("customers".into()),
            }
        );
    }

    #[test]
    fn test_cancelled_run() {
        let executor = executor();
        executor.cancellation_token().cancel();
        let pipeline = enrich().build().unwrap();
        assert_eq!(executor.run(&pipeline, &orders()), Err(EngineError::Cancelled));
    }

    #[test]
    fn test_empty_pipeline_returns_input() {
        let pipeline = Pipeline::builder().build().unwrap();
        let records = executor()
            .run(&pipeline, &orders())
            .unwrap()
            .into_records()
            .unwrap();
        assert_eq!(records, orders());
    }

    #[test]
    fn test_inputs_and_collections_unchanged() {
        let input = orders();
        let executor = executor();
        let pipeline = enrich()
            .filter(Predicate::gt("orderValue", 20))
            .build()
            .unwrap();
        let _ = executor.run(&pipeline, &input).unwrap();

        assert_eq!(input, orders());
        let users: Vec<_> = executor
            .collection("users")
            .unwrap()
            .iter()
            .map(|u| u.as_ref().clone())
            .collect();
        assert_eq!(users, self::users());
    }

    #[test]
    fn test_missing_field_policy_applies_to_run() {
        let pipeline = Pipeline::builder()
            .add_field("v", Expr::field("quantity").add(Expr::field("discount")))
            .build()
            .unwrap();
        let executor = PipelineExecutor::new(
            EngineConfig::new().with_missing_fields(MissingFieldPolicy::Zero),
        );
        let records = executor
            .run(&pipeline, &orders())
            .unwrap()
            .into_records()
            .unwrap();
        assert_eq!(records[0].get("v"), Some(&Value::Int(2)));
    }
}
