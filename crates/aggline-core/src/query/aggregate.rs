//! Group stage executor.
//!
//! Grouping is a single pass over the input: each record's key selects (or
//! creates) a group state, and every accumulator of that group is updated in
//! input order. One output record per distinct key is emitted once the input
//! is consumed, in the order keys were first seen.

use std::collections::HashMap;

use aggline_proto::{Accumulator, Document, Expr, Group, Value};

use super::eval::{Evaluator, Number};
use super::key::KeyValue;
use crate::error::{EvaluationError, StageFailure};

/// Running total of a `sum` accumulator.
///
/// Integers are summed in `i128` and only range-checked when the group is
/// emitted, so the result does not depend on input order.
#[derive(Debug, Clone, Copy)]
enum SumTotal {
    Int(i128),
    Float(f64),
}

impl SumTotal {
    fn add(self, value: Number) -> Result<SumTotal, EvaluationError> {
        match (self, value) {
            (SumTotal::Int(total), Number::Int(v)) => total
                .checked_add(i128::from(v))
                .map(SumTotal::Int)
                .ok_or(EvaluationError::Overflow { op: "sum" }),
            (total, value) => {
                let sum = total.as_f64() + value.as_f64();
                if sum.is_finite() {
                    Ok(SumTotal::Float(sum))
                } else {
                    Err(EvaluationError::NonFinite { op: "sum" })
                }
            }
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            SumTotal::Int(i) => i as f64,
            SumTotal::Float(f) => f,
        }
    }

    fn finish(self) -> Result<Value, EvaluationError> {
        match self {
            SumTotal::Int(total) => i64::try_from(total)
                .map(Value::Int)
                .map_err(|_| EvaluationError::Overflow { op: "sum" }),
            SumTotal::Float(total) => Ok(Value::Float(total)),
        }
    }
}

/// Running state of one accumulator within one group.
#[derive(Debug, Clone)]
enum AccumulatorState<'a> {
    Sum { expr: &'a Expr, total: SumTotal },
    Count(i64),
    First { expr: &'a Expr, value: Option<Value> },
    Min { expr: &'a Expr, value: Option<Number> },
    Max { expr: &'a Expr, value: Option<Number> },
    Avg { expr: &'a Expr, sum: f64, count: u64 },
}

impl<'a> AccumulatorState<'a> {
    fn new(accumulator: &'a Accumulator) -> Self {
        match accumulator {
            Accumulator::Sum(expr) => AccumulatorState::Sum {
                expr,
                total: SumTotal::Int(0),
            },
            Accumulator::Count => AccumulatorState::Count(0),
            Accumulator::First(expr) => AccumulatorState::First { expr, value: None },
            Accumulator::Min(expr) => AccumulatorState::Min { expr, value: None },
            Accumulator::Max(expr) => AccumulatorState::Max { expr, value: None },
            Accumulator::Avg(expr) => AccumulatorState::Avg {
                expr,
                sum: 0.0,
                count: 0,
            },
        }
    }

    fn update(&mut self, record: &Document, evaluator: &Evaluator) -> Result<(), EvaluationError> {
        match self {
            AccumulatorState::Sum { expr, total } => {
                let value = evaluator.evaluate_numeric(expr, record, "sum")?;
                *total = total.add(value)?;
            }
            AccumulatorState::Count(count) => {
                *count = count
                    .checked_add(1)
                    .ok_or(EvaluationError::Overflow { op: "count" })?;
            }
            AccumulatorState::First { expr, value } => {
                if value.is_none() {
                    *value = Some(evaluator.evaluate(expr, record)?);
                }
            }
            AccumulatorState::Min { expr, value } => {
                let next = evaluator.evaluate_numeric(expr, record, "min")?;
                if value.map_or(true, |current| next.total_cmp(current).is_lt()) {
                    *value = Some(next);
                }
            }
            AccumulatorState::Max { expr, value } => {
                let next = evaluator.evaluate_numeric(expr, record, "max")?;
                if value.map_or(true, |current| next.total_cmp(current).is_gt()) {
                    *value = Some(next);
                }
            }
            AccumulatorState::Avg { expr, sum, count } => {
                let value = evaluator.evaluate_numeric(expr, record, "avg")?;
                *sum += value.as_f64();
                if !sum.is_finite() {
                    return Err(EvaluationError::NonFinite { op: "avg" });
                }
                *count += 1;
            }
        }
        Ok(())
    }

    fn finish(self) -> Result<Value, EvaluationError> {
        match self {
            AccumulatorState::Sum { total, .. } => total.finish(),
            AccumulatorState::Count(count) => Ok(Value::Int(count)),
            AccumulatorState::First { value, .. } => Ok(value.unwrap_or(Value::Null)),
            AccumulatorState::Min { value, .. } | AccumulatorState::Max { value, .. } => {
                Ok(value.map(Number::to_value).unwrap_or(Value::Null))
            }
            AccumulatorState::Avg { count: 0, .. } => Ok(Value::Null),
            AccumulatorState::Avg { sum, count, .. } => Ok(Value::Float(sum / count as f64)),
        }
    }
}

struct GroupState<'a> {
    key: Value,
    accumulators: Vec<AccumulatorState<'a>>,
}

/// Executor for group stages.
pub struct GroupExecutor<'a> {
    group: &'a Group,
    evaluator: &'a Evaluator,
}

impl<'a> GroupExecutor<'a> {
    /// Create an executor for one group declaration.
    pub fn new(group: &'a Group, evaluator: &'a Evaluator) -> Self {
        Self { group, evaluator }
    }

    /// Group `records` and emit `{_id, <accumulators>...}` per distinct key.
    pub fn execute(&self, records: &[Document]) -> Result<Vec<Document>, StageFailure> {
        let mut index: HashMap<KeyValue, usize> = HashMap::new();
        let mut groups: Vec<GroupState> = Vec::new();

        for record in records {
            let key = self
                .evaluator
                .evaluate(&self.group.key, record)
                .map_err(|e| StageFailure::at(record, e))?;

            let slot = match index.get(&KeyValue(key.clone())) {
                Some(&slot) => slot,
                None => {
                    let slot = groups.len();
                    groups.push(GroupState {
                        key: key.clone(),
                        accumulators: self
                            .group
                            .accumulators
                            .iter()
                            .map(|(_, acc)| AccumulatorState::new(acc))
                            .collect(),
                    });
                    index.insert(KeyValue(key), slot);
                    slot
                }
            };

            for acc_state in groups[slot].accumulators.iter_mut() {
                acc_state
                    .update(record, self.evaluator)
                    .map_err(|e| StageFailure::at(record, e))?;
            }
        }

        tracing::trace!(groups = groups.len(), input = records.len(), "grouping complete");

        let mut output = Vec::with_capacity(groups.len());
        for state in groups {
            let mut doc = Document::with_capacity(state.accumulators.len() + 1);
            doc.insert("_id", state.key);
            for ((name, _), acc_state) in self.group.accumulators.iter().zip(state.accumulators) {
                doc.insert(name.clone(), acc_state.finish().map_err(StageFailure::new)?);
            }
            output.push(doc);
        }
        Ok(output)
    }
}
