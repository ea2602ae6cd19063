//! Filter evaluation for the match stage.
//!
//! This module provides the `FilterEvaluator` that evaluates predicates from
//! the pipeline IR against documents.

use std::cmp::Ordering;

use aggline_proto::{CompareOp, Document, Predicate, Value};

use super::eval::Evaluator;
use super::key::values_equal;
use crate::error::EvaluationError;

/// Evaluates predicates against documents.
pub struct FilterEvaluator;

impl FilterEvaluator {
    /// Evaluate a predicate against a document.
    ///
    /// Returns `true` if the document matches. Ordering comparisons between
    /// incomparable values (e.g. a string and a number) do not match.
    pub fn evaluate(
        predicate: &Predicate,
        record: &Document,
        evaluator: &Evaluator,
    ) -> Result<bool, EvaluationError> {
        match predicate {
            Predicate::Compare { op, left, right } => {
                let lhs = evaluator.evaluate(left, record)?;
                let rhs = evaluator.evaluate(right, record)?;
                Ok(Self::compare(*op, &lhs, &rhs))
            }
            Predicate::And(predicates) => {
                for p in predicates {
                    if !Self::evaluate(p, record, evaluator)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Predicate::Or(predicates) => {
                for p in predicates {
                    if Self::evaluate(p, record, evaluator)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }

    fn compare(op: CompareOp, lhs: &Value, rhs: &Value) -> bool {
        match op {
            CompareOp::Eq => values_equal(lhs, rhs),
            CompareOp::Ne => !values_equal(lhs, rhs),
            CompareOp::Lt => Self::compare_values(lhs, rhs).is_some_and(Ordering::is_lt),
            CompareOp::Le => Self::compare_values(lhs, rhs).is_some_and(Ordering::is_le),
            CompareOp::Gt => Self::compare_values(lhs, rhs).is_some_and(Ordering::is_gt),
            CompareOp::Ge => Self::compare_values(lhs, rhs).is_some_and(Ordering::is_ge),
        }
    }

    /// Order two values of compatible types.
    fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
        match (a, b) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (a, b) if a.is_numeric() && b.is_numeric() => {
                a.as_f64()?.partial_cmp(&b.as_f64()?)
            }
            _ => None,
        }
    }
}
