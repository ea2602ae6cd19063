//! Expression evaluation against documents.

use std::cmp::Ordering;

use aggline_proto::{BinaryOp, Document, Expr, Value};

use crate::config::MissingFieldPolicy;
use crate::error::EvaluationError;

/// A numeric operand or result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    /// Widen to f64.
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }

    /// Convert back into a document value.
    pub fn to_value(self) -> Value {
        match self {
            Number::Int(i) => Value::Int(i),
            Number::Float(f) => Value::Float(f),
        }
    }

    /// Numeric ordering across int and float.
    pub fn total_cmp(self, other: Number) -> Ordering {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a.cmp(&b),
            (a, b) => a.as_f64().total_cmp(&b.as_f64()),
        }
    }

    /// Apply an arithmetic operator.
    ///
    /// Integer operands stay integers with checked arithmetic, except for
    /// division which always yields a float.
    pub fn apply(self, op: BinaryOp, rhs: Number) -> Result<Number, EvaluationError> {
        let name = op.symbol();
        if op == BinaryOp::Divide {
            let divisor = rhs.as_f64();
            if divisor == 0.0 {
                return Err(EvaluationError::DivisionByZero);
            }
            return finite(self.as_f64() / divisor, name);
        }

        match (self, rhs) {
            (Number::Int(a), Number::Int(b)) => {
                let result = match op {
                    BinaryOp::Add => a.checked_add(b),
                    BinaryOp::Subtract => a.checked_sub(b),
                    BinaryOp::Multiply => a.checked_mul(b),
                    BinaryOp::Divide => return finite(a as f64 / b as f64, name),
                };
                result
                    .map(Number::Int)
                    .ok_or(EvaluationError::Overflow { op: name })
            }
            (a, b) => {
                let (a, b) = (a.as_f64(), b.as_f64());
                let result = match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Subtract => a - b,
                    BinaryOp::Multiply => a * b,
                    BinaryOp::Divide => a / b,
                };
                finite(result, name)
            }
        }
    }
}

fn finite(value: f64, op: &'static str) -> Result<Number, EvaluationError> {
    if value.is_finite() {
        Ok(Number::Float(value))
    } else {
        Err(EvaluationError::NonFinite { op })
    }
}

/// Evaluates expressions with a fixed missing-field policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct Evaluator {
    policy: MissingFieldPolicy,
}

impl Evaluator {
    /// Create an evaluator.
    pub fn new(policy: MissingFieldPolicy) -> Self {
        Self { policy }
    }

    /// Evaluate an expression to a value.
    ///
    /// Under [`MissingFieldPolicy::Zero`] a missing field evaluates to null.
    pub fn evaluate(&self, expr: &Expr, record: &Document) -> Result<Value, EvaluationError> {
        match expr {
            Expr::Field(path) => match record.get_path(path) {
                Some(value) => Ok(value.clone()),
                None => match self.policy {
                    MissingFieldPolicy::Error => Err(EvaluationError::MissingField {
                        path: path.to_string(),
                    }),
                    MissingFieldPolicy::Zero => Ok(Value::Null),
                },
            },
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Binary { op, left, right } => {
                let lhs = self.evaluate_numeric(left, record, op.symbol())?;
                let rhs = self.evaluate_numeric(right, record, op.symbol())?;
                Ok(lhs.apply(*op, rhs)?.to_value())
            }
        }
    }

    /// Evaluate an expression that must produce a number.
    ///
    /// `op` names the consumer (operator, accumulator or stage) for error
    /// messages. Under [`MissingFieldPolicy::Zero`] a missing field is `0`.
    pub fn evaluate_numeric(
        &self,
        expr: &Expr,
        record: &Document,
        op: &'static str,
    ) -> Result<Number, EvaluationError> {
        if let Expr::Field(path) = expr {
            if record.get_path(path).is_none() && self.policy == MissingFieldPolicy::Zero {
                return Ok(Number::Int(0));
            }
        }
        match self.evaluate(expr, record)? {
            Value::Int(i) => Ok(Number::Int(i)),
            Value::Float(f) if f.is_finite() => Ok(Number::Float(f)),
            Value::Float(_) => Err(EvaluationError::NonFinite { op }),
            other => Err(EvaluationError::NonNumeric {
                op,
                found: other.type_name(),
            }),
        }
    }
}
