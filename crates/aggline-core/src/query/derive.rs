//! Field derivation (`addFields`) stage.

use aggline_proto::{Document, Expr};

use super::eval::Evaluator;
use crate::error::StageFailure;

/// Copy each record and add the derived fields.
///
/// Fields are evaluated left to right, so a later expression can read a
/// field derived earlier in the same stage. Existing fields are kept;
/// deriving an existing name replaces its value in place.
pub fn add_fields(
    records: &[Document],
    fields: &[(String, Expr)],
    evaluator: &Evaluator,
) -> Result<Vec<Document>, StageFailure> {
    let mut output = Vec::with_capacity(records.len());
    for record in records {
        let mut derived = record.clone();
        for (name, expr) in fields {
            let value = evaluator
                .evaluate(expr, &derived)
                .map_err(|e| StageFailure::at(record, e))?;
            derived.insert(name.clone(), value);
        }
        output.push(derived);
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EvaluationError, StageError};
    use aggline_proto::Value;

    fn order(id: i64, quantity: i64, price: f64) -> Document {
        Document::new()
            .with("id", id)
            .with("quantity", quantity)
            .with("product", Document::new().with("price", price))
    }

    #[test]
    fn test_adds_order_value() {
        let input = vec![order(1, 2, 10.0), order(2, 3, 1.5)];
        let fields = vec![(
            "orderValue".to_string(),
            Expr::field("quantity").mul(Expr::field("product.price")),
        )];

        let output = add_fields(&input, &fields, &Evaluator::default()).unwrap();
        assert_eq!(output[0].get("orderValue"), Some(&Value::Float(20.0)));
        assert_eq!(output[1].get("orderValue"), Some(&Value::Float(4.5)));
        // Existing fields are kept and the input is untouched
        assert_eq!(output[0].get("quantity"), Some(&Value::Int(2)));
        assert!(!input[0].contains("orderValue"));
    }

    #[test]
    fn test_later_fields_see_earlier_ones() {
        let fields = vec![
            ("double".to_string(), Expr::field("quantity").mul(Expr::literal(2))),
            ("quad".to_string(), Expr::field("double").mul(Expr::literal(2))),
        ];
        let output = add_fields(&[order(1, 3, 1.0)], &fields, &Evaluator::default()).unwrap();
        assert_eq!(output[0].get("quad"), Some(&Value::Int(12)));
    }

    #[test]
    fn test_failure_carries_record_identity() {
        let fields = vec![("x".to_string(), Expr::field("missing"))];
        let failure = add_fields(&[order(7, 1, 1.0)], &fields, &Evaluator::default()).unwrap_err();

        assert_eq!(failure.record.as_deref(), Some("7"));
        assert_eq!(
            failure.error,
            StageError::Evaluation(EvaluationError::MissingField {
                path: "missing".into()
            })
        );
    }
}
