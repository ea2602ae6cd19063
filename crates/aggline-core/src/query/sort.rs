//! Sort and limit stages.

use aggline_proto::{Document, Expr, Sort, SortDirection};

use super::eval::{Evaluator, Number};
use crate::error::StageFailure;

/// Stable sort by a single numeric field.
///
/// Records with equal keys keep their relative input order in both
/// directions, so a following limit picks a reproducible top-N.
pub fn sort_records(
    records: &[Document],
    sort: &Sort,
    evaluator: &Evaluator,
) -> Result<Vec<Document>, StageFailure> {
    let key_expr = Expr::Field(sort.field.clone());
    let mut keyed: Vec<(Number, usize)> = Vec::with_capacity(records.len());
    for (position, record) in records.iter().enumerate() {
        let key = evaluator
            .evaluate_numeric(&key_expr, record, "sort")
            .map_err(|e| StageFailure::at(record, e))?;
        keyed.push((key, position));
    }

    // slice::sort_by is stable; ties keep input position
    keyed.sort_by(|(a, _), (b, _)| match sort.direction {
        SortDirection::Ascending => a.total_cmp(*b),
        SortDirection::Descending => b.total_cmp(*a),
    });

    Ok(keyed
        .into_iter()
        .map(|(_, position)| records[position].clone())
        .collect())
}

/// Keep the first `n` records.
pub fn limit_records(records: &[Document], n: usize) -> Vec<Document> {
    records[..n.min(records.len())].to_vec()
}
