//! Pipeline IR: stage descriptors and the pipeline builder.
//!
//! A pipeline is data, not a parsed query. Hosts compose it with
//! [`Pipeline::builder`] and the typed stage constructors below; `build()`
//! rejects structurally invalid declarations before anything runs.

use std::collections::HashSet;

use crate::error::Error;
use crate::expr::{Expr, FieldPath};
use crate::value::Value;

/// How a lookup treats left records without a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinMode {
    /// Drop left records with no match.
    #[default]
    Inner,
    /// Keep left records; the output field is set to null.
    LeftOuter,
}

/// Join each input record with one record of a named collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Lookup {
    /// Name of the reference collection.
    pub from: String,
    /// Key on the input record.
    pub local_field: FieldPath,
    /// Key on the reference record.
    pub foreign_field: FieldPath,
    /// Output field receiving the matched record.
    pub as_field: String,
    /// Unmatched-record policy.
    pub mode: JoinMode,
}

impl Lookup {
    /// Create an inner lookup.
    pub fn new(
        from: impl Into<String>,
        local_field: impl Into<String>,
        foreign_field: impl Into<String>,
        as_field: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            local_field: FieldPath::new(local_field),
            foreign_field: FieldPath::new(foreign_field),
            as_field: as_field.into(),
            mode: JoinMode::Inner,
        }
    }

    /// Keep unmatched left records.
    pub fn left_outer(mut self) -> Self {
        self.mode = JoinMode::LeftOuter;
        self
    }
}

/// Per-group reducer.
#[derive(Debug, Clone, PartialEq)]
pub enum Accumulator {
    /// Numeric sum, starting at 0.
    Sum(Expr),
    /// Number of records in the group.
    Count,
    /// Value from the first record of the group, in input order.
    First(Expr),
    /// Smallest numeric value.
    Min(Expr),
    /// Largest numeric value.
    Max(Expr),
    /// Arithmetic mean; null for an empty input.
    Avg(Expr),
}

impl Accumulator {
    /// Operator name used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Accumulator::Sum(_) => "sum",
            Accumulator::Count => "count",
            Accumulator::First(_) => "first",
            Accumulator::Min(_) => "min",
            Accumulator::Max(_) => "max",
            Accumulator::Avg(_) => "avg",
        }
    }

    /// The input expression, if the accumulator reads one.
    pub fn expr(&self) -> Option<&Expr> {
        match self {
            Accumulator::Sum(e)
            | Accumulator::First(e)
            | Accumulator::Min(e)
            | Accumulator::Max(e)
            | Accumulator::Avg(e) => Some(e),
            Accumulator::Count => None,
        }
    }
}

/// Group records by key and reduce each group.
///
/// Output records are `{_id: key, <name>: <accumulator result>, ...}` with
/// accumulators in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    /// Grouping key.
    pub key: Expr,
    /// Named accumulators.
    pub accumulators: Vec<(String, Accumulator)>,
}

impl Group {
    /// Group by an expression.
    pub fn by(key: Expr) -> Self {
        Self {
            key,
            accumulators: Vec::new(),
        }
    }

    /// Group by a field path.
    pub fn by_field(path: impl Into<String>) -> Self {
        Self::by(Expr::field(path))
    }

    /// Add an accumulator.
    pub fn with(mut self, name: impl Into<String>, accumulator: Accumulator) -> Self {
        self.accumulators.push((name.into(), accumulator));
        self
    }

    /// Add a `sum` accumulator.
    pub fn sum(self, name: impl Into<String>, expr: Expr) -> Self {
        self.with(name, Accumulator::Sum(expr))
    }

    /// Add a `count` accumulator.
    pub fn count(self, name: impl Into<String>) -> Self {
        self.with(name, Accumulator::Count)
    }

    /// Add a `first` accumulator.
    pub fn first(self, name: impl Into<String>, expr: Expr) -> Self {
        self.with(name, Accumulator::First(expr))
    }

    /// Add a `min` accumulator.
    pub fn min(self, name: impl Into<String>, expr: Expr) -> Self {
        self.with(name, Accumulator::Min(expr))
    }

    /// Add a `max` accumulator.
    pub fn max(self, name: impl Into<String>, expr: Expr) -> Self {
        self.with(name, Accumulator::Max(expr))
    }

    /// Add an `avg` accumulator.
    pub fn avg(self, name: impl Into<String>, expr: Expr) -> Self {
        self.with(name, Accumulator::Avg(expr))
    }

    fn validate(&self) -> Result<(), Error> {
        validate_expr(&self.key)?;
        let mut seen = HashSet::new();
        for (name, acc) in &self.accumulators {
            if name == "_id" {
                return Err(Error::ReservedAccumulatorName);
            }
            validate_field_name(name)?;
            if !seen.insert(name.as_str()) {
                return Err(Error::DuplicateAccumulator(name.clone()));
            }
            if let Some(expr) = acc.expr() {
                validate_expr(expr)?;
            }
        }
        Ok(())
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Stable sort by a single numeric field.
#[derive(Debug, Clone, PartialEq)]
pub struct Sort {
    /// Sort key.
    pub field: FieldPath,
    /// Direction.
    pub direction: SortDirection,
}

impl Sort {
    /// Ascending sort.
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: FieldPath::new(field),
            direction: SortDirection::Ascending,
        }
    }

    /// Descending sort.
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: FieldPath::new(field),
            direction: SortDirection::Descending,
        }
    }
}

/// Comparison operator for [`Predicate::Compare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Record filter used by the match stage.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Compare two expressions.
    Compare { op: CompareOp, left: Expr, right: Expr },
    /// All predicates hold.
    And(Vec<Predicate>),
    /// At least one predicate holds.
    Or(Vec<Predicate>),
}

impl Predicate {
    fn compare(op: CompareOp, field: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Compare {
            op,
            left: Expr::field(field),
            right: Expr::Literal(value.into()),
        }
    }

    /// `field == value`
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(CompareOp::Eq, field, value)
    }

    /// `field != value`
    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(CompareOp::Ne, field, value)
    }

    /// `field < value`
    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(CompareOp::Lt, field, value)
    }

    /// `field <= value`
    pub fn le(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(CompareOp::Le, field, value)
    }

    /// `field > value`
    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(CompareOp::Gt, field, value)
    }

    /// `field >= value`
    pub fn ge(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(CompareOp::Ge, field, value)
    }

    /// Every expression referenced by the predicate tree.
    pub fn exprs(&self) -> Vec<&Expr> {
        match self {
            Predicate::Compare { left, right, .. } => vec![left, right],
            Predicate::And(preds) | Predicate::Or(preds) => {
                preds.iter().flat_map(|p| p.exprs()).collect()
            }
        }
    }
}

/// Independent named sub-pipelines over the same input snapshot.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Facet {
    /// Branches in declaration order.
    pub branches: Vec<(String, Vec<Stage>)>,
}

impl Facet {
    /// Create an empty facet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named branch.
    pub fn branch(mut self, name: impl Into<String>, stages: impl IntoIterator<Item = Stage>) -> Self {
        self.branches.push((name.into(), stages.into_iter().collect()));
        self
    }

    /// Branch names in declaration order.
    pub fn branch_names(&self) -> impl Iterator<Item = &str> {
        self.branches.iter().map(|(n, _)| n.as_str())
    }

    fn validate(&self) -> Result<(), Error> {
        if self.branches.is_empty() {
            return Err(Error::EmptyFacet);
        }
        let mut seen = HashSet::new();
        for (name, stages) in &self.branches {
            validate_field_name(name)?;
            if !seen.insert(name.as_str()) {
                return Err(Error::DuplicateFacetBranch(name.clone()));
            }
            for stage in stages {
                if matches!(stage, Stage::Facet(_)) {
                    return Err(Error::NestedFacet {
                        branch: name.clone(),
                    });
                }
                stage.validate()?;
            }
        }
        Ok(())
    }
}

/// One transform step of a pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    /// Embed a matching reference record.
    Lookup(Lookup),
    /// Derive new fields, evaluated left to right.
    AddFields(Vec<(String, Expr)>),
    /// Keep records matching a predicate.
    Match(Predicate),
    /// Group and reduce.
    Group(Group),
    /// Stable single-field sort.
    Sort(Sort),
    /// Keep the first `n` records.
    Limit(usize),
    /// Terminal fan-out into named branches.
    Facet(Facet),
}

impl Stage {
    /// Derive a single field.
    pub fn add_field(name: impl Into<String>, expr: Expr) -> Self {
        Stage::AddFields(vec![(name.into(), expr)])
    }

    /// Ascending sort stage.
    pub fn sort_asc(field: impl Into<String>) -> Self {
        Stage::Sort(Sort::asc(field))
    }

    /// Descending sort stage.
    pub fn sort_desc(field: impl Into<String>) -> Self {
        Stage::Sort(Sort::desc(field))
    }

    /// Limit stage.
    pub fn limit(n: usize) -> Self {
        Stage::Limit(n)
    }

    /// Stage kind name, used in logs and error context.
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Lookup(_) => "lookup",
            Stage::AddFields(_) => "addFields",
            Stage::Match(_) => "match",
            Stage::Group(_) => "group",
            Stage::Sort(_) => "sort",
            Stage::Limit(_) => "limit",
            Stage::Facet(_) => "facet",
        }
    }

    fn validate(&self) -> Result<(), Error> {
        match self {
            Stage::Lookup(lookup) => {
                if lookup.from.is_empty() {
                    return Err(Error::EmptyCollectionName);
                }
                validate_path(&lookup.local_field)?;
                validate_path(&lookup.foreign_field)?;
                validate_field_name(&lookup.as_field)
            }
            Stage::AddFields(fields) => {
                for (name, expr) in fields {
                    validate_field_name(name)?;
                    validate_expr(expr)?;
                }
                Ok(())
            }
            Stage::Match(predicate) => {
                for expr in predicate.exprs() {
                    validate_expr(expr)?;
                }
                Ok(())
            }
            Stage::Group(group) => group.validate(),
            Stage::Sort(sort) => validate_path(&sort.field),
            Stage::Limit(_) => Ok(()),
            Stage::Facet(facet) => facet.validate(),
        }
    }
}

impl From<Lookup> for Stage {
    fn from(lookup: Lookup) -> Self {
        Stage::Lookup(lookup)
    }
}

impl From<Group> for Stage {
    fn from(group: Group) -> Self {
        Stage::Group(group)
    }
}

impl From<Sort> for Stage {
    fn from(sort: Sort) -> Self {
        Stage::Sort(sort)
    }
}

impl From<Predicate> for Stage {
    fn from(predicate: Predicate) -> Self {
        Stage::Match(predicate)
    }
}

impl From<Facet> for Stage {
    fn from(facet: Facet) -> Self {
        Stage::Facet(facet)
    }
}

fn validate_path(path: &FieldPath) -> Result<(), Error> {
    if path.is_valid() {
        Ok(())
    } else {
        Err(Error::InvalidFieldPath(path.to_string()))
    }
}

fn validate_expr(expr: &Expr) -> Result<(), Error> {
    expr.referenced_fields()
        .into_iter()
        .try_for_each(validate_path)
}

fn validate_field_name(name: &str) -> Result<(), Error> {
    if name.is_empty() || name.contains('.') {
        Err(Error::InvalidFieldName(name.to_string()))
    } else {
        Ok(())
    }
}

/// A validated, ordered list of stages.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    /// Start declaring a pipeline.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// Stages in execution order.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// The terminal facet, if any.
    pub fn facet(&self) -> Option<&Facet> {
        match self.stages.last() {
            Some(Stage::Facet(facet)) => Some(facet),
            _ => None,
        }
    }

    /// Number of stages.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Check if the pipeline has no stages.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

/// Builder for [`Pipeline`].
#[derive(Debug, Clone, Default)]
pub struct PipelineBuilder {
    stages: Vec<Stage>,
}

impl PipelineBuilder {
    /// Append any stage.
    pub fn stage(mut self, stage: impl Into<Stage>) -> Self {
        self.stages.push(stage.into());
        self
    }

    /// Append a lookup stage.
    pub fn lookup(self, lookup: Lookup) -> Self {
        self.stage(lookup)
    }

    /// Append a single-field derivation stage.
    pub fn add_field(self, name: impl Into<String>, expr: Expr) -> Self {
        self.stage(Stage::add_field(name, expr))
    }

    /// Append a match stage.
    pub fn filter(self, predicate: Predicate) -> Self {
        self.stage(predicate)
    }

    /// Append a group stage.
    pub fn group(self, group: Group) -> Self {
        self.stage(group)
    }

    /// Append a sort stage.
    pub fn sort(self, sort: Sort) -> Self {
        self.stage(sort)
    }

    /// Append a limit stage.
    pub fn limit(self, n: usize) -> Self {
        self.stage(Stage::Limit(n))
    }

    /// Append the terminal facet stage.
    pub fn facet(self, facet: Facet) -> Self {
        self.stage(facet)
    }

    /// Validate the declaration and produce a pipeline.
    pub fn build(self) -> Result<Pipeline, Error> {
        let last = self.stages.len().saturating_sub(1);
        for (position, stage) in self.stages.iter().enumerate() {
            if matches!(stage, Stage::Facet(_)) && position != last {
                return Err(Error::FacetNotTerminal { position });
            }
            stage.validate()?;
        }
        Ok(Pipeline {
            stages: self.stages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_simple_pipeline() {
        let pipeline = Pipeline::builder()
            .lookup(Lookup::new("users", "userId", "id", "user"))
            .add_field("orderValue", Expr::field("quantity").mul(Expr::field("product.price")))
            .group(Group::by_field("user.id").sum("total", Expr::field("orderValue")))
            .sort(Sort::desc("total"))
            .limit(5)
            .build()
            .unwrap();

        assert_eq!(pipeline.len(), 5);
        assert!(pipeline.facet().is_none());
        let names: Vec<_> = pipeline.stages().iter().map(Stage::name).collect();
        assert_eq!(names, vec!["lookup", "addFields", "group", "sort", "limit"]);
    }

    #[test]
    fn test_facet_must_be_last() {
        let err = Pipeline::builder()
            .facet(Facet::new().branch("all", vec![Stage::limit(1)]))
            .limit(3)
            .build()
            .unwrap_err();
        assert_eq!(err, Error::FacetNotTerminal { position: 0 });
    }

    #[test]
    fn test_nested_facet_rejected() {
        let inner = Facet::new().branch("x", vec![Stage::limit(1)]);
        let err = Pipeline::builder()
            .facet(Facet::new().branch("outer", vec![Stage::Facet(inner)]))
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            Error::NestedFacet {
                branch: "outer".into()
            }
        );
    }

    #[test]
    fn test_empty_and_duplicate_facet_branches() {
        let err = Pipeline::builder().facet(Facet::new()).build().unwrap_err();
        assert_eq!(err, Error::EmptyFacet);

        let err = Pipeline::builder()
            .facet(
                Facet::new()
                    .branch("a", vec![Stage::limit(1)])
                    .branch("a", vec![Stage::limit(2)]),
            )
            .build()
            .unwrap_err();
        assert_eq!(err, Error::DuplicateFacetBranch("a".into()));
    }

    #[test]
    fn test_group_accumulator_names_validated() {
        let err = Pipeline::builder()
            .group(Group::by_field("k").count("n").count("n"))
            .build()
            .unwrap_err();
        assert_eq!(err, Error::DuplicateAccumulator("n".into()));

        let err = Pipeline::builder()
            .group(Group::by_field("k").count("_id"))
            .build()
            .unwrap_err();
        assert_eq!(err, Error::ReservedAccumulatorName);
    }

    #[test]
    fn test_invalid_paths_rejected() {
        let err = Pipeline::builder()
            .sort(Sort::asc("user..name"))
            .build()
            .unwrap_err();
        assert_eq!(err, Error::InvalidFieldPath("user..name".into()));

        let err = Pipeline::builder()
            .add_field("a.b", Expr::literal(1))
            .build()
            .unwrap_err();
        assert_eq!(err, Error::InvalidFieldName("a.b".into()));

        let err = Pipeline::builder()
            .lookup(Lookup::new("", "userId", "id", "user"))
            .build()
            .unwrap_err();
        assert_eq!(err, Error::EmptyCollectionName);
    }

    #[test]
    fn test_facet_branch_stages_validated() {
        let err = Pipeline::builder()
            .facet(Facet::new().branch("bad", vec![Stage::sort_desc("")]))
            .build()
            .unwrap_err();
        assert_eq!(err, Error::InvalidFieldPath(String::new()));
    }

    #[test]
    fn test_predicate_exprs() {
        let pred = Predicate::And(vec![
            Predicate::gt("quantity", 1),
            Predicate::Or(vec![Predicate::eq("a", "x"), Predicate::ne("b", 2)]),
        ]);
        assert_eq!(pred.exprs().len(), 6);
    }

    #[test]
    fn test_lookup_left_outer() {
        let lookup = Lookup::new("users", "userId", "id", "user").left_outer();
        assert_eq!(lookup.mode, JoinMode::LeftOuter);
        assert_eq!(Lookup::new("u", "a", "b", "c").mode, JoinMode::Inner);
    }
}
