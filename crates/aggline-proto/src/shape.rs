//! Record shapes for construction-time field checking.
//!
//! A [`Shape`] describes which field paths a record exposes. Walking a
//! pipeline's stages over an input shape catches references to fields that
//! can never exist before any data is touched.

use std::collections::{BTreeMap, HashMap};

use crate::error::Error;
use crate::expr::{Expr, FieldPath};
use crate::pipeline::{Accumulator, Pipeline, Predicate, Stage};
use crate::value::Value;

/// Shape of a single field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldShape {
    /// A leaf value.
    Scalar,
    /// An embedded document with a known shape.
    Document(Shape),
    /// Shape not statically known; any sub-path is accepted.
    Any,
}

/// Known fields of a record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Shape {
    fields: BTreeMap<String, FieldShape>,
}

impl Shape {
    /// Create an empty shape.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a scalar field.
    pub fn scalar(mut self, name: impl Into<String>) -> Self {
        self.fields.insert(name.into(), FieldShape::Scalar);
        self
    }

    /// Add an embedded document field.
    pub fn document(mut self, name: impl Into<String>, shape: Shape) -> Self {
        self.fields.insert(name.into(), FieldShape::Document(shape));
        self
    }

    /// Add or replace a field.
    pub fn insert(&mut self, name: impl Into<String>, field: FieldShape) {
        self.fields.insert(name.into(), field);
    }

    /// Look up a top-level field.
    pub fn field(&self, name: &str) -> Option<&FieldShape> {
        self.fields.get(name)
    }

    /// Resolve a path to its field shape.
    pub fn resolve(&self, path: &FieldPath) -> Option<FieldShape> {
        let mut current = self;
        let segments = path.segments();
        for (i, segment) in segments.iter().enumerate() {
            let last = i + 1 == segments.len();
            match current.fields.get(segment)? {
                FieldShape::Any => return Some(FieldShape::Any),
                FieldShape::Scalar if last => return Some(FieldShape::Scalar),
                FieldShape::Scalar => return None,
                FieldShape::Document(inner) if last => {
                    return Some(FieldShape::Document(inner.clone()))
                }
                FieldShape::Document(inner) => current = inner,
            }
        }
        None
    }

    fn expr_shape(&self, expr: &Expr, stage: &str) -> Result<FieldShape, Error> {
        match expr {
            Expr::Field(path) => self.resolve(path).ok_or_else(|| Error::UnknownField {
                stage: stage.to_string(),
                path: path.to_string(),
            }),
            Expr::Literal(Value::Document(_)) => Ok(FieldShape::Any),
            Expr::Literal(_) => Ok(FieldShape::Scalar),
            Expr::Binary { left, right, .. } => {
                self.expr_shape(left, stage)?;
                self.expr_shape(right, stage)?;
                Ok(FieldShape::Scalar)
            }
        }
    }

    fn check_predicate(&self, predicate: &Predicate, stage: &str) -> Result<(), Error> {
        for expr in predicate.exprs() {
            self.expr_shape(expr, stage)?;
        }
        Ok(())
    }
}

impl Pipeline {
    /// Check every field reference against the input and collection shapes.
    ///
    /// `input` is the shape of the records passed to the executor and
    /// `collections` maps lookup source names to the shape of their records.
    pub fn validate_fields(
        &self,
        input: &Shape,
        collections: &HashMap<String, Shape>,
    ) -> Result<(), Error> {
        check_stages(self.stages(), input.clone(), collections, "")
    }
}

fn check_stages(
    stages: &[Stage],
    mut shape: Shape,
    collections: &HashMap<String, Shape>,
    prefix: &str,
) -> Result<(), Error> {
    for (index, stage) in stages.iter().enumerate() {
        let label = format!("{}[{}]:{}", prefix, index, stage.name());
        shape = apply_stage(stage, shape, collections, &label)?;
    }
    Ok(())
}

fn apply_stage(
    stage: &Stage,
    mut shape: Shape,
    collections: &HashMap<String, Shape>,
    label: &str,
) -> Result<Shape, Error> {
    match stage {
        Stage::Lookup(lookup) => {
            shape.expr_shape(&Expr::Field(lookup.local_field.clone()), label)?;
            let target = collections
                .get(&lookup.from)
                .ok_or_else(|| Error::UnknownCollection(lookup.from.clone()))?;
            target.expr_shape(&Expr::Field(lookup.foreign_field.clone()), label)?;
            shape.insert(lookup.as_field.clone(), FieldShape::Document(target.clone()));
            Ok(shape)
        }
        Stage::AddFields(fields) => {
            for (name, expr) in fields {
                let field = shape.expr_shape(expr, label)?;
                shape.insert(name.clone(), field);
            }
            Ok(shape)
        }
        Stage::Match(predicate) => {
            shape.check_predicate(predicate, label)?;
            Ok(shape)
        }
        Stage::Group(group) => {
            let mut output = Shape::new();
            output.insert("_id", shape.expr_shape(&group.key, label)?);
            for (name, acc) in &group.accumulators {
                let field = match acc {
                    Accumulator::First(expr) => shape.expr_shape(expr, label)?,
                    Accumulator::Count => FieldShape::Scalar,
                    other => {
                        if let Some(expr) = other.expr() {
                            shape.expr_shape(expr, label)?;
                        }
                        FieldShape::Scalar
                    }
                };
                output.insert(name.clone(), field);
            }
            Ok(output)
        }
        Stage::Sort(sort) => {
            shape.expr_shape(&Expr::Field(sort.field.clone()), label)?;
            Ok(shape)
        }
        Stage::Limit(_) => Ok(shape),
        Stage::Facet(facet) => {
            for (name, stages) in &facet.branches {
                check_stages(stages, shape.clone(), collections, &format!("facet.{}", name))?;
            }
            Ok(shape)
        }
    }
}
