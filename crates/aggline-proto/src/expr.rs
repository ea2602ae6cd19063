//! Expression IR evaluated against documents.

use std::fmt;

use crate::value::Value;

/// A dotted path into a document, e.g. `product.price`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    raw: String,
    segments: Vec<String>,
}

impl FieldPath {
    /// Split a dotted path into segments.
    ///
    /// Empty segments are kept so that [`FieldPath::is_valid`] can reject them
    /// when the pipeline is built.
    pub fn new(path: impl Into<String>) -> Self {
        let raw = path.into();
        let segments = raw.split('.').map(str::to_string).collect();
        Self { raw, segments }
    }

    /// Path segments, outermost first.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The path as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// A path is valid when it has no empty segments.
    pub fn is_valid(&self) -> bool {
        self.segments.iter().all(|s| !s.is_empty())
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<&str> for FieldPath {
    fn from(path: &str) -> Self {
        FieldPath::new(path)
    }
}

/// Arithmetic operator of a binary expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl BinaryOp {
    /// Operator symbol used in diagnostics.
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
        }
    }
}

/// An expression over a single document.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Reference to a (possibly nested) field.
    Field(FieldPath),
    /// Constant value.
    Literal(Value),
    /// Arithmetic over two sub-expressions.
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

impl Expr {
    /// Create a field reference.
    pub fn field(path: impl Into<String>) -> Self {
        Expr::Field(FieldPath::new(path))
    }

    /// Create a literal.
    pub fn literal(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    /// Create a binary expression.
    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// `self * rhs`
    pub fn mul(self, rhs: Expr) -> Self {
        Expr::binary(BinaryOp::Multiply, self, rhs)
    }

    /// `self + rhs`
    pub fn add(self, rhs: Expr) -> Self {
        Expr::binary(BinaryOp::Add, self, rhs)
    }

    /// `self - rhs`
    pub fn sub(self, rhs: Expr) -> Self {
        Expr::binary(BinaryOp::Subtract, self, rhs)
    }

    /// `self / rhs`
    pub fn div(self, rhs: Expr) -> Self {
        Expr::binary(BinaryOp::Divide, self, rhs)
    }

    /// Collect every field path referenced by this expression.
    pub fn referenced_fields(&self) -> Vec<&FieldPath> {
        let mut fields = Vec::new();
        self.collect_fields(&mut fields);
        fields
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a FieldPath>) {
        match self {
            Expr::Field(path) => out.push(path),
            Expr::Literal(_) => {}
            Expr::Binary { left, right, .. } => {
                left.collect_fields(out);
                right.collect_fields(out);
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Field(path) => write!(f, "${}", path),
            Expr::Literal(Value::String(s)) => write!(f, "\"{}\"", s),
            Expr::Literal(value) => write!(f, "{}", value),
            Expr::Binary { op, left, right } => write!(f, "({} {} {})", left, op.symbol(), right),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_path_segments() {
        let path = FieldPath::new("product.price");
        assert_eq!(path.segments(), &["product".to_string(), "price".to_string()]);
        assert_eq!(path.as_str(), "product.price");
        assert!(path.is_valid());
    }

    #[test]
    fn test_field_path_rejects_empty_segments() {
        assert!(!FieldPath::new("").is_valid());
        assert!(!FieldPath::new("user..name").is_valid());
        assert!(!FieldPath::new(".name").is_valid());
    }

    #[test]
    fn test_expr_builders_and_display() {
        let expr = Expr::field("quantity").mul(Expr::field("product.price"));
        assert_eq!(expr.to_string(), "($quantity * $product.price)");

        let expr = Expr::literal(1).add(Expr::literal("x"));
        assert_eq!(expr.to_string(), "(1 + \"x\")");
    }

    #[test]
    fn test_referenced_fields() {
        let expr = Expr::field("a")
            .mul(Expr::literal(2))
            .sub(Expr::field("b.c"));
        let fields: Vec<_> = expr.referenced_fields().iter().map(|p| p.as_str()).collect();
        assert_eq!(fields, vec!["a", "b.c"]);
    }
}
