//! Typed business records and their document form.

use std::fmt;

use aggline_proto::{Document, Shape, Value};
use serde::{Deserialize, Serialize};

/// Record identifier: integer or string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    String(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Int(i) => write!(f, "{}", i),
            RecordId::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        RecordId::Int(id)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        RecordId::String(id.to_string())
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        RecordId::String(id)
    }
}

impl From<&RecordId> for Value {
    fn from(id: &RecordId) -> Self {
        match id {
            RecordId::Int(i) => Value::Int(*i),
            RecordId::String(s) => Value::String(s.clone()),
        }
    }
}

/// A purchase of some quantity of one product by one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: RecordId,
    pub user_id: RecordId,
    pub product_id: RecordId,
    pub quantity: u32,
}

impl Order {
    pub fn new(
        id: impl Into<RecordId>,
        user_id: impl Into<RecordId>,
        product_id: impl Into<RecordId>,
        quantity: u32,
    ) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            product_id: product_id.into(),
            quantity,
        }
    }

    /// Engine document `{id, userId, productId, quantity}`.
    pub fn to_document(&self) -> Document {
        Document::new()
            .with("id", &self.id)
            .with("userId", &self.user_id)
            .with("productId", &self.product_id)
            .with("quantity", self.quantity)
    }

    /// Fields exposed by [`Order::to_document`].
    pub fn shape() -> Shape {
        Shape::new()
            .scalar("id")
            .scalar("userId")
            .scalar("productId")
            .scalar("quantity")
    }
}

/// A customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: RecordId,
    pub name: String,
}

impl User {
    pub fn new(id: impl Into<RecordId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Engine document `{id, name}`.
    pub fn to_document(&self) -> Document {
        Document::new()
            .with("id", &self.id)
            .with("name", self.name.as_str())
    }

    /// Fields exposed by [`User::to_document`].
    pub fn shape() -> Shape {
        Shape::new().scalar("id").scalar("name")
    }
}

/// A catalog item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: RecordId,
    pub category: String,
    pub price: f64,
}

impl Product {
    pub fn new(id: impl Into<RecordId>, category: impl Into<String>, price: f64) -> Self {
        Self {
            id: id.into(),
            category: category.into(),
            price,
        }
    }

    /// Engine document `{id, category, price}`.
    pub fn to_document(&self) -> Document {
        Document::new()
            .with("id", &self.id)
            .with("category", self.category.as_str())
            .with("price", self.price)
    }

    /// Fields exposed by [`Product::to_document`].
    pub fn shape() -> Shape {
        Shape::new().scalar("id").scalar("category").scalar("price")
    }
}
