//! Hashable wrapper for values used as join and group keys.

use std::hash::{Hash, Hasher};

use aggline_proto::{Document, Value};

/// A value with key semantics.
///
/// Integers and integral floats are the same key (`1 == 1.0`), `-0.0`
/// equals `0.0`, and embedded documents compare field by field in order.
#[derive(Debug, Clone)]
pub struct KeyValue(pub Value);

/// Integral floats inside the i64 range collapse onto the integer key.
fn integral(f: f64) -> Option<i64> {
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

fn keys_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Int(i), Value::Float(f)) | (Value::Float(f), Value::Int(i)) => {
            integral(*f) == Some(*i)
        }
        (Value::Float(a), Value::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Document(a), Value::Document(b)) => documents_equal(a, b),
        _ => false,
    }
}

fn documents_equal(a: &Document, b: &Document) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .zip(b.iter())
            .all(|((na, va), (nb, vb))| na == nb && keys_equal(va, vb))
}

fn hash_value<H: Hasher>(value: &Value, state: &mut H) {
    match value {
        Value::Null => state.write_u8(0),
        Value::Bool(b) => {
            state.write_u8(1);
            b.hash(state);
        }
        Value::Int(i) => {
            state.write_u8(2);
            i.hash(state);
        }
        Value::Float(f) => match integral(*f) {
            Some(i) => {
                state.write_u8(2);
                i.hash(state);
            }
            None => {
                state.write_u8(3);
                let bits = if f.is_nan() { f64::NAN.to_bits() } else { f.to_bits() };
                bits.hash(state);
            }
        },
        Value::String(s) => {
            state.write_u8(4);
            s.hash(state);
        }
        Value::Document(doc) => {
            state.write_u8(5);
            doc.len().hash(state);
            for (name, field) in doc.iter() {
                name.hash(state);
                hash_value(field, state);
            }
        }
    }
}

impl PartialEq for KeyValue {
    fn eq(&self, other: &Self) -> bool {
        keys_equal(&self.0, &other.0)
    }
}

impl Eq for KeyValue {}

impl Hash for KeyValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_value(&self.0, state);
    }
}

/// Equality with key semantics, shared with the match stage.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    keys_equal(a, b)
}
