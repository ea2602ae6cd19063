//! Lookup stage: enrich records with a matching reference record.
//!
//! Algorithm (hash join):
//! 1. Build phase: scan the reference collection once, index it by foreign key
//! 2. Probe phase: for each input record, look up its local key in O(1)
//!
//! Complexity: O(N + M) where N = input records, M = reference records.
//!
//! When the reference collection holds several records with the same foreign
//! key, the first one encountered wins. Records whose key is missing or
//! unjoinable are excluded; that is normal business data (an order pointing
//! at a deleted user), not a failure.

use std::collections::HashMap;
use std::sync::Arc;

use aggline_proto::{Document, FieldPath, JoinMode, Lookup, Value};

use super::key::KeyValue;
use crate::error::JoinKeyError;

/// Outcome of a lookup over one input sequence.
#[derive(Debug, Clone, Default)]
pub struct JoinOutput {
    /// Enriched records in input order.
    pub records: Vec<Document>,
    /// Input records without a matching reference record.
    pub unmatched: usize,
    /// Records (either side) excluded because of a [`JoinKeyError`].
    pub key_errors: usize,
}

/// Exact-match index over a reference collection.
pub struct JoinIndex<'a> {
    entries: HashMap<KeyValue, &'a Arc<Document>>,
    skipped: usize,
}

impl<'a> JoinIndex<'a> {
    /// Index `right` by the value at `foreign_field`, keeping the first
    /// record per key.
    pub fn build(right: &'a [Arc<Document>], foreign_field: &FieldPath) -> Self {
        let mut entries = HashMap::with_capacity(right.len());
        let mut skipped = 0;

        for record in right {
            match join_key(record, foreign_field, false) {
                Ok(key) => {
                    entries.entry(key).or_insert(record);
                }
                Err(error) => {
                    skipped += 1;
                    tracing::trace!(error = %error, "reference record not indexed");
                }
            }
        }

        Self { entries, skipped }
    }

    /// Find the reference record for a key.
    pub fn probe(&self, key: &KeyValue) -> Option<&'a Arc<Document>> {
        self.entries.get(key).copied()
    }

    /// Number of distinct indexed keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing was indexed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reference records excluded for key errors.
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

fn join_key(record: &Document, path: &FieldPath, local: bool) -> Result<KeyValue, JoinKeyError> {
    match record.get_path(path) {
        None if local => Err(JoinKeyError::MissingLocalKey {
            path: path.to_string(),
        }),
        None => Err(JoinKeyError::MissingForeignKey {
            path: path.to_string(),
        }),
        Some(value @ (Value::Null | Value::Document(_))) => Err(JoinKeyError::UnjoinableKey {
            found: value.type_name(),
        }),
        Some(value) => Ok(KeyValue(value.clone())),
    }
}

/// Hash join executor for lookup stages.
pub struct HashJoinExecutor;

impl HashJoinExecutor {
    /// Join `left` against `right` as described by `lookup`.
    ///
    /// Input records are never modified; each output record is a copy with
    /// `lookup.as_field` set to the matched reference record (or null for
    /// unmatched records in [`JoinMode::LeftOuter`]).
    pub fn execute(left: &[Document], right: &[Arc<Document>], lookup: &Lookup) -> JoinOutput {
        // Build phase
        let index = JoinIndex::build(right, &lookup.foreign_field);

        // Probe phase
        let mut output = JoinOutput {
            records: Vec::with_capacity(left.len()),
            unmatched: 0,
            key_errors: index.skipped(),
        };

        for record in left {
            let matched = match join_key(record, &lookup.local_field, true) {
                Ok(key) => index.probe(&key),
                Err(error) => {
                    output.key_errors += 1;
                    tracing::trace!(error = %error, "input record has no usable join key");
                    None
                }
            };

            let embedded = match (matched, lookup.mode) {
                (Some(found), _) => Value::Document(Arc::clone(found)),
                (None, JoinMode::LeftOuter) => Value::Null,
                (None, JoinMode::Inner) => {
                    output.unmatched += 1;
                    continue;
                }
            };

            let mut enriched = record.clone();
            enriched.insert(lookup.as_field.clone(), embedded);
            output.records.push(enriched);
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> Vec<Arc<Document>> {
        vec![
            Arc::new(Document::new().with("id", "U1").with("name", "Ann")),
            Arc::new(Document::new().with("id", "U2").with("name", "Bob")),
        ]
    }

    fn order(id: i64, user_id: impl Into<Value>) -> Document {
        Document::new()
            .with("id", id)
            .with("userId", user_id)
            .with("quantity", 1)
    }

    fn user_lookup() -> Lookup {
        Lookup::new("users", "userId", "id", "user")
    }

    #[test]
    fn test_hash_join_basic() {
        let left = vec![order(1, "U1"), order(2, "U2"), order(3, "U1")];
        let output = HashJoinExecutor::execute(&left, &users(), &user_lookup());

        assert_eq!(output.records.len(), 3);
        assert_eq!(output.unmatched, 0);
        let names: Vec<_> = output
            .records
            .iter()
            .map(|r| r.get_path(&"user.name".into()).cloned())
            .collect();
        assert_eq!(
            names,
            vec![
                Some(Value::from("Ann")),
                Some(Value::from("Bob")),
                Some(Value::from("Ann"))
            ]
        );
    }

    #[test]
    fn test_inner_join_drops_unmatched() {
        let left = vec![order(1, "U1"), order(2, "U9")];
        let output = HashJoinExecutor::execute(&left, &users(), &user_lookup());

        assert_eq!(output.records.len(), 1);
        assert_eq!(output.unmatched, 1);
        assert_eq!(output.records[0].get("id"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_left_outer_keeps_unmatched_with_null() {
        let left = vec![order(1, "U9")];
        let output = HashJoinExecutor::execute(&left, &users(), &user_lookup().left_outer());

        assert_eq!(output.records.len(), 1);
        assert_eq!(output.records[0].get("user"), Some(&Value::Null));
        assert_eq!(output.unmatched, 0);
    }

    #[test]
    fn test_missing_local_key_excluded() {
        let left = vec![Document::new().with("id", 1), order(2, Value::Null)];
        let output = HashJoinExecutor::execute(&left, &users(), &user_lookup());

        assert!(output.records.is_empty());
        assert_eq!(output.key_errors, 2);
    }

    #[test]
    fn test_duplicate_foreign_keys_first_wins() {
        let right = vec![
            Arc::new(Document::new().with("id", "U1").with("name", "First")),
            Arc::new(Document::new().with("id", "U1").with("name", "Second")),
        ];
        let output = HashJoinExecutor::execute(&[order(1, "U1")], &right, &user_lookup());

        assert_eq!(
            output.records[0].get_path(&"user.name".into()),
            Some(&Value::from("First"))
        );
    }

    #[test]
    fn test_reference_records_without_key_not_indexed() {
        let right = vec![
            Arc::new(Document::new().with("name", "No id")),
            Arc::new(Document::new().with("id", "U1").with("name", "Ann")),
        ];
        let index = JoinIndex::build(&right, &FieldPath::new("id"));
        assert_eq!(index.len(), 1);
        assert_eq!(index.skipped(), 1);
    }

    #[test]
    fn test_numeric_keys_match_across_int_and_float() {
        let right = vec![Arc::new(Document::new().with("id", 7).with("name", "Int"))];
        let left = vec![order(1, 7.0)];
        let output = HashJoinExecutor::execute(&left, &right, &user_lookup());
        assert_eq!(output.records.len(), 1);
    }

    #[test]
    fn test_input_not_mutated() {
        let left = vec![order(1, "U1")];
        let _ = HashJoinExecutor::execute(&left, &users(), &user_lookup());
        assert!(!left[0].contains("user"));
    }

    #[test]
    fn test_empty_inputs() {
        let output = HashJoinExecutor::execute(&[], &users(), &user_lookup());
        assert!(output.records.is_empty());

        let output = HashJoinExecutor::execute(&[order(1, "U1")], &[], &user_lookup());
        assert!(output.records.is_empty());
        assert_eq!(output.unmatched, 1);
    }
}
