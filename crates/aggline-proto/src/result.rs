//! Result types returned by a pipeline run.

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::value::Document;

/// Named facet outputs in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FacetResult {
    facets: Vec<(String, Vec<Document>)>,
}

impl FacetResult {
    /// Create an empty result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a branch output.
    pub fn push(&mut self, name: impl Into<String>, records: Vec<Document>) {
        self.facets.push((name.into(), records));
    }

    /// Output of a branch by name.
    pub fn get(&self, name: &str) -> Option<&[Document]> {
        self.facets
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, records)| records.as_slice())
    }

    /// Branch names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.facets.iter().map(|(n, _)| n.as_str())
    }

    /// Iterate `(name, records)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Document])> {
        self.facets.iter().map(|(n, r)| (n.as_str(), r.as_slice()))
    }

    /// Number of branches.
    pub fn len(&self) -> usize {
        self.facets.len()
    }

    /// Check if there are no branches.
    pub fn is_empty(&self) -> bool {
        self.facets.is_empty()
    }

    /// Consume into the underlying pairs.
    pub fn into_inner(self) -> Vec<(String, Vec<Document>)> {
        self.facets
    }
}

impl Serialize for FacetResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.facets.len()))?;
        for (name, records) in &self.facets {
            map.serialize_entry(name, records)?;
        }
        map.end()
    }
}

/// Output of a pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutput {
    /// Records from a pipeline without a facet stage.
    Records(Vec<Document>),
    /// Branch outputs from a terminal facet stage.
    Facets(FacetResult),
}

impl PipelineOutput {
    /// Take the records, if this is a non-facet output.
    pub fn into_records(self) -> Option<Vec<Document>> {
        match self {
            PipelineOutput::Records(records) => Some(records),
            PipelineOutput::Facets(_) => None,
        }
    }

    /// Take the facet result, if this is a facet output.
    pub fn into_facets(self) -> Option<FacetResult> {
        match self {
            PipelineOutput::Facets(facets) => Some(facets),
            PipelineOutput::Records(_) => None,
        }
    }
}

impl Serialize for PipelineOutput {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PipelineOutput::Records(records) => records.serialize(serializer),
            PipelineOutput::Facets(facets) => facets.serialize(serializer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_facet_result_lookup_and_order() {
        let mut result = FacetResult::new();
        result.push("b", vec![Document::new().with("_id", 1)]);
        result.push("a", vec![]);

        assert_eq!(result.len(), 2);
        assert_eq!(result.names().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(result.get("b").map(<[Document]>::len), Some(1));
        assert!(result.get("missing").is_none());
    }

    #[test]
    fn test_facet_result_serializes_as_map() {
        let mut result = FacetResult::new();
        result.push("salesByCategory", vec![Document::new().with("_id", "Books").with("totalSales", 20)]);

        let json = serde_json::to_string(&result).unwrap();
        assert_eq!(json, r#"{"salesByCategory":[{"_id":"Books","totalSales":20}]}"#);
    }

    #[test]
    fn test_pipeline_output_accessors() {
        let output = PipelineOutput::Records(vec![Document::new()]);
        assert_eq!(output.clone().into_records().map(|r| r.len()), Some(1));
        assert!(output.into_facets().is_none());
    }
}
