//! Data providers: where orders, users and products come from.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Order, Product, User};

/// Provider errors.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The dataset file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The dataset file is not a valid dataset document.
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A record violates a data model constraint.
    #[error("invalid record: {0}")]
    InvalidRecord(String),
}

/// The three record sets an analytics run works on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub orders: Vec<Order>,
    pub users: Vec<User>,
    pub products: Vec<Product>,
}

impl Dataset {
    pub fn new(orders: Vec<Order>, users: Vec<User>, products: Vec<Product>) -> Self {
        Self {
            orders,
            users,
            products,
        }
    }

    /// Check data model constraints the types cannot express.
    pub fn validate(&self) -> Result<(), ProviderError> {
        for product in &self.products {
            if !product.price.is_finite() || product.price < 0.0 {
                return Err(ProviderError::InvalidRecord(format!(
                    "product {} has price {}",
                    product.id, product.price
                )));
            }
        }
        Ok(())
    }
}

/// Supplies a fully materialized [`Dataset`].
pub trait DataProvider: Send + Sync {
    /// Load the dataset.
    fn load(&self) -> Result<Dataset, ProviderError>;
}

/// Provider over a dataset already held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProvider {
    dataset: Dataset,
}

impl InMemoryProvider {
    pub fn new(dataset: Dataset) -> Self {
        Self { dataset }
    }
}

impl DataProvider for InMemoryProvider {
    fn load(&self) -> Result<Dataset, ProviderError> {
        self.dataset.validate()?;
        Ok(self.dataset.clone())
    }
}

/// Provider reading `{"orders": [...], "users": [...], "products": [...]}`
/// from a JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileProvider {
    path: PathBuf,
}

impl JsonFileProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the dataset file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DataProvider for JsonFileProvider {
    fn load(&self) -> Result<Dataset, ProviderError> {
        let contents = fs::read_to_string(&self.path).map_err(|source| ProviderError::Io {
            path: self.path.clone(),
            source,
        })?;
        let dataset: Dataset =
            serde_json::from_str(&contents).map_err(|source| ProviderError::Parse {
                path: self.path.clone(),
                source,
            })?;
        dataset.validate()?;

        tracing::debug!(
            path = %self.path.display(),
            orders = dataset.orders.len(),
            users = dataset.users.len(),
            products = dataset.products.len(),
            "loaded dataset"
        );
        Ok(dataset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const DATASET: &str = r#"{
        "orders": [{"id": 1, "userId": "U1", "productId": "P1", "quantity": 2}],
        "users": [{"id": "U1", "name": "Ann"}],
        "products": [{"id": "P1", "category": "Books", "price": 10}]
    }"#;

    #[test]
    fn test_json_file_provider() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(DATASET.as_bytes()).unwrap();

        let dataset = JsonFileProvider::new(file.path()).load().unwrap();
        assert_eq!(dataset.orders, vec![Order::new(1, "U1", "P1", 2)]);
        assert_eq!(dataset.users, vec![User::new("U1", "Ann")]);
        assert_eq!(dataset.products, vec![Product::new("P1", "Books", 10.0)]);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = JsonFileProvider::new(dir.path().join("absent.json"))
            .load()
            .unwrap_err();
        assert!(matches!(err, ProviderError::Io { .. }));
    }

    #[test]
    fn test_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"orders": []}"#).unwrap();
        let err = JsonFileProvider::new(file.path()).load().unwrap_err();
        assert!(matches!(err, ProviderError::Parse { .. }));
    }

    #[test]
    fn test_negative_price_rejected() {
        let dataset = Dataset::new(vec![], vec![], vec![Product::new("P1", "Books", -1.0)]);
        let err = InMemoryProvider::new(dataset).load().unwrap_err();
        assert_eq!(err.to_string(), "invalid record: product P1 has price -1");
    }

    #[test]
    fn test_in_memory_provider_returns_copy() {
        let dataset = Dataset::new(
            vec![Order::new(1, "U1", "P1", 2)],
            vec![User::new("U1", "Ann")],
            vec![],
        );
        let provider = InMemoryProvider::new(dataset.clone());
        assert_eq!(provider.load().unwrap(), dataset);
    }
}
