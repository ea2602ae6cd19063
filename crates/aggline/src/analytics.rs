//! The order analytics pipeline and the service that runs it.
//!
//! Orders are enriched with their user and product, priced as
//! `quantity * product.price`, then fanned out into three reports:
//!
//! - `spendingByUser`: top spenders by total order value
//! - `salesByCategory`: total order value per product category
//! - `ordersPerUser`: number of orders per user

use std::collections::HashMap;

use aggline_core::proto::{
    Document, Expr, Facet, FacetResult, Group, Lookup, Pipeline, Stage,
};
use aggline_core::{CancellationToken, EngineConfig, PipelineExecutor, RunStats};
use serde::ser::{Serialize, Serializer};

use crate::error::{Error, Result};
use crate::model::{Order, Product, User};
use crate::provider::{DataProvider, Dataset};

/// Collection name of users.
pub const USERS: &str = "users";
/// Collection name of products.
pub const PRODUCTS: &str = "products";

/// Facet of top spenders.
pub const SPENDING_BY_USER: &str = "spendingByUser";
/// Facet of sales per category.
pub const SALES_BY_CATEGORY: &str = "salesByCategory";
/// Facet of order counts per user.
pub const ORDERS_PER_USER: &str = "ordersPerUser";

/// Analytics configuration.
#[derive(Debug, Clone)]
pub struct AnalyticsConfig {
    /// Number of users kept in `spendingByUser`.
    pub top_spenders: usize,

    /// Engine settings.
    pub engine: EngineConfig,
}

impl AnalyticsConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self {
            top_spenders: 5,
            engine: EngineConfig::default(),
        }
    }

    /// Set the number of top spenders reported.
    pub fn with_top_spenders(mut self, n: usize) -> Self {
        self.top_spenders = n;
        self
    }

    /// Set the engine configuration.
    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the order analytics pipeline.
pub fn order_analytics_pipeline(config: &AnalyticsConfig) -> Result<Pipeline> {
    let spending_by_user = vec![
        Stage::Group(
            Group::by_field("user.id")
                .first("name", Expr::field("user.name"))
                .sum("totalSpent", Expr::field("orderValue")),
        ),
        Stage::sort_desc("totalSpent"),
        Stage::limit(config.top_spenders),
    ];

    let sales_by_category = vec![
        Stage::Group(
            Group::by_field("product.category").sum("totalSales", Expr::field("orderValue")),
        ),
        Stage::sort_desc("totalSales"),
    ];

    let orders_per_user = vec![Stage::Group(
        Group::by_field("user.id")
            .first("name", Expr::field("user.name"))
            .sum("ordersCount", Expr::literal(1)),
    )];

    let pipeline = Pipeline::builder()
        .lookup(Lookup::new(USERS, "userId", "id", "user"))
        .lookup(Lookup::new(PRODUCTS, "productId", "id", "product"))
        .add_field(
            "orderValue",
            Expr::field("quantity").mul(Expr::field("product.price")),
        )
        .facet(
            Facet::new()
                .branch(SPENDING_BY_USER, spending_by_user)
                .branch(SALES_BY_CATEGORY, sales_by_category)
                .branch(ORDERS_PER_USER, orders_per_user),
        )
        .build()?;

    let mut collections = HashMap::new();
    collections.insert(USERS.to_string(), User::shape());
    collections.insert(PRODUCTS.to_string(), Product::shape());
    pipeline.validate_fields(&Order::shape(), &collections)?;

    Ok(pipeline)
}

/// Result of one analytics run.
#[derive(Debug, Clone)]
pub struct AnalyticsReport {
    facets: FacetResult,
    stats: RunStats,
}

impl AnalyticsReport {
    /// Top spenders, highest first.
    pub fn spending_by_user(&self) -> &[Document] {
        self.facets.get(SPENDING_BY_USER).unwrap_or_default()
    }

    /// Sales per category, highest first.
    pub fn sales_by_category(&self) -> &[Document] {
        self.facets.get(SALES_BY_CATEGORY).unwrap_or_default()
    }

    /// Order counts per user.
    pub fn orders_per_user(&self) -> &[Document] {
        self.facets.get(ORDERS_PER_USER).unwrap_or_default()
    }

    /// All facets in declaration order.
    pub fn facets(&self) -> &FacetResult {
        &self.facets
    }

    /// Run counters.
    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// Take the facets.
    pub fn into_facets(self) -> FacetResult {
        self.facets
    }
}

impl Serialize for AnalyticsReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.facets.serialize(serializer)
    }
}

/// Loads data from a provider and runs the analytics pipeline over it.
pub struct AnalyticsService<P> {
    provider: P,
    config: AnalyticsConfig,
    pipeline: Pipeline,
    cancel: CancellationToken,
}

impl<P: DataProvider> AnalyticsService<P> {
    /// Create a service; the pipeline is built and field-checked here.
    pub fn new(provider: P, config: AnalyticsConfig) -> Result<Self> {
        let pipeline = order_analytics_pipeline(&config)?;
        Ok(Self {
            provider,
            config,
            pipeline,
            cancel: CancellationToken::new(),
        })
    }

    /// Use an externally owned cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that cancels runs of this service.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// The pipeline this service runs.
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Load the dataset and run the analytics.
    pub fn run(&self) -> Result<AnalyticsReport> {
        let dataset = self.provider.load()?;
        self.analyze(&dataset)
    }

    /// Run the analytics over an already loaded dataset.
    pub fn analyze(&self, dataset: &Dataset) -> Result<AnalyticsReport> {
        let executor = PipelineExecutor::new(self.config.engine.clone())
            .with_cancellation(self.cancel.clone())
            .with_collection(USERS, dataset.users.iter().map(User::to_document).collect())
            .with_collection(
                PRODUCTS,
                dataset.products.iter().map(Product::to_document).collect(),
            );

        let orders: Vec<Document> = dataset.orders.iter().map(Order::to_document).collect();
        let (output, stats) = executor.run_with_stats(&self.pipeline, &orders)?;
        let facets = output
            .into_facets()
            .ok_or(Error::UnexpectedOutput { expected: "facets" })?;

        if stats.dropped_by_join > 0 {
            tracing::info!(
                dropped = stats.dropped_by_join,
                "orders without a matching user or product were excluded"
            );
        }

        Ok(AnalyticsReport { facets, stats })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::InMemoryProvider;

    #[test]
    fn test_pipeline_shape() {
        let pipeline = order_analytics_pipeline(&AnalyticsConfig::default()).unwrap();
        let names: Vec<_> = pipeline.stages().iter().map(Stage::name).collect();
        assert_eq!(names, vec!["lookup", "lookup", "addFields", "facet"]);

        let branches: Vec<_> = pipeline.facet().unwrap().branch_names().collect();
        assert_eq!(branches, vec![SPENDING_BY_USER, SALES_BY_CATEGORY, ORDERS_PER_USER]);
    }

    #[test]
    fn test_top_spenders_config() {
        let pipeline =
            order_analytics_pipeline(&AnalyticsConfig::new().with_top_spenders(3)).unwrap();
        let (_, stages) = &pipeline.facet().unwrap().branches[0];
        assert_eq!(stages.last(), Some(&Stage::Limit(3)));
    }

    #[test]
    fn test_service_cancelled() {
        let service =
            AnalyticsService::new(InMemoryProvider::default(), AnalyticsConfig::default())
                .unwrap();
        service.cancellation_token().cancel();
        let err = service.run().unwrap_err();
        assert!(matches!(err, Error::Engine(aggline_core::EngineError::Cancelled)));
    }

    #[test]
    fn test_empty_dataset_yields_empty_facets() {
        let service =
            AnalyticsService::new(InMemoryProvider::default(), AnalyticsConfig::default())
                .unwrap();
        let report = service.run().unwrap();
        assert_eq!(report.facets().len(), 3);
        assert!(report.spending_by_user().is_empty());
        assert!(report.sales_by_category().is_empty());
        assert!(report.orders_per_user().is_empty());
    }
}
