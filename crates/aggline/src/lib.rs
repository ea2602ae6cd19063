//! Aggline - cross-entity order analytics.
//!
//! Joins orders with their users and products and computes spending per
//! user, sales per category and orders per user in one faceted pipeline run.
//!
//! # Example
//!
//! ```
//! use aggline::{
//!     AnalyticsConfig, AnalyticsService, Dataset, InMemoryProvider, JsonEnvelopeFormatter,
//!     Order, Product, ResponseFormatter, User,
//! };
//!
//! let dataset = Dataset::new(
//!     vec![Order::new(1, "U1", "P1", 2)],
//!     vec![User::new("U1", "Ann")],
//!     vec![Product::new("P1", "Books", 10.0)],
//! );
//! let service = AnalyticsService::new(InMemoryProvider::new(dataset), AnalyticsConfig::default())?;
//! let report = service.run()?;
//! assert_eq!(report.spending_by_user().len(), 1);
//!
//! let body = JsonEnvelopeFormatter::new().format_report(&report);
//! assert!(body.starts_with(r#"{"success":true"#));
//! # Ok::<(), aggline::Error>(())
//! ```

pub mod analytics;
pub mod error;
pub mod formatter;
pub mod model;
pub mod provider;

pub use analytics::{
    order_analytics_pipeline, AnalyticsConfig, AnalyticsReport, AnalyticsService,
    ORDERS_PER_USER, SALES_BY_CATEGORY, SPENDING_BY_USER,
};
pub use error::{Error, Result};
pub use formatter::{ErrorResponse, JsonEnvelopeFormatter, ResponseFormatter, SuccessResponse};
pub use model::{Order, Product, RecordId, User};
pub use provider::{DataProvider, Dataset, InMemoryProvider, JsonFileProvider, ProviderError};

/// Re-export the engine.
pub use aggline_core as engine;
/// Re-export protocol types.
pub use aggline_proto as proto;
