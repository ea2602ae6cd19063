//! Response formatting for analytics results.

use serde::Serialize;

use crate::analytics::AnalyticsReport;
use crate::error::{Error, Result};

/// Success envelope.
#[derive(Debug, Serialize)]
pub struct SuccessResponse<T: Serialize> {
    /// Success flag.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> SuccessResponse<T> {
    /// Create a new success response.
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Failure envelope.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Success flag (always false).
    pub success: bool,
    /// Error message.
    pub message: String,
}

impl ErrorResponse {
    /// Create a failure response from any error.
    pub fn new(error: &impl std::fmt::Display) -> Self {
        Self {
            success: false,
            message: error.to_string(),
        }
    }
}

/// Turns an analytics outcome into a response body.
pub trait ResponseFormatter {
    /// Format a successful report.
    fn format_report(&self, report: &AnalyticsReport) -> String;

    /// Format a failure.
    fn format_error(&self, error: &Error) -> String;

    /// Format either outcome.
    fn format(&self, result: &Result<AnalyticsReport>) -> String {
        match result {
            Ok(report) => self.format_report(report),
            Err(error) => self.format_error(error),
        }
    }
}

/// JSON formatter producing `{"success":true,"data":{...}}` or
/// `{"success":false,"message":"..."}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEnvelopeFormatter {
    pretty: bool,
}

impl JsonEnvelopeFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indent the output.
    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }

    fn to_json<T: Serialize>(&self, body: &T) -> String {
        let encoded = if self.pretty {
            serde_json::to_string_pretty(body)
        } else {
            serde_json::to_string(body)
        };
        encoded.unwrap_or_else(|e| {
            serde_json::json!({ "success": false, "message": e.to_string() }).to_string()
        })
    }
}

impl ResponseFormatter for JsonEnvelopeFormatter {
    fn format_report(&self, report: &AnalyticsReport) -> String {
        self.to_json(&SuccessResponse::new(report))
    }

    fn format_error(&self, error: &Error) -> String {
        self.to_json(&ErrorResponse::new(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::{AnalyticsConfig, AnalyticsService};
    use crate::model::{Order, Product, User};
    use crate::provider::{Dataset, InMemoryProvider};
    use aggline_core::EngineError;

    fn report() -> AnalyticsReport {
        let dataset = Dataset::new(
            vec![Order::new(1, "U1", "P1", 2)],
            vec![User::new("U1", "Ann")],
            vec![Product::new("P1", "Books", 10.0)],
        );
        AnalyticsService::new(InMemoryProvider::new(dataset), AnalyticsConfig::default())
            .unwrap()
            .run()
            .unwrap()
    }

    #[test]
    fn test_success_envelope() {
        let body = JsonEnvelopeFormatter::new().format_report(&report());
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();

        assert_eq!(json["success"], true);
        assert_eq!(
            json["data"]["spendingByUser"],
            serde_json::json!([{ "_id": "U1", "name": "Ann", "totalSpent": 20.0 }])
        );
        assert_eq!(
            json["data"]["salesByCategory"],
            serde_json::json!([{ "_id": "Books", "totalSales": 20.0 }])
        );
        assert_eq!(
            json["data"]["ordersPerUser"],
            serde_json::json!([{ "_id": "U1", "name": "Ann", "ordersCount": 1 }])
        );
    }

    #[test]
    fn test_facet_keys_in_declaration_order() {
        let body = JsonEnvelopeFormatter::new().format_report(&report());
        let spending = body.find("spendingByUser").unwrap();
        let sales = body.find("salesByCategory").unwrap();
        let orders = body.find("ordersPerUser").unwrap();
        assert!(spending < sales && sales < orders);
    }

    #[test]
    fn test_error_envelope() {
        let body = JsonEnvelopeFormatter::new().format_error(&Error::Engine(EngineError::Cancelled));
        assert_eq!(
            body,
            r#"{"success":false,"message":"engine error: pipeline run cancelled"}"#
        );
    }

    #[test]
    fn test_format_dispatches() {
        let formatter = JsonEnvelopeFormatter::new().pretty();
        let ok = formatter.format(&Ok(report()));
        assert!(ok.contains("\"success\": true"));
        let err = formatter.format(&Err(Error::UnexpectedOutput { expected: "facets" }));
        assert!(err.contains("\"success\": false"));
    }
}
