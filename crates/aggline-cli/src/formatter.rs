//! Output formatters for analytics results.

use aggline::{AnalyticsReport, Error, JsonEnvelopeFormatter, ResponseFormatter};
use aggline_proto::{Document, Value};
use clap::ValueEnum;
use comfy_table::{Cell, Table};

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table per facet
    Table,
    /// JSON envelope
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Create a formatter for the given output format.
pub fn create_formatter(format: OutputFormat, pretty: bool) -> Box<dyn ResponseFormatter> {
    match format {
        OutputFormat::Table => Box::new(TableFormatter),
        OutputFormat::Json if pretty => Box::new(JsonEnvelopeFormatter::new().pretty()),
        OutputFormat::Json => Box::new(JsonEnvelopeFormatter::new()),
    }
}

/// Table formatter using comfy-table.
pub struct TableFormatter;

impl ResponseFormatter for TableFormatter {
    fn format_report(&self, report: &AnalyticsReport) -> String {
        let mut output = String::new();

        for (name, records) in report.facets().iter() {
            if !output.is_empty() {
                output.push_str("\n\n");
            }
            output.push_str(name);
            output.push('\n');
            output.push_str(&format_records_as_table(records));
        }

        if output.is_empty() {
            output = "No results".to_string();
        }

        output
    }

    fn format_error(&self, error: &Error) -> String {
        format!("Error: {}", error)
    }
}

/// Format records as a table; columns follow first-seen field order.
fn format_records_as_table(records: &[Document]) -> String {
    let mut columns: Vec<&str> = Vec::new();
    for record in records {
        for name in record.field_names() {
            if !columns.contains(&name) {
                columns.push(name);
            }
        }
    }

    let mut table = Table::new();
    table.set_header(columns.iter().map(|c| Cell::new(c)).collect::<Vec<_>>());

    for record in records {
        let cells: Vec<Cell> = columns
            .iter()
            .map(|column| Cell::new(record.get(column).map(format_value).unwrap_or_default()))
            .collect();
        table.add_row(cells);
    }

    format!("{}\n{} row(s)", table, records.len())
}

/// Format a Value as a display string.
fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{:.2}", f),
        Value::Float(f) => f.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_columns_in_first_seen_order() {
        let records = vec![
            Document::new().with("_id", "U1").with("total", 20.0),
            Document::new().with("_id", "U2").with("name", "Bob"),
        ];
        let table = format_records_as_table(&records);
        let header = table.lines().nth(1).unwrap();
        let id = header.find("_id").unwrap();
        let total = header.find("total").unwrap();
        let name = header.find("name").unwrap();
        assert!(id < total && total < name);
        assert!(table.ends_with("2 row(s)"));
        assert!(table.contains("20.00"));
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(&Value::Null), "NULL");
        assert_eq!(format_value(&Value::Float(20.0)), "20.00");
        assert_eq!(format_value(&Value::Float(2.5)), "2.5");
        assert_eq!(format_value(&Value::Int(3)), "3");
        assert_eq!(format_value(&Value::from("Ann")), "Ann");
    }

    #[test]
    fn test_error_output() {
        let error = Error::UnexpectedOutput { expected: "facets" };
        assert_eq!(
            TableFormatter.format_error(&error),
            "Error: unexpected pipeline output: expected facets"
        );
    }

    #[test]
    fn test_output_format_display() {
        assert_eq!(OutputFormat::Table.to_string(), "table");
        assert_eq!(OutputFormat::Json.to_string(), "json");
    }
}
