//! Command-line arguments and run configuration.

use std::path::PathBuf;

use aggline::AnalyticsConfig;
use aggline_core::{EngineConfig, MissingFieldPolicy};
use clap::{Parser, ValueEnum};

use crate::formatter::OutputFormat;

/// Missing field handling selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MissingFields {
    /// Abort the run on a missing field
    Error,
    /// Treat missing numeric operands as zero
    Zero,
}

impl From<MissingFields> for MissingFieldPolicy {
    fn from(value: MissingFields) -> Self {
        match value {
            MissingFields::Error => MissingFieldPolicy::Error,
            MissingFields::Zero => MissingFieldPolicy::Zero,
        }
    }
}

/// Aggline order analytics
#[derive(Parser, Debug)]
#[command(name = "aggline")]
#[command(version, about = "Run order analytics over a JSON dataset", long_about = None)]
pub struct Args {
    /// Dataset file with "orders", "users" and "products" arrays.
    pub dataset: PathBuf,

    /// Output format.
    #[arg(long, default_value = "json", value_enum)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long)]
    pub pretty: bool,

    /// Number of users reported in spendingByUser.
    #[arg(long, default_value_t = 5)]
    pub top: usize,

    /// Facet worker threads (0 = auto).
    #[arg(long, default_value_t = 0)]
    pub workers: usize,

    /// Run facet branches one after another on the main thread.
    #[arg(long)]
    pub sequential: bool,

    /// Missing field handling.
    #[arg(long, default_value = "error", value_enum)]
    pub missing_fields: MissingFields,
}

/// Resolved CLI configuration.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub dataset: PathBuf,
    pub format: OutputFormat,
    pub pretty: bool,
    pub analytics: AnalyticsConfig,
}

impl Args {
    /// Convert command-line arguments to a run configuration.
    pub fn into_config(self) -> CliConfig {
        let mut engine = EngineConfig::new().with_missing_fields(self.missing_fields.into());
        if self.workers > 0 {
            engine = engine.with_facet_workers(self.workers);
        }
        if self.sequential {
            engine = engine.sequential_facets();
        }

        CliConfig {
            dataset: self.dataset,
            format: self.format,
            pretty: self.pretty,
            analytics: AnalyticsConfig::new()
                .with_top_spenders(self.top)
                .with_engine(engine),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_args() {
        let config = Args::try_parse_from(["aggline", "data.json"])
            .unwrap()
            .into_config();
        assert_eq!(config.dataset, PathBuf::from("data.json"));
        assert_eq!(config.format, OutputFormat::Json);
        assert!(!config.pretty);
        assert_eq!(config.analytics.top_spenders, 5);
        assert!(config.analytics.engine.parallel_facets);
        assert_eq!(config.analytics.engine.missing_fields, MissingFieldPolicy::Error);
    }

    #[test]
    fn test_all_options() {
        let config = Args::try_parse_from([
            "aggline",
            "data.json",
            "--format",
            "table",
            "--top",
            "3",
            "--workers",
            "2",
            "--sequential",
            "--missing-fields",
            "zero",
        ])
        .unwrap()
        .into_config();
        assert_eq!(config.format, OutputFormat::Table);
        assert_eq!(config.analytics.top_spenders, 3);
        assert_eq!(config.analytics.engine.facet_workers, 2);
        assert!(!config.analytics.engine.parallel_facets);
        assert_eq!(config.analytics.engine.missing_fields, MissingFieldPolicy::Zero);
    }

    #[test]
    fn test_dataset_required() {
        assert!(Args::try_parse_from(["aggline"]).is_err());
    }
}
