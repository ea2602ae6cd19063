//! Aggline Command-Line Client
//!
//! Loads a dataset file, runs the order analytics pipeline and prints the
//! result as a JSON envelope or as tables.

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

mod config;
mod formatter;

use aggline::{AnalyticsService, JsonFileProvider};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::Args;

#[tokio::main]
async fn main() {
    // Logs go to stderr so stdout carries only the result
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "aggline=info,aggline_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Args::parse().into_config();
    let formatter = formatter::create_formatter(config.format, config.pretty);

    tracing::info!(
        dataset = %config.dataset.display(),
        format = %config.format,
        top_spenders = config.analytics.top_spenders,
        facet_workers = config.analytics.engine.facet_workers,
        "configuration loaded"
    );

    let service = match AnalyticsService::new(
        JsonFileProvider::new(&config.dataset),
        config.analytics.clone(),
    ) {
        Ok(service) => service,
        Err(e) => {
            println!("{}", formatter.format_error(&e));
            std::process::exit(1);
        }
    };

    // Cancel the run on ctrl+c
    let token = service.cancellation_token();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl+c");
            return;
        }
        tracing::info!("received interrupt, cancelling run");
        token.cancel();
    });

    let result = match tokio::task::spawn_blocking(move || service.run()).await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(error = %e, "analytics task failed");
            std::process::exit(1);
        }
    };

    println!("{}", formatter.format(&result));
    if result.is_err() {
        std::process::exit(1);
    }
}
