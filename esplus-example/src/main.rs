//! esplus Example Entry Point
//!
//! Runs the example session against the OpenSearch node named by
//! `OPENSEARCH_URL`.

use dotenv::dotenv;
use esplus_example::{Dependencies, ExampleError};
use std::env;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing/logging.
///
/// `LOG_FORMAT=json` selects structured JSON output; anything else uses the
/// pretty console format.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("esplus_example=info,esplus_repository=info"));

    let json = env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true).pretty())
            .init();
    }

    info!(
        service_name = "esplus-example",
        service_version = env!("CARGO_PKG_VERSION"),
        json,
        "Tracing initialized"
    );
}

#[tokio::main]
async fn main() -> Result<(), ExampleError> {
    dotenv().ok();

    init_tracing();

    info!("Starting esplus example session");

    let deps = match Dependencies::new().await {
        Ok(deps) => {
            info!("Dependencies initialized successfully");
            deps
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize dependencies");
            return Err(e);
        }
    };

    match deps.session.run().await {
        Ok(report) => {
            info!(report = ?report, "Example session completed successfully");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Example session failed");
            Err(e.into())
        }
    }
}
