//! harvest - systematic review metadata harvester.
//!
//! Crawls a topic's review listing into a pipe-delimited file, with a
//! bibliographic API fallback when the listing is challenge-protected.

mod cli;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (before anything else)
    let _ = dotenvy::dotenv();

    let default_filter = if cli::is_verbose() {
        "review_harvester=debug,harvest=debug"
    } else if cli::is_quiet() {
        "review_harvester=warn,harvest=warn"
    } else {
        "review_harvester=info,harvest=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    cli::run().await
}
