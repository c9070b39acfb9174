//! Binary crate for the weather ETL driver.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - Wiring environment configuration to the storage backends
//! - Running the per-city extract-load loop

use clap::Parser;

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; the real environment still applies.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cmd = cli::Cli::parse();
    cmd.run().await
}
