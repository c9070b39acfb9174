use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use weather_etl_core::{ArchiveClient, BackendId, Config, HourlyRequest, store_from_config};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-etl", version, about = "Hourly weather archive ETL")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch hourly observations for every catalog city and load them.
    Run {
        /// First day of the range, YYYY-MM-DD.
        #[arg(long)]
        start_date: String,

        /// Last day of the range, YYYY-MM-DD; defaults to the start date.
        #[arg(long)]
        end_date: Option<String>,

        /// Storage backend, "postgres" or "duckdb"; overrides WEATHER_BACKEND.
        #[arg(long)]
        backend: Option<String>,
    },

    /// List the city catalog the pipeline reads from.
    Cities {
        /// Storage backend, "postgres" or "duckdb"; overrides WEATHER_BACKEND.
        #[arg(long)]
        backend: Option<String>,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Run {
                start_date,
                end_date,
                backend,
            } => run_pipeline(start_date, end_date, backend).await,
            Command::Cities { backend } => list_cities(backend).await,
        }
    }
}

fn load_config(backend_override: Option<String>) -> anyhow::Result<Config> {
    let mut config = Config::from_env()?;
    if let Some(raw) = backend_override {
        config.backend = BackendId::try_from(raw.as_str())?;
    }
    Ok(config)
}

/// The driver loop: one fetch and one load per city, sequentially.
///
/// An upstream failure degrades to a skipped city; invalid catalog rows and
/// storage errors abort the run.
async fn run_pipeline(
    start_date: String,
    end_date: Option<String>,
    backend: Option<String>,
) -> anyhow::Result<()> {
    let config = load_config(backend)?;
    let store = store_from_config(&config).await?;
    let client = ArchiveClient::new();

    let cities = store
        .cities()
        .await
        .context("Failed to read the city catalog")?;
    if cities.is_empty() {
        warn!("city catalog is empty, nothing to do");
        return Ok(());
    }

    info!(
        backend = %config.backend,
        cities = cities.len(),
        %start_date,
        end_date = end_date.as_deref().unwrap_or(&start_date),
        "starting run"
    );

    let total = cities.len();
    for (index, city) in cities.iter().enumerate() {
        let request = HourlyRequest::for_city(city, start_date.clone(), end_date.clone());

        let fetched = client
            .fetch_hourly(&request)
            .await
            .with_context(|| format!("Fetch failed for city {}", city.city_id))?;

        match fetched {
            Some(records) => {
                let inserted = store
                    .load(&records)
                    .await
                    .with_context(|| format!("Load failed for city {}", city.city_id))?;
                info!(
                    city_id = city.city_id,
                    fetched = records.len(),
                    inserted,
                    "{}/{} cities updated",
                    index + 1,
                    total
                );
            }
            None => {
                warn!(
                    city_id = city.city_id,
                    "no data from archive, skipping city"
                );
            }
        }
    }

    Ok(())
}

async fn list_cities(backend: Option<String>) -> anyhow::Result<()> {
    let config = load_config(backend)?;
    let store = store_from_config(&config).await?;

    let cities = store
        .cities()
        .await
        .context("Failed to read the city catalog")?;

    for city in &cities {
        println!("{}\t{:.4}\t{:.4}", city.city_id, city.latitude, city.longitude);
    }
    info!(count = cities.len(), "city catalog listed");

    Ok(())
}
