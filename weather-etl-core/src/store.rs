use crate::{
    config::Config,
    model::{City, WeatherObservation},
    store::{duckdb::DuckDbStore, postgres::PostgresStore},
};
use async_trait::async_trait;
use std::fmt::Debug;
use thiserror::Error;

pub mod duckdb;
pub mod postgres;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("postgres query failed")]
    Postgres(#[from] sqlx::Error),

    #[error("duckdb query failed")]
    DuckDb(#[from] ::duckdb::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendId {
    Postgres,
    DuckDb,
}

impl BackendId {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendId::Postgres => "postgres",
            BackendId::DuckDb => "duckdb",
        }
    }

    pub const fn all() -> &'static [BackendId] {
        &[BackendId::Postgres, BackendId::DuckDb]
    }
}

impl std::fmt::Display for BackendId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for BackendId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "postgres" => Ok(BackendId::Postgres),
            "duckdb" => Ok(BackendId::DuckDb),
            _ => Err(anyhow::anyhow!(
                "Unknown backend '{value}'. Supported backends: postgres, duckdb."
            )),
        }
    }
}

/// Storage backend for the load side of the pipeline.
///
/// `load` is an idempotent bulk write: the whole batch is one transaction,
/// rows whose `(city_id, timestamp)` key already exists are left as-is, and
/// the returned count covers only rows actually inserted. An empty batch is
/// a no-op reporting zero.
#[async_trait]
pub trait WeatherStore: Send + Sync + Debug {
    /// Read the external city catalog.
    async fn cities(&self) -> Result<Vec<City>, StoreError>;

    /// Write a batch of observations, returning the number of new rows.
    async fn load(&self, records: &[WeatherObservation]) -> Result<u64, StoreError>;
}

/// Construct the backend selected by the configuration.
///
/// The Postgres pool connects eagerly, so a bad host or credentials fail
/// here rather than on the first batch.
pub async fn store_from_config(config: &Config) -> anyhow::Result<Box<dyn WeatherStore>> {
    let boxed: Box<dyn WeatherStore> = match config.backend {
        BackendId::Postgres => {
            let pg = config.postgres.as_ref().ok_or_else(|| {
                anyhow::anyhow!(
                    "Backend 'postgres' is selected but not configured.\n\
                     Hint: set DB_HOST, DB_NAME, DB_USER and DB_PASSWORD (and optionally DB_PORT)."
                )
            })?;
            Box::new(PostgresStore::connect(pg).await?)
        }
        BackendId::DuckDb => {
            let warehouse = config.duckdb.as_ref().ok_or_else(|| {
                anyhow::anyhow!(
                    "Backend 'duckdb' is selected but not configured.\n\
                     Hint: set DUCKDB_PATH (and optionally DUCKDB_SCHEMA)."
                )
            })?;
            Box::new(DuckDbStore::open(warehouse)?)
        }
    };

    Ok(boxed)
}
