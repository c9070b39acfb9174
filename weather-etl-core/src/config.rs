use anyhow::{Context, Result, anyhow};
use std::path::PathBuf;

use crate::store::BackendId;

/// Connection options for the row-oriented transactional store.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
}

/// Options for the columnar warehouse file.
#[derive(Debug, Clone)]
pub struct DuckDbConfig {
    pub path: PathBuf,
    /// Optional schema qualifying `raw_weather` and `cities`.
    pub schema: Option<String>,
}

/// Explicit pipeline configuration, populated from environment variables.
///
/// Recognized variables:
/// - `WEATHER_BACKEND`: "postgres" (default) or "duckdb"
/// - `DB_HOST`, `DB_NAME`, `DB_USER`, `DB_PASSWORD`, `DB_PORT` (default 5432)
/// - `DUCKDB_PATH`, `DUCKDB_SCHEMA`
///
/// A backend section is `None` when its variables are absent; selecting
/// that backend then fails at store construction with a hint.
#[derive(Debug, Clone)]
pub struct Config {
    pub backend: BackendId,
    pub postgres: Option<PostgresConfig>,
    pub duckdb: Option<DuckDbConfig>,
}

impl Config {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through a lookup closure, so tests can feed
    /// a plain map instead of mutating process-wide state.
    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let backend = match get("WEATHER_BACKEND") {
            Some(raw) => BackendId::try_from(raw.as_str())?,
            None => BackendId::Postgres,
        };

        let postgres = match get("DB_HOST") {
            Some(host) => {
                let port = match get("DB_PORT") {
                    Some(raw) => raw
                        .parse::<u16>()
                        .with_context(|| format!("DB_PORT '{raw}' is not a valid port number"))?,
                    None => 5432,
                };
                Some(PostgresConfig {
                    host,
                    port,
                    database: require(&get, "DB_NAME")?,
                    user: require(&get, "DB_USER")?,
                    password: require(&get, "DB_PASSWORD")?,
                })
            }
            None => None,
        };

        let duckdb = get("DUCKDB_PATH").map(|path| DuckDbConfig {
            path: PathBuf::from(path),
            schema: get("DUCKDB_SCHEMA"),
        });

        Ok(Self {
            backend,
            postgres,
            duckdb,
        })
    }
}

fn require(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    get(key).ok_or_else(|| anyhow!("{key} must be set when DB_HOST is configured"))
}
