use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use tracing::debug;

use crate::config::PostgresConfig;
use crate::model::{City, WeatherObservation};

use super::{StoreError, WeatherStore};

/// Direct-upsert backend for a row-oriented transactional store.
///
/// Conflicting keys are left as-is (`DO NOTHING`): first write wins, so
/// re-running a range never overwrites previously loaded hours. This
/// matches the staged-merge backend, which is also insert-only.
#[derive(Debug)]
pub struct PostgresStore {
    pool: PgPool,
}

const INSERT_OBSERVATION: &str = "\
    INSERT INTO raw_weather \
    (city_id, datetime, temperature_celsius, humidity, precipitation, windspeed) \
    VALUES ($1, $2, $3, $4, $5, $6) \
    ON CONFLICT (city_id, datetime) DO NOTHING";

const SELECT_CITIES: &str = "SELECT city_id, latitude, longitude FROM cities ORDER BY city_id";

impl PostgresStore {
    /// Connect a small pool using the explicit connection options.
    pub async fn connect(config: &PostgresConfig) -> Result<Self, StoreError> {
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.database)
            .username(&config.user)
            .password(&config.password);

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Wrap an existing pool, e.g. one shared with other services.
    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WeatherStore for PostgresStore {
    async fn cities(&self) -> Result<Vec<City>, StoreError> {
        let rows = sqlx::query_as::<_, (i32, f64, f64)>(SELECT_CITIES)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(city_id, latitude, longitude)| City {
                city_id,
                latitude,
                longitude,
            })
            .collect())
    }

    async fn load(&self, records: &[WeatherObservation]) -> Result<u64, StoreError> {
        if records.is_empty() {
            debug!("empty record set, skipping write");
            return Ok(0);
        }

        // One transaction per batch: either every row commits or none do.
        // Dropping the transaction on an early `?` return rolls it back.
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0u64;

        for record in records {
            let result = sqlx::query(INSERT_OBSERVATION)
                .bind(record.city_id)
                .bind(record.timestamp)
                .bind(record.temperature_celsius)
                .bind(record.humidity_percent)
                .bind(record.precipitation_mm)
                .bind(record.wind_speed)
                .execute(&mut *tx)
                .await?;
            inserted += result.rows_affected();
        }

        tx.commit().await?;

        debug!(batch = records.len(), inserted, "batch committed");
        Ok(inserted)
    }
}
