use std::fmt;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use duckdb::{Connection, params};
use tracing::debug;

use crate::config::DuckDbConfig;
use crate::model::{City, WeatherObservation};

use super::{StoreError, WeatherStore};

/// Staged-merge backend for a columnar warehouse file.
///
/// Each batch lands in a call-scoped temporary table and is then merged
/// into the destination with one set-based insert of the keys that do not
/// exist yet. Insert-only, like the direct-upsert backend.
pub struct DuckDbStore {
    conn: Mutex<Connection>,
    schema: Option<String>,
}

impl DuckDbStore {
    pub fn open(config: &DuckDbConfig) -> Result<Self, StoreError> {
        let conn = Connection::open(&config.path)?;
        Ok(Self::with_connection(conn, config.schema.as_deref()))
    }

    /// Wrap an existing connection, e.g. an in-memory one in tests.
    pub fn with_connection(conn: Connection, schema: Option<&str>) -> Self {
        Self {
            conn: Mutex::new(conn),
            schema: schema.map(str::to_string),
        }
    }

    fn table(&self, name: &str) -> String {
        match &self.schema {
            Some(schema) => format!("{schema}.{name}"),
            None => name.to_string(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        match self.conn.lock() {
            Ok(guard) => guard,
            // A panicked batch already rolled back; the connection stays usable.
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl fmt::Debug for DuckDbStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DuckDbStore")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl WeatherStore for DuckDbStore {
    async fn cities(&self) -> Result<Vec<City>, StoreError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT city_id, latitude, longitude FROM {} ORDER BY city_id",
            self.table("cities")
        ))?;

        let rows = stmt.query_map([], |row| {
            Ok(City {
                city_id: row.get(0)?,
                latitude: row.get(1)?,
                longitude: row.get(2)?,
            })
        })?;

        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    async fn load(&self, records: &[WeatherObservation]) -> Result<u64, StoreError> {
        if records.is_empty() {
            debug!("empty record set, skipping write");
            return Ok(0);
        }

        let destination = self.table("raw_weather");
        let mut conn = self.lock();

        // One transaction per batch; dropping it on an early `?` return
        // rolls back the staged rows together with the merge.
        let tx = conn.transaction()?;

        tx.execute_batch(&format!(
            "CREATE TEMPORARY TABLE staged_weather AS SELECT * FROM {destination} WHERE 1=0;"
        ))?;

        {
            let mut insert = tx.prepare(
                "INSERT INTO staged_weather VALUES (?, CAST(? AS TIMESTAMP), ?, ?, ?, ?)",
            )?;
            for record in records {
                insert.execute(params![
                    record.city_id,
                    record.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                    record.temperature_celsius,
                    record.humidity_percent,
                    record.precipitation_mm,
                    record.wind_speed,
                ])?;
            }
        }

        let inserted = tx.execute(
            &format!(
                "INSERT INTO {destination} \
                 SELECT s.* FROM staged_weather s \
                 WHERE NOT EXISTS ( \
                     SELECT 1 FROM {destination} t \
                     WHERE t.city_id = s.city_id AND t.datetime = s.datetime \
                 )"
            ),
            [],
        )?;

        // Temporary tables are session-scoped, not call-scoped; drop inside
        // the transaction so the next batch can stage again.
        tx.execute_batch("DROP TABLE staged_weather;")?;
        tx.commit()?;

        debug!(batch = records.len(), inserted, "batch merged");
        Ok(inserted as u64)
    }
}
