//! Core library for the hourly weather ETL pipeline.
//!
//! This crate defines:
//! - The Open-Meteo archive client (extract side)
//! - Abstraction over storage backends (load side)
//! - Configuration & shared domain models
//!
//! It is used by `weather-etl-cli`, but can also be reused by other binaries or services.

pub mod archive;
pub mod config;
pub mod model;
pub mod store;

pub use archive::{ArchiveClient, FetchError};
pub use config::{Config, DuckDbConfig, PostgresConfig};
pub use model::{City, HourlyRequest, WeatherObservation};
pub use store::{BackendId, StoreError, WeatherStore, store_from_config};
