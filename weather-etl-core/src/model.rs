use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One row of the external city catalog. The pipeline only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    pub city_id: i32,
    pub latitude: f64,
    pub longitude: f64,
}

/// Parameters for one hourly-archive fetch.
///
/// Dates stay as strings so that validation happens in one place, inside
/// the fetch call, before any network I/O.
#[derive(Debug, Clone)]
pub struct HourlyRequest {
    pub city_id: i32,
    pub latitude: f64,
    pub longitude: f64,
    /// First day of the range, `YYYY-MM-DD`.
    pub start_date: String,
    /// Last day of the range, `YYYY-MM-DD`; defaults to `start_date`.
    pub end_date: Option<String>,
}

impl HourlyRequest {
    /// Build a request for one catalog city over a date range.
    pub fn for_city(city: &City, start_date: impl Into<String>, end_date: Option<String>) -> Self {
        Self {
            city_id: city.city_id,
            latitude: city.latitude,
            longitude: city.longitude,
            start_date: start_date.into(),
            end_date,
        }
    }
}

/// One hourly observation, the unit both storage backends write.
///
/// `(city_id, timestamp)` is the natural key; the destination table keeps
/// at most one row per city per hour. The timestamp is local wall-clock
/// time, resolved by the archive from the coordinates. Measurements are
/// optional because the archive reports `null` for hours it has no data
/// for; nulls pass through to the destination columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherObservation {
    pub city_id: i32,
    pub timestamp: NaiveDateTime,
    pub temperature_celsius: Option<f64>,
    pub humidity_percent: Option<f64>,
    pub precipitation_mm: Option<f64>,
    pub wind_speed: Option<f64>,
}
