use chrono::{NaiveDate, NaiveDateTime};
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::model::{HourlyRequest, WeatherObservation};

/// Production endpoint of the Open-Meteo historical archive.
pub const DEFAULT_BASE_URL: &str = "https://archive-api.open-meteo.com";

/// Hourly variables requested from the archive, in destination-column order.
const HOURLY_FIELDS: &str = "temperature_2m,relative_humidity_2m,precipitation,wind_speed_10m";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("latitude {0} is out of range, must be between -90 and 90")]
    LatitudeOutOfRange(f64),

    #[error("longitude {0} is out of range, must be between -180 and 180")]
    LongitudeOutOfRange(f64),

    #[error("{field} '{value}' is not a valid YYYY-MM-DD date")]
    InvalidDate {
        field: &'static str,
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("end_date {end} is earlier than start_date {start}")]
    DateRangeReversed { start: NaiveDate, end: NaiveDate },

    #[error("request to {0} failed")]
    Request(String, #[source] reqwest::Error),

    #[error("failed to read archive response body")]
    Body(#[source] reqwest::Error),

    #[error("failed to parse archive response")]
    Decode(#[source] serde_json::Error),

    #[error("hourly series '{field}' has {found} entries, expected {expected}")]
    SeriesLengthMismatch {
        field: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("timestamp '{value}' is not in hourly ISO format")]
    InvalidTimestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// Client for the Open-Meteo historical archive (the extract side).
#[derive(Debug, Clone)]
pub struct ArchiveClient {
    http: Client,
    base_url: String,
}

impl Default for ArchiveClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveClient {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Point the client at a different endpoint, e.g. a mock server in tests.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Fetch hourly observations for one city over an inclusive date range.
    ///
    /// Inputs are validated before any network I/O; a bad argument is an
    /// error. An unsuccessful HTTP status is not: the failure is logged and
    /// `Ok(None)` is returned so the caller can tell "the call failed" apart
    /// from "the range was empty" and move on to the next city.
    pub async fn fetch_hourly(
        &self,
        request: &HourlyRequest,
    ) -> Result<Option<Vec<WeatherObservation>>, FetchError> {
        let (start, end) = validate(request)?;

        let url = format!("{}/v1/archive", self.base_url);
        let params = [
            ("latitude", request.latitude.to_string()),
            ("longitude", request.longitude.to_string()),
            ("start_date", start.to_string()),
            ("end_date", end.to_string()),
            ("hourly", HOURLY_FIELDS.to_string()),
            ("timezone", "auto".to_string()),
        ];

        debug!(city_id = request.city_id, %start, %end, "requesting hourly archive data");

        let res = self
            .http
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|source| FetchError::Request(url.clone(), source))?;

        let status = res.status();
        let body = res.text().await.map_err(FetchError::Body)?;

        if !status.is_success() {
            warn!(
                city_id = request.city_id,
                status = %status,
                body = %truncate_body(&body),
                "archive request failed, no data for this city"
            );
            return Ok(None);
        }

        let parsed: ArchiveResponse = serde_json::from_str(&body).map_err(FetchError::Decode)?;

        reshape(request.city_id, &parsed.hourly).map(Some)
    }
}

/// Check all request inputs, returning the resolved inclusive date range.
fn validate(request: &HourlyRequest) -> Result<(NaiveDate, NaiveDate), FetchError> {
    if !(-90.0..=90.0).contains(&request.latitude) {
        return Err(FetchError::LatitudeOutOfRange(request.latitude));
    }
    if !(-180.0..=180.0).contains(&request.longitude) {
        return Err(FetchError::LongitudeOutOfRange(request.longitude));
    }

    let start = parse_date("start_date", &request.start_date)?;
    let end = match request.end_date.as_deref() {
        Some(raw) => parse_date("end_date", raw)?,
        None => start,
    };

    if end < start {
        return Err(FetchError::DateRangeReversed { start, end });
    }

    Ok((start, end))
}

fn parse_date(field: &'static str, raw: &str) -> Result<NaiveDate, FetchError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|source| FetchError::InvalidDate {
        field,
        value: raw.to_string(),
        source,
    })
}

#[derive(Debug, Deserialize)]
struct ArchiveResponse {
    hourly: HourlySeries,
}

/// The archive returns parallel arrays keyed by variable name, one entry
/// per hour in the requested range.
#[derive(Debug, Deserialize)]
struct HourlySeries {
    time: Vec<String>,
    temperature_2m: Vec<Option<f64>>,
    relative_humidity_2m: Vec<Option<f64>>,
    precipitation: Vec<Option<f64>>,
    wind_speed_10m: Vec<Option<f64>>,
}

/// Turn the parallel arrays into one observation per hour, attaching the
/// constant `city_id` to every row.
fn reshape(city_id: i32, series: &HourlySeries) -> Result<Vec<WeatherObservation>, FetchError> {
    let expected = series.time.len();
    check_len("temperature_2m", expected, series.temperature_2m.len())?;
    check_len(
        "relative_humidity_2m",
        expected,
        series.relative_humidity_2m.len(),
    )?;
    check_len("precipitation", expected, series.precipitation.len())?;
    check_len("wind_speed_10m", expected, series.wind_speed_10m.len())?;

    let mut observations = Vec::with_capacity(expected);
    for (index, raw) in series.time.iter().enumerate() {
        let timestamp = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M").map_err(|source| {
            FetchError::InvalidTimestamp {
                value: raw.clone(),
                source,
            }
        })?;

        observations.push(WeatherObservation {
            city_id,
            timestamp,
            temperature_celsius: series.temperature_2m[index],
            humidity_percent: series.relative_humidity_2m[index],
            precipitation_mm: series.precipitation[index],
            wind_speed: series.wind_speed_10m[index],
        });
    }

    Ok(observations)
}

fn check_len(field: &'static str, expected: usize, found: usize) -> Result<(), FetchError> {
    if found != expected {
        return Err(FetchError::SeriesLengthMismatch {
            field,
            expected,
            found,
        });
    }
    Ok(())
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        format!("{}...", &body[..MAX])
    } else {
        body.to_string()
    }
}
