//! HTTP contract tests for the archive client, run against a mock server.

use chrono::{Duration, NaiveDate};
use serde_json::json;
use weather_etl_core::{ArchiveClient, FetchError, HourlyRequest};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request(start_date: &str, end_date: Option<&str>) -> HourlyRequest {
    HourlyRequest {
        city_id: 1,
        latitude: 19.4326,
        longitude: -99.1332,
        start_date: start_date.to_string(),
        end_date: end_date.map(str::to_string),
    }
}

/// An archive payload with one entry per hour over `days` days.
fn sample_body(start: &str, days: i64) -> serde_json::Value {
    let first = NaiveDate::parse_from_str(start, "%Y-%m-%d")
        .expect("test date")
        .and_hms_opt(0, 0, 0)
        .expect("midnight");
    let hours = days * 24;

    let time: Vec<String> = (0..hours)
        .map(|h| {
            (first + Duration::hours(h))
                .format("%Y-%m-%dT%H:%M")
                .to_string()
        })
        .collect();
    let temperature: Vec<f64> = (0..hours).map(|h| 10.0 + h as f64 * 0.1).collect();
    let humidity: Vec<f64> = vec![65.0; hours as usize];
    let precipitation: Vec<f64> = vec![0.2; hours as usize];
    let wind_speed: Vec<f64> = vec![11.5; hours as usize];

    json!({
        "latitude": 19.4326,
        "longitude": -99.1332,
        "timezone": "America/Mexico_City",
        "hourly": {
            "time": time,
            "temperature_2m": temperature,
            "relative_humidity_2m": humidity,
            "precipitation": precipitation,
            "wind_speed_10m": wind_speed,
        }
    })
}

async fn mount_archive(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/v1/archive"))
        .respond_with(response)
        .mount(server)
        .await;
}

#[tokio::test]
async fn single_day_fetch_yields_24_observations() {
    let server = MockServer::start().await;
    mount_archive(
        &server,
        ResponseTemplate::new(200).set_body_json(sample_body("2025-01-01", 1)),
    )
    .await;

    let client = ArchiveClient::with_base_url(server.uri());
    let records = client
        .fetch_hourly(&request("2025-01-01", None))
        .await
        .expect("fetch")
        .expect("data");

    assert_eq!(records.len(), 24);
    assert_eq!(records[0].city_id, 1);
    assert_eq!(
        records[0].timestamp,
        NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    );
    assert_eq!(records[0].precipitation_mm, Some(0.2));
    assert_eq!(
        records[23].timestamp,
        NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(23, 0, 0)
            .unwrap()
    );
}

#[tokio::test]
async fn five_day_range_yields_120_observations() {
    let server = MockServer::start().await;
    mount_archive(
        &server,
        ResponseTemplate::new(200).set_body_json(sample_body("2025-01-01", 5)),
    )
    .await;

    let client = ArchiveClient::with_base_url(server.uri());
    let records = client
        .fetch_hourly(&request("2025-01-01", Some("2025-01-05")))
        .await
        .expect("fetch")
        .expect("data");

    assert_eq!(records.len(), 120);
}

#[tokio::test]
async fn query_parameters_match_the_archive_contract() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/archive"))
        .and(query_param("latitude", "19.4326"))
        .and(query_param("longitude", "-99.1332"))
        .and(query_param("start_date", "2025-01-01"))
        .and(query_param("end_date", "2025-01-05"))
        .and(query_param(
            "hourly",
            "temperature_2m,relative_humidity_2m,precipitation,wind_speed_10m",
        ))
        .and(query_param("timezone", "auto"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sample_body("2025-01-01", 5)))
        .expect(1)
        .mount(&server)
        .await;

    let client = ArchiveClient::with_base_url(server.uri());
    let result = client
        .fetch_hourly(&request("2025-01-01", Some("2025-01-05")))
        .await;

    assert!(result.is_ok(), "expected success, got: {result:?}");
}

#[tokio::test]
async fn missing_end_date_defaults_to_start_date_in_the_query() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/archive"))
        .and(query_param("start_date", "2025-01-01"))
        .and(query_param("end_date", "2025-01-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sample_body("2025-01-01", 1)))
        .expect(1)
        .mount(&server)
        .await;

    let client = ArchiveClient::with_base_url(server.uri());
    let result = client.fetch_hourly(&request("2025-01-01", None)).await;

    assert!(result.is_ok(), "expected success, got: {result:?}");
}

#[tokio::test]
async fn upstream_failure_yields_no_data_not_an_error() {
    let server = MockServer::start().await;
    mount_archive(
        &server,
        ResponseTemplate::new(429).set_body_string("Minutely API request limit exceeded"),
    )
    .await;

    let client = ArchiveClient::with_base_url(server.uri());
    let result = client
        .fetch_hourly(&request("2025-01-01", None))
        .await
        .expect("upstream failure must not be an error");

    assert!(result.is_none(), "expected no data, got: {result:?}");
}

#[tokio::test]
async fn server_error_yields_no_data_not_an_error() {
    let server = MockServer::start().await;
    mount_archive(
        &server,
        ResponseTemplate::new(500).set_body_string("Internal Server Error"),
    )
    .await;

    let client = ArchiveClient::with_base_url(server.uri());
    let result = client
        .fetch_hourly(&request("2025-01-01", None))
        .await
        .expect("upstream failure must not be an error");

    assert!(result.is_none());
}

#[tokio::test]
async fn invalid_json_is_an_error() {
    let server = MockServer::start().await;
    mount_archive(&server, ResponseTemplate::new(200).set_body_string("not valid json")).await;

    let client = ArchiveClient::with_base_url(server.uri());
    let result = client.fetch_hourly(&request("2025-01-01", None)).await;

    assert!(
        matches!(result, Err(FetchError::Decode(_))),
        "expected decode error, got: {result:?}"
    );
}

#[tokio::test]
async fn null_entries_come_back_as_missing_measurements() {
    let server = MockServer::start().await;
    let body = json!({
        "hourly": {
            "time": ["2025-01-01T00:00", "2025-01-01T01:00"],
            "temperature_2m": [12.5, null],
            "relative_humidity_2m": [70.0, 71.0],
            "precipitation": [null, 0.4],
            "wind_speed_10m": [5.0, 5.5],
        }
    });
    mount_archive(&server, ResponseTemplate::new(200).set_body_json(body)).await;

    let client = ArchiveClient::with_base_url(server.uri());
    let records = client
        .fetch_hourly(&request("2025-01-01", None))
        .await
        .expect("fetch")
        .expect("data");

    assert_eq!(records[0].precipitation_mm, None);
    assert_eq!(records[1].temperature_celsius, None);
    assert_eq!(records[1].precipitation_mm, Some(0.4));
}

#[tokio::test]
async fn invalid_latitude_issues_no_request() {
    let server = MockServer::start().await;

    // Validation must fail before any network call reaches the server.
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = ArchiveClient::with_base_url(server.uri());
    let mut req = request("2025-01-01", None);
    req.latitude = 91.0;

    let result = client.fetch_hourly(&req).await;
    assert!(matches!(result, Err(FetchError::LatitudeOutOfRange(_))));
}

#[tokio::test]
async fn malformed_date_issues_no_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = ArchiveClient::with_base_url(server.uri());
    let result = client.fetch_hourly(&request("01/01/2025", None)).await;

    assert!(matches!(result, Err(FetchError::InvalidDate { .. })));
}

#[tokio::test]
async fn reversed_range_issues_no_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = ArchiveClient::with_base_url(server.uri());
    let result = client
        .fetch_hourly(&request("2025-01-05", Some("2025-01-01")))
        .await;

    assert!(matches!(result, Err(FetchError::DateRangeReversed { .. })));
}
