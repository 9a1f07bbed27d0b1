//! Live departures from the home station.

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone};
use dashboard_types::{Train, TrainDepartures, TrainStatus};
use serde::Deserialize;
use std::time::Duration;

use super::{decode_json, send_checked, Provider};
use crate::cache::Cache;
use crate::config::TransportConfig;
use crate::error::{DashboardError, DashboardResult};

const PROVIDER: &str = "transport";
const CACHE_KEY: &str = "trains";
const CACHE_TTL: Duration = Duration::from_secs(10 * 60);

/// Served instead of live data when the client runs in test mode
const SAMPLE_RESPONSE: &str = r#"{
  "departures": {
    "all": [
      {"origin_name": "London Liverpool Street", "destination_name": "Hertford East",
       "aimed_departure_time": "07:06", "expected_departure_time": "07:06", "status": "ON TIME"},
      {"origin_name": "Hertford East", "destination_name": "London Liverpool Street",
       "aimed_departure_time": "07:21", "expected_departure_time": "07:25", "status": "LATE"},
      {"origin_name": "London Liverpool Street", "destination_name": "Hertford East",
       "aimed_departure_time": "07:36", "expected_departure_time": "07:36", "status": "ON TIME"},
      {"origin_name": "Hertford East", "destination_name": "London Liverpool Street",
       "aimed_departure_time": "07:51", "expected_departure_time": null, "status": "CANCELLED"},
      {"origin_name": "Hertford East", "destination_name": "London Liverpool Street",
       "aimed_departure_time": "08:21", "expected_departure_time": "08:21", "status": "STARTS HERE"}
    ]
  }
}"#;

#[derive(Debug, Deserialize)]
struct StationResponse {
    departures: DepartureBoard,
}

#[derive(Debug, Deserialize)]
struct DepartureBoard {
    all: Vec<Departure>,
}

#[derive(Debug, Deserialize)]
struct Departure {
    origin_name: Option<String>,
    destination_name: Option<String>,
    aimed_departure_time: Option<String>,
    expected_departure_time: Option<String>,
    status: Option<String>,
}

impl Departure {
    fn into_train(self, today: NaiveDate) -> Train {
        Train {
            time: clock_time_on(self.aimed_departure_time.as_deref(), today),
            expected_time: clock_time_on(self.expected_departure_time.as_deref(), today),
            from: self.origin_name,
            to: self.destination_name,
            status: map_status(self.status.as_deref()),
        }
    }
}

/// Collapse the provider's status codes into what the card shows.
pub fn map_status(status: Option<&str>) -> TrainStatus {
    match status {
        Some("LATE") | Some("DELAYED") => TrainStatus::Delayed,
        Some("CANCELLED") | Some("BUS") => TrainStatus::Cancelled,
        None
        | Some("ARRIVED")
        | Some("EARLY")
        | Some("NO REPORT")
        | Some("STARTS HERE")
        | Some("ON TIME")
        | Some("OFF ROUTE")
        | Some("REINSTATEMENT")
        | Some("CHANGE OF ORIGIN")
        | Some("CHANGE OF IDENTITY") => TrainStatus::OnTime,
        Some(other) => {
            tracing::warn!("Unexpected train status: {}", other);
            TrainStatus::OnTime
        }
    }
}

/// Local instant for an "HH:MM" string on `date`; `None` when malformed.
pub fn clock_time_on(time: Option<&str>, date: NaiveDate) -> Option<DateTime<Local>> {
    let (hours, minutes) = time?.split_once(':')?;
    let time = NaiveTime::from_hms_opt(hours.trim().parse().ok()?, minutes.trim().parse().ok()?, 0)?;
    Local.from_local_datetime(&date.and_time(time)).earliest()
}

/// Decode a station response into trains departing on `today`.
pub fn parse_departures(body: &str, today: NaiveDate) -> DashboardResult<Vec<Train>> {
    let response: StationResponse =
        serde_json::from_str(body).map_err(|e| DashboardError::validation(PROVIDER, e.to_string()))?;
    Ok(response.into_trains(today))
}

impl StationResponse {
    fn into_trains(self, today: NaiveDate) -> Vec<Train> {
        self.departures
            .all
            .into_iter()
            .map(|departure| departure.into_train(today))
            .collect()
    }
}

pub struct TransportClient {
    config: TransportConfig,
    client: reqwest::Client,
    cache: Cache,
}

impl TransportClient {
    pub fn new(config: TransportConfig, cache: Cache) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            cache,
        }
    }

    fn request(&self) -> reqwest::RequestBuilder {
        let url = format!(
            "{}/v3/uk/train/station/{}.json",
            self.config.base_url.trim_end_matches('/'),
            self.config.station
        );

        let mut query = vec![
            ("app_id", self.config.app_id.clone()),
            ("app_key", self.config.app_key.clone()),
            ("live", self.config.live.to_string()),
            ("to_offset", self.config.to_offset.clone()),
        ];
        if let Some(limit) = self.config.limit {
            query.push(("limit", limit.to_string()));
        }

        self.client.get(url).query(&query)
    }

    /// Current departures, served from the cache while it is fresh.
    pub async fn departures(&self) -> DashboardResult<TrainDepartures> {
        if self.config.cache {
            if let Some(record) = self.cache.read::<Vec<Train>>(CACHE_KEY).await {
                tracing::debug!("Using cached trains from {}", record.timestamp.to_rfc3339());
                return Ok(TrainDepartures {
                    trains: record.payload,
                    queried_at: record.timestamp,
                });
            }
        }

        let queried_at = Local::now();
        let trains = if self.config.testing {
            tracing::debug!("Returning sample departures");
            parse_departures(SAMPLE_RESPONSE, queried_at.date_naive())?
        } else {
            self.fetch_live(queried_at.date_naive()).await?
        };
        tracing::info!("Fetched {} departures from {}", trains.len(), self.config.station);

        if self.config.cache {
            if let Err(e) = self.cache.write(CACHE_KEY, &trains, CACHE_TTL).await {
                tracing::warn!("Failed to cache trains: {}", e);
            }
        }

        Ok(TrainDepartures { trains, queried_at })
    }

    async fn fetch_live(&self, today: NaiveDate) -> DashboardResult<Vec<Train>> {
        tracing::debug!("Fetching departures for {}", self.config.station);
        let response = send_checked(self.request()).await?;
        let response: StationResponse = decode_json(PROVIDER, response).await?;
        Ok(response.into_trains(today))
    }
}

#[async_trait]
impl Provider for TransportClient {
    type Output = TrainDepartures;

    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn fetch(&self) -> DashboardResult<TrainDepartures> {
        self.departures().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::test_support::serve_once;
    use chrono::Timelike;

    const MOCK_RESPONSE: &str = r#"{
      "departures": {
        "all": [
          {"origin_name": "London Liverpool Street", "destination_name": "Cambridge",
           "aimed_departure_time": "08:30", "expected_departure_time": "08:35", "status": "LATE"},
          {"origin_name": "London Liverpool Street", "destination_name": "Stansted Airport",
           "aimed_departure_time": "08:45", "expected_departure_time": "08:45", "status": "ON TIME"},
          {"origin_name": "London Liverpool Street", "destination_name": "Cambridge",
           "aimed_departure_time": "09:00", "expected_departure_time": null, "status": "CANCELLED"}
        ]
      }
    }"#;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 28).unwrap()
    }

    fn client(config: TransportConfig) -> TransportClient {
        let dir = std::env::temp_dir().join(format!(
            "household-dashboard-transport-{}",
            std::process::id()
        ));
        TransportClient::new(config, Cache::new(dir))
    }

    #[test]
    fn test_request_parameters() {
        let client = client(TransportConfig {
            app_id: "test_app_id".to_string(),
            app_key: "test_app_key".to_string(),
            ..Default::default()
        });
        let request = client.request().build().unwrap();
        let url = request.url();

        assert_eq!(url.path(), "/v3/uk/train/station/RYN.json");
        let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(query.contains(&("app_id".to_string(), "test_app_id".to_string())));
        assert!(query.contains(&("app_key".to_string(), "test_app_key".to_string())));
        assert!(query.contains(&("live".to_string(), "true".to_string())));
        assert!(query.contains(&("to_offset".to_string(), "PT10:00:00".to_string())));
        assert!(!query.iter().any(|(key, _)| key == "limit"));
    }

    #[test]
    fn test_request_includes_limit_when_set() {
        let client = client(TransportConfig {
            limit: Some(20),
            ..Default::default()
        });
        let request = client.request().build().unwrap();
        assert!(request.url().query().unwrap().contains("limit=20"));
    }

    #[test]
    fn test_transforms_response() {
        let trains = parse_departures(MOCK_RESPONSE, today()).unwrap();
        assert_eq!(trains.len(), 3);

        assert_eq!(trains[0].from.as_deref(), Some("London Liverpool Street"));
        assert_eq!(trains[0].to.as_deref(), Some("Cambridge"));
        assert_eq!(trains[0].status, TrainStatus::Delayed);
        let time = trains[0].time.unwrap();
        assert_eq!((time.hour(), time.minute()), (8, 30));
        assert_eq!(time.date_naive(), today());
        assert_eq!(trains[0].expected_time.unwrap().minute(), 35);

        assert_eq!(trains[1].status, TrainStatus::OnTime);
        assert_eq!(trains[2].status, TrainStatus::Cancelled);
        assert!(trains[2].expected_time.is_none());
    }

    #[test]
    fn test_status_mapping() {
        for status in ["LATE", "DELAYED"] {
            assert_eq!(map_status(Some(status)), TrainStatus::Delayed);
        }
        for status in ["CANCELLED", "BUS"] {
            assert_eq!(map_status(Some(status)), TrainStatus::Cancelled);
        }
        for status in [
            "ARRIVED",
            "EARLY",
            "NO REPORT",
            "STARTS HERE",
            "ON TIME",
            "OFF ROUTE",
            "REINSTATEMENT",
            "CHANGE OF ORIGIN",
            "CHANGE OF IDENTITY",
        ] {
            assert_eq!(map_status(Some(status)), TrainStatus::OnTime);
        }
        assert_eq!(map_status(None), TrainStatus::OnTime);
        assert_eq!(map_status(Some("TELEPORTED")), TrainStatus::OnTime);
    }

    #[test]
    fn test_malformed_times_become_none() {
        assert!(clock_time_on(Some("0830"), today()).is_none());
        assert!(clock_time_on(Some("25:00"), today()).is_none());
        assert!(clock_time_on(Some("ab:cd"), today()).is_none());
        assert!(clock_time_on(None, today()).is_none());
        assert!(clock_time_on(Some("7:05"), today()).is_some());
    }

    #[test]
    fn test_missing_departures_is_validation_error() {
        let err = parse_departures(r#"{"station_name": "Roydon"}"#, today()).unwrap_err();
        assert!(matches!(err, DashboardError::Validation { provider: "transport", .. }));
    }

    #[tokio::test]
    async fn test_http_error_surfaces_status_text() {
        let base = serve_once("404 Not Found", "").await;
        let client = client(TransportConfig {
            base_url: base,
            ..Default::default()
        });

        let err = client.departures().await.unwrap_err();
        assert_eq!(err.to_string(), "Error fetching data: Not Found");
    }

    #[tokio::test]
    async fn test_live_fetch_decodes_body() {
        let base = serve_once("200 OK", MOCK_RESPONSE).await;
        let client = client(TransportConfig {
            base_url: base,
            ..Default::default()
        });

        let departures = client.departures().await.unwrap();
        assert_eq!(departures.trains.len(), 3);
        assert_eq!(departures.trains[0].status, TrainStatus::Delayed);
    }

    #[tokio::test]
    async fn test_testing_mode_uses_sample() {
        let client = client(TransportConfig {
            testing: true,
            ..Default::default()
        });
        let departures = client.departures().await.unwrap();
        assert_eq!(departures.trains.len(), 5);
        assert_eq!(departures.trains[3].status, TrainStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_cached_trains_short_circuit() {
        let dir = std::env::temp_dir().join(format!(
            "household-dashboard-transport-cache-{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        let cache = Cache::new(&dir);
        let cached = parse_departures(MOCK_RESPONSE, today()).unwrap();
        let written_at = Local::now() - chrono::Duration::minutes(2);
        cache
            .write_at(CACHE_KEY, &cached, CACHE_TTL, written_at)
            .await
            .unwrap();

        // The base URL is unroutable; a cache miss would fail the fetch
        let client = TransportClient::new(
            TransportConfig {
                base_url: "http://127.0.0.1:9".to_string(),
                cache: true,
                ..Default::default()
            },
            cache,
        );
        let departures = client.departures().await.unwrap();
        assert_eq!(departures.trains, cached);
        assert_eq!(departures.queried_at, written_at);
    }
}
