//! Forecast client for the Open-Meteo API.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashboard_types::{CurrentWeather, DailyWeather, HourlyWeather, WeatherReport};
use serde::Deserialize;

use super::{decode_json, send_checked, Provider};
use crate::config::WeatherConfig;
use crate::error::{DashboardError, DashboardResult};

const PROVIDER: &str = "weather";

const CURRENT_VARIABLES: &str = "temperature_2m,apparent_temperature,wind_speed_10m,wind_gusts_10m,\
precipitation,rain,showers,snowfall,cloud_cover,wind_direction_10m,is_day";
const HOURLY_VARIABLES: &str = "temperature_2m,apparent_temperature,wind_speed_10m,wind_gusts_10m,\
wind_direction_10m,precipitation,rain,showers,snowfall,cloud_cover,visibility";
const DAILY_VARIABLES: &str = "sunrise,sunset,uv_index_max,uv_index_clear_sky_max";

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current: CurrentBlock,
    hourly: HourlyBlock,
    daily: DailyBlock,
}

#[derive(Debug, Deserialize)]
struct CurrentBlock {
    time: i64,
    temperature_2m: Option<f64>,
    apparent_temperature: Option<f64>,
    wind_speed_10m: Option<f64>,
    wind_gusts_10m: Option<f64>,
    wind_direction_10m: Option<f64>,
    precipitation: Option<f64>,
    rain: Option<f64>,
    showers: Option<f64>,
    snowfall: Option<f64>,
    cloud_cover: Option<f64>,
    is_day: Option<f64>,
}

type Series = Vec<Option<f64>>;

#[derive(Debug, Deserialize)]
struct HourlyBlock {
    time: Vec<i64>,
    temperature_2m: Series,
    apparent_temperature: Series,
    wind_speed_10m: Series,
    wind_gusts_10m: Series,
    wind_direction_10m: Series,
    precipitation: Series,
    rain: Series,
    showers: Series,
    snowfall: Series,
    cloud_cover: Series,
    visibility: Series,
}

#[derive(Debug, Deserialize)]
struct DailyBlock {
    time: Vec<i64>,
    sunrise: Vec<i64>,
    sunset: Vec<i64>,
    uv_index_max: Series,
    uv_index_clear_sky_max: Series,
}

fn timestamp(secs: i64) -> DashboardResult<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| DashboardError::validation(PROVIDER, format!("invalid timestamp {}", secs)))
}

fn timestamps(series: &[i64]) -> DashboardResult<Vec<DateTime<Utc>>> {
    series.iter().map(|&secs| timestamp(secs)).collect()
}

fn value(sample: Option<f64>) -> f64 {
    sample.unwrap_or(f64::NAN)
}

/// Check that `series` lines up with its time axis and fill gaps with NaN.
fn samples(name: &str, series: Series, expected: usize) -> DashboardResult<Vec<f64>> {
    if series.len() != expected {
        return Err(DashboardError::validation(
            PROVIDER,
            format!("{} has {} samples, expected {}", name, series.len(), expected),
        ));
    }
    Ok(series.into_iter().map(value).collect())
}

fn same_length(name: &str, len: usize, expected: usize) -> DashboardResult<()> {
    if len != expected {
        return Err(DashboardError::validation(
            PROVIDER,
            format!("{} has {} samples, expected {}", name, len, expected),
        ));
    }
    Ok(())
}

impl ForecastResponse {
    fn into_report(self) -> DashboardResult<WeatherReport> {
        let c = self.current;
        let current = CurrentWeather {
            time: timestamp(c.time)?,
            temperature_2m: value(c.temperature_2m),
            apparent_temperature: value(c.apparent_temperature),
            wind_speed_10m: value(c.wind_speed_10m),
            wind_gusts_10m: value(c.wind_gusts_10m),
            wind_direction_10m: value(c.wind_direction_10m),
            precipitation: value(c.precipitation),
            rain: value(c.rain),
            showers: value(c.showers),
            snowfall: value(c.snowfall),
            cloud_cover: value(c.cloud_cover),
            is_day: c.is_day == Some(1.0),
        };

        let h = self.hourly;
        let n = h.time.len();
        let hourly = HourlyWeather {
            time: timestamps(&h.time)?,
            temperature_2m: samples("hourly.temperature_2m", h.temperature_2m, n)?,
            apparent_temperature: samples("hourly.apparent_temperature", h.apparent_temperature, n)?,
            wind_speed_10m: samples("hourly.wind_speed_10m", h.wind_speed_10m, n)?,
            wind_gusts_10m: samples("hourly.wind_gusts_10m", h.wind_gusts_10m, n)?,
            wind_direction_10m: samples("hourly.wind_direction_10m", h.wind_direction_10m, n)?,
            precipitation: samples("hourly.precipitation", h.precipitation, n)?,
            rain: samples("hourly.rain", h.rain, n)?,
            showers: samples("hourly.showers", h.showers, n)?,
            snowfall: samples("hourly.snowfall", h.snowfall, n)?,
            cloud_cover: samples("hourly.cloud_cover", h.cloud_cover, n)?,
            visibility: samples("hourly.visibility", h.visibility, n)?,
        };

        let d = self.daily;
        let n = d.time.len();
        same_length("daily.sunrise", d.sunrise.len(), n)?;
        same_length("daily.sunset", d.sunset.len(), n)?;
        let daily = DailyWeather {
            time: timestamps(&d.time)?,
            sunrise: timestamps(&d.sunrise)?,
            sunset: timestamps(&d.sunset)?,
            uv_index_max: samples("daily.uv_index_max", d.uv_index_max, n)?,
            uv_index_clear_sky_max: samples("daily.uv_index_clear_sky_max", d.uv_index_clear_sky_max, n)?,
        };

        Ok(WeatherReport {
            current,
            hourly,
            daily,
        })
    }
}

/// Validate a forecast body into a [`WeatherReport`].
pub fn parse_forecast(body: &str) -> DashboardResult<WeatherReport> {
    let response: ForecastResponse =
        serde_json::from_str(body).map_err(|e| DashboardError::validation(PROVIDER, e.to_string()))?;
    response.into_report()
}

pub struct WeatherClient {
    config: WeatherConfig,
    client: reqwest::Client,
}

impl WeatherClient {
    pub fn new(config: WeatherConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn request(&self) -> reqwest::RequestBuilder {
        let url = format!("{}/v1/forecast", self.config.base_url.trim_end_matches('/'));
        self.client.get(url).query(&[
            ("latitude", self.config.latitude.to_string()),
            ("longitude", self.config.longitude.to_string()),
            ("current", CURRENT_VARIABLES.to_string()),
            ("hourly", HOURLY_VARIABLES.to_string()),
            ("daily", DAILY_VARIABLES.to_string()),
            ("timezone", "auto".to_string()),
            ("timeformat", "unixtime".to_string()),
        ])
    }

    pub async fn forecast(&self) -> DashboardResult<WeatherReport> {
        tracing::debug!(
            "Fetching forecast for {}, {}",
            self.config.latitude,
            self.config.longitude
        );
        let response = send_checked(self.request()).await?;
        let response: ForecastResponse = decode_json(PROVIDER, response).await?;
        let report = response.into_report()?;
        tracing::info!(
            "Fetched forecast with {} hourly samples, current {:.1}°C",
            report.hourly.len(),
            report.current.temperature_2m
        );
        Ok(report)
    }
}

#[async_trait]
impl Provider for WeatherClient {
    type Output = WeatherReport;

    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn fetch(&self) -> DashboardResult<WeatherReport> {
        self.forecast().await
    }
}
