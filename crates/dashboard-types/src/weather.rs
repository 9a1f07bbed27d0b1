//! Typed weather forecast records.
//!
//! Series are column-oriented: every vector in [`HourlyWeather`] and
//! [`DailyWeather`] is indexed by the matching entry of its `time` vector.
//! Missing samples are stored as `f64::NAN`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ops::Range;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentWeather {
    pub time: DateTime<Utc>,
    pub temperature_2m: f64,
    pub apparent_temperature: f64,
    pub wind_speed_10m: f64,
    pub wind_gusts_10m: f64,
    pub wind_direction_10m: f64,
    pub precipitation: f64,
    pub rain: f64,
    pub showers: f64,
    pub snowfall: f64,
    pub cloud_cover: f64,
    pub is_day: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HourlyWeather {
    pub time: Vec<DateTime<Utc>>,
    pub temperature_2m: Vec<f64>,
    pub apparent_temperature: Vec<f64>,
    pub wind_speed_10m: Vec<f64>,
    pub wind_gusts_10m: Vec<f64>,
    pub wind_direction_10m: Vec<f64>,
    pub precipitation: Vec<f64>,
    pub rain: Vec<f64>,
    pub showers: Vec<f64>,
    pub snowfall: Vec<f64>,
    pub cloud_cover: Vec<f64>,
    pub visibility: Vec<f64>,
}

impl HourlyWeather {
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Copy of the samples in `range`, clamped to the series length.
    pub fn slice(&self, range: Range<usize>) -> HourlyWeather {
        let end = range.end.min(self.len());
        let start = range.start.min(end);
        let cut = |series: &Vec<f64>| series.get(start..end).unwrap_or_default().to_vec();

        HourlyWeather {
            time: self.time[start..end].to_vec(),
            temperature_2m: cut(&self.temperature_2m),
            apparent_temperature: cut(&self.apparent_temperature),
            wind_speed_10m: cut(&self.wind_speed_10m),
            wind_gusts_10m: cut(&self.wind_gusts_10m),
            wind_direction_10m: cut(&self.wind_direction_10m),
            precipitation: cut(&self.precipitation),
            rain: cut(&self.rain),
            showers: cut(&self.showers),
            snowfall: cut(&self.snowfall),
            cloud_cover: cut(&self.cloud_cover),
            visibility: cut(&self.visibility),
        }
    }

    /// Split into consecutive 24-sample days. The provider's series start at
    /// local midnight, so each chunk is one calendar day.
    pub fn split_by_day(&self) -> Vec<HourlyWeather> {
        (0..self.len())
            .step_by(24)
            .map(|start| self.slice(start..start + 24))
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyWeather {
    pub time: Vec<DateTime<Utc>>,
    pub sunrise: Vec<DateTime<Utc>>,
    pub sunset: Vec<DateTime<Utc>>,
    pub uv_index_max: Vec<f64>,
    pub uv_index_clear_sky_max: Vec<f64>,
}

/// One forecast response for the configured location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub current: CurrentWeather,
    pub hourly: HourlyWeather,
    pub daily: DailyWeather,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn hourly(hours: usize) -> HourlyWeather {
        let start = Utc.with_ymd_and_hms(2025, 6, 28, 0, 0, 0).unwrap();
        let values: Vec<f64> = (0..hours).map(|h| h as f64).collect();
        HourlyWeather {
            time: (0..hours)
                .map(|h| start + chrono::Duration::hours(h as i64))
                .collect(),
            temperature_2m: values.clone(),
            apparent_temperature: values.clone(),
            wind_speed_10m: values.clone(),
            wind_gusts_10m: values.clone(),
            wind_direction_10m: values.clone(),
            precipitation: values.clone(),
            rain: values.clone(),
            showers: values.clone(),
            snowfall: values.clone(),
            cloud_cover: values.clone(),
            visibility: values,
        }
    }

    #[test]
    fn test_split_by_day() {
        let days = hourly(72).split_by_day();
        assert_eq!(days.len(), 3);
        assert!(days.iter().all(|day| day.len() == 24));
        assert_eq!(days[1].temperature_2m[0], 24.0);
        assert_eq!(days[2].visibility[23], 71.0);
    }

    #[test]
    fn test_split_by_day_keeps_partial_tail() {
        let days = hourly(30).split_by_day();
        assert_eq!(days.len(), 2);
        assert_eq!(days[1].len(), 6);
    }

    #[test]
    fn test_slice_clamps_range() {
        let series = hourly(10);
        assert_eq!(series.slice(8..20).len(), 2);
        assert!(series.slice(12..20).is_empty());
    }
}
