//! Weather card: current conditions, short-range indicators and a four day
//! outlook.

use chrono::{DateTime, Duration, Local, Utc};
use dashboard_types::{CurrentWeather, HourlyWeather, WeatherReport};
use std::fmt;

use super::{clock, short_day, Card};

const FORECAST_DAYS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    Snow,
    HeavyRain,
    Rain,
    LightRain,
    Cloudy,
    PartlyCloudy,
    LightWind,
    Wind,
    StrongWind,
    Fog,
}

impl Condition {
    pub fn as_str(&self) -> &str {
        match self {
            Condition::Snow => "snow",
            Condition::HeavyRain => "heavy-rain",
            Condition::Rain => "rain",
            Condition::LightRain => "light-rain",
            Condition::Cloudy => "cloudy",
            Condition::PartlyCloudy => "partly-cloudy",
            Condition::LightWind => "light-wind",
            Condition::Wind => "wind",
            Condition::StrongWind => "strong-wind",
            Condition::Fog => "fog",
        }
    }
}

/// Rain, cloud and wind bands shared by the current and daily classifiers
struct Thresholds {
    heavy_rain: f64,
    rain: f64,
    light_rain: f64,
    cloudy: f64,
    partly_cloudy: f64,
    light_wind: (f64, f64),
    light_gusts: (f64, f64),
    wind: (f64, f64),
    gusts: (f64, f64),
    strong_wind: f64,
    strong_gusts: f64,
}

/// Instantaneous readings, mm and km/h
const CURRENT: Thresholds = Thresholds {
    heavy_rain: 5.0,
    rain: 0.5,
    light_rain: 0.1,
    cloudy: 80.0,
    partly_cloudy: 50.0,
    light_wind: (50.0, 61.0),
    light_gusts: (70.0, 85.0),
    wind: (62.0, 88.0),
    gusts: (85.0, 125.0),
    strong_wind: 89.0,
    strong_gusts: 125.0,
};

/// Daily totals for rain, daily means for everything else
const DAILY: Thresholds = Thresholds {
    heavy_rain: 30.0,
    rain: 2.0,
    light_rain: 1.0,
    cloudy: 80.0,
    partly_cloudy: 65.0,
    light_wind: (20.0, 30.0),
    light_gusts: (30.0, 40.0),
    wind: (30.0, 40.0),
    gusts: (40.0, 50.0),
    strong_wind: 40.0,
    strong_gusts: 50.0,
};

/// Visibility below which a day counts as foggy, metres
const FOG_VISIBILITY: f64 = 1000.0;

fn within(value: f64, (low, high): (f64, f64)) -> bool {
    value > low && value <= high
}

fn classify(
    t: &Thresholds,
    snowfall: f64,
    rain: f64,
    cloud_cover: f64,
    wind_speed: f64,
    wind_gusts: f64,
) -> Vec<Condition> {
    let mut conditions = Vec::new();
    if snowfall > 0.0 {
        conditions.push(Condition::Snow);
    }
    if rain > t.heavy_rain {
        conditions.push(Condition::HeavyRain);
    } else if rain > t.rain {
        conditions.push(Condition::Rain);
    } else if rain > t.light_rain {
        conditions.push(Condition::LightRain);
    }
    if cloud_cover > t.cloudy {
        conditions.push(Condition::Cloudy);
    } else if cloud_cover > t.partly_cloudy {
        conditions.push(Condition::PartlyCloudy);
    }
    if within(wind_speed, t.light_wind) || within(wind_gusts, t.light_gusts) {
        conditions.push(Condition::LightWind);
    }
    if within(wind_speed, t.wind) || within(wind_gusts, t.gusts) {
        conditions.push(Condition::Wind);
    }
    if wind_speed > t.strong_wind || wind_gusts > t.strong_gusts {
        conditions.push(Condition::StrongWind);
    }
    conditions
}

/// Conditions right now
pub fn current_conditions(weather: &CurrentWeather) -> Vec<Condition> {
    classify(
        &CURRENT,
        weather.snowfall,
        weather.precipitation,
        weather.cloud_cover,
        weather.wind_speed_10m,
        weather.wind_gusts_10m,
    )
}

/// Conditions summarising a run of hourly samples, usually one day
pub fn average_conditions(hourly: &HourlyWeather) -> Vec<Condition> {
    let mut conditions = classify(
        &DAILY,
        sum(&hourly.snowfall),
        sum(&hourly.precipitation),
        mean(&hourly.cloud_cover),
        mean(&hourly.wind_speed_10m),
        mean(&hourly.wind_gusts_10m),
    );
    if mean(&hourly.visibility) < FOG_VISIBILITY {
        conditions.push(Condition::Fog);
    }
    conditions
}

fn samples(series: &[f64]) -> impl Iterator<Item = f64> + '_ {
    series.iter().copied().filter(|v| !v.is_nan())
}

fn sum(series: &[f64]) -> f64 {
    samples(series).sum()
}

/// Mean of the known samples; NaN when there are none
fn mean(series: &[f64]) -> f64 {
    let (total, count) = samples(series).fold((0.0, 0usize), |(t, n), v| (t + v, n + 1));
    if count == 0 {
        f64::NAN
    } else {
        total / count as f64
    }
}

fn max(series: &[f64]) -> f64 {
    samples(series).fold(f64::NAN, f64::max)
}

fn min(series: &[f64]) -> f64 {
    samples(series).fold(f64::NAN, f64::min)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Icon {
    Sun,
    Moon,
    Cloudy,
    CloudSun,
    CloudMoon,
    CloudRain,
    CloudDrizzle,
    CloudRainWind,
    CloudSnow,
    SunSnow,
}

impl Icon {
    pub fn as_str(&self) -> &str {
        match self {
            Icon::Sun => "sun",
            Icon::Moon => "moon",
            Icon::Cloudy => "cloudy",
            Icon::CloudSun => "sun and cloud",
            Icon::CloudMoon => "moon and cloud",
            Icon::CloudRain => "rain",
            Icon::CloudDrizzle => "drizzle",
            Icon::CloudRainWind => "wind and rain",
            Icon::CloudSnow => "snow",
            Icon::SunSnow => "sun and snow",
        }
    }
}

pub fn icon_for(conditions: &[Condition], is_day: bool) -> Icon {
    let has = |c| conditions.contains(&c);
    let cloudy = has(Condition::Cloudy) || has(Condition::PartlyCloudy);
    let raining = has(Condition::HeavyRain) || has(Condition::Rain);
    let rainy = raining || has(Condition::LightRain);
    let windy = has(Condition::Wind) || has(Condition::StrongWind);

    if has(Condition::Snow) {
        return if cloudy || !is_day {
            Icon::CloudSnow
        } else {
            Icon::SunSnow
        };
    }
    if windy && cloudy && raining {
        return Icon::CloudRainWind;
    }
    if rainy {
        return if raining {
            Icon::CloudRain
        } else {
            Icon::CloudDrizzle
        };
    }
    if cloudy {
        return match (has(Condition::PartlyCloudy), is_day) {
            (false, _) => Icon::Cloudy,
            (true, true) => Icon::CloudSun,
            (true, false) => Icon::CloudMoon,
        };
    }
    if is_day {
        Icon::Sun
    } else {
        Icon::Moon
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Rising,
    Falling,
    Steady,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    None,
    Low,
    Medium,
    High,
}

impl Level {
    fn from_conditions(conditions: &[Condition], light: Condition, normal: Condition, heavy: Condition) -> Self {
        if conditions.contains(&heavy) {
            Level::High
        } else if conditions.contains(&normal) {
            Level::Medium
        } else if conditions.contains(&light) {
            Level::Low
        } else {
            Level::None
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Level::None => "none",
            Level::Low => "low",
            Level::Medium => "medium",
            Level::High => "high",
        }
    }
}

/// What to expect if heading out within the hour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Indicators {
    pub rain: Level,
    pub wind: Level,
    pub dark: bool,
    pub fog: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActualWeather {
    pub icon: Icon,
    pub temperature: f64,
    pub max_temperature: f64,
    pub min_temperature: f64,
    pub trend: Trend,
    pub indicators: Indicators,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DayForecast {
    pub date: DateTime<Local>,
    pub max_temperature: f64,
    pub min_temperature: f64,
    pub icon: Icon,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeatherCard {
    pub sunrise: Option<DateTime<Local>>,
    pub sunset: Option<DateTime<Local>>,
    pub actual: ActualWeather,
    pub forecast: Vec<DayForecast>,
}

impl WeatherCard {
    pub fn new(report: &WeatherReport, now: DateTime<Local>) -> Self {
        let sunrise = report.daily.sunrise.first().map(|t| t.with_timezone(&Local));
        let sunset = report.daily.sunset.first().map(|t| t.with_timezone(&Local));

        Self {
            sunrise,
            sunset,
            actual: actual_weather(report, now),
            forecast: forecast(&report.hourly),
        }
    }
}

/// Compare the current temperature with the sample an hour earlier.
pub fn temperature_trend(current: &CurrentWeather, hourly: &HourlyWeather) -> Trend {
    let hour_start = current.time - Duration::seconds(current.time.timestamp().rem_euclid(3600));
    let previous_hour: DateTime<Utc> = hour_start - Duration::hours(1);

    let previous = hourly
        .time
        .iter()
        .position(|t| *t == previous_hour)
        .and_then(|i| hourly.temperature_2m.get(i).copied())
        .unwrap_or(current.temperature_2m);

    if current.temperature_2m > previous {
        Trend::Rising
    } else if current.temperature_2m < previous {
        Trend::Falling
    } else {
        Trend::Steady
    }
}

/// Whether it will be dark at some point in the next hour of walking.
pub fn dark_soon(
    now: DateTime<Local>,
    sunrise: Option<DateTime<Local>>,
    sunset: Option<DateTime<Local>>,
) -> bool {
    let (Some(sunrise), Some(sunset)) = (sunrise, sunset) else {
        return false;
    };
    let light_starts = sunrise - Duration::minutes(30);
    let dark_starts = sunset + Duration::minutes(30);
    now < light_starts || now + Duration::minutes(50) > dark_starts
}

pub fn actual_weather(report: &WeatherReport, now: DateTime<Local>) -> ActualWeather {
    let current = &report.current;
    let today = report.hourly.slice(0..24);
    let conditions = current_conditions(current);

    let sunrise = report.daily.sunrise.first().map(|t| t.with_timezone(&Local));
    let sunset = report.daily.sunset.first().map(|t| t.with_timezone(&Local));

    ActualWeather {
        icon: icon_for(&conditions, current.is_day),
        temperature: current.temperature_2m,
        max_temperature: max(&today.temperature_2m),
        min_temperature: min(&today.temperature_2m),
        trend: temperature_trend(current, &report.hourly),
        indicators: Indicators {
            rain: Level::from_conditions(
                &conditions,
                Condition::LightRain,
                Condition::Rain,
                Condition::HeavyRain,
            ),
            wind: Level::from_conditions(
                &conditions,
                Condition::LightWind,
                Condition::Wind,
                Condition::StrongWind,
            ),
            dark: dark_soon(now, sunrise, sunset),
            fog: average_conditions(&today).contains(&Condition::Fog),
        },
    }
}

/// One entry per complete day of hourly samples, at most four.
pub fn forecast(hourly: &HourlyWeather) -> Vec<DayForecast> {
    hourly
        .split_by_day()
        .into_iter()
        .filter(|day| day.len() == 24)
        .take(FORECAST_DAYS)
        .map(|day| DayForecast {
            date: day.time[0].with_timezone(&Local),
            max_temperature: max(&day.temperature_2m),
            min_temperature: min(&day.temperature_2m),
            icon: icon_for(&average_conditions(&day), true),
        })
        .collect()
}

fn degrees(value: f64) -> String {
    if value.is_nan() {
        "--".to_string()
    } else {
        format!("{}", value.round() as i64)
    }
}

impl Card for WeatherCard {
    const TITLE: &'static str = "Weather";
}

impl fmt::Display for WeatherCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Self::TITLE)?;
        if let (Some(sunrise), Some(sunset)) = (&self.sunrise, &self.sunset) {
            write!(f, "  sunrise {}  sunset {}", clock(sunrise), clock(sunset))?;
        }
        writeln!(f)?;

        let actual = &self.actual;
        let arrow = match actual.trend {
            Trend::Rising => "↑",
            Trend::Falling => "↓",
            Trend::Steady => "→",
        };
        writeln!(
            f,
            "  {} {}°C {} (high {} / low {})",
            actual.icon.as_str(),
            degrees(actual.temperature),
            arrow,
            degrees(actual.max_temperature),
            degrees(actual.min_temperature)
        )?;

        let yes_no = |flag: bool| if flag { "yes" } else { "no" };
        writeln!(
            f,
            "  rain: {}  wind: {}  dark: {}  fog: {}",
            actual.indicators.rain.as_str(),
            actual.indicators.wind.as_str(),
            yes_no(actual.indicators.dark),
            yes_no(actual.indicators.fog)
        )?;

        let days: Vec<String> = self
            .forecast
            .iter()
            .map(|day| {
                format!(
                    "{} {} {}°/{}°",
                    short_day(&day.date),
                    day.icon.as_str(),
                    degrees(day.max_temperature),
                    degrees(day.min_temperature)
                )
            })
            .collect();
        if !days.is_empty() {
            writeln!(f, "  {}", days.join(" | "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use dashboard_types::DailyWeather;

    fn current(precipitation: f64, cloud_cover: f64, wind: f64, gusts: f64) -> CurrentWeather {
        CurrentWeather {
            time: Utc.with_ymd_and_hms(2025, 6, 28, 10, 15, 0).unwrap(),
            temperature_2m: 18.0,
            apparent_temperature: 17.0,
            wind_speed_10m: wind,
            wind_gusts_10m: gusts,
            wind_direction_10m: 200.0,
            precipitation,
            rain: precipitation,
            showers: 0.0,
            snowfall: 0.0,
            cloud_cover,
            is_day: true,
        }
    }

    fn hourly(days: usize, temperature: impl Fn(usize) -> f64) -> HourlyWeather {
        let start = Utc.with_ymd_and_hms(2025, 6, 28, 0, 0, 0).unwrap();
        let n = days * 24;
        let flat = |v: f64| vec![v; n];
        HourlyWeather {
            time: (0..n).map(|h| start + Duration::hours(h as i64)).collect(),
            temperature_2m: (0..n).map(temperature).collect(),
            apparent_temperature: flat(15.0),
            wind_speed_10m: flat(10.0),
            wind_gusts_10m: flat(20.0),
            wind_direction_10m: flat(200.0),
            precipitation: flat(0.0),
            rain: flat(0.0),
            showers: flat(0.0),
            snowfall: flat(0.0),
            cloud_cover: flat(10.0),
            visibility: flat(20000.0),
        }
    }

    #[test]
    fn test_current_rain_bands() {
        assert!(current_conditions(&current(0.1, 0.0, 0.0, 0.0)).is_empty());
        assert_eq!(current_conditions(&current(0.3, 0.0, 0.0, 0.0)), vec![Condition::LightRain]);
        assert_eq!(current_conditions(&current(0.5, 0.0, 0.0, 0.0)), vec![Condition::LightRain]);
        assert_eq!(current_conditions(&current(3.0, 0.0, 0.0, 0.0)), vec![Condition::Rain]);
        assert_eq!(current_conditions(&current(5.1, 0.0, 0.0, 0.0)), vec![Condition::HeavyRain]);
    }

    #[test]
    fn test_current_cloud_and_wind_bands() {
        assert_eq!(current_conditions(&current(0.0, 60.0, 0.0, 0.0)), vec![Condition::PartlyCloudy]);
        assert_eq!(current_conditions(&current(0.0, 90.0, 0.0, 0.0)), vec![Condition::Cloudy]);
        assert_eq!(current_conditions(&current(0.0, 0.0, 55.0, 0.0)), vec![Condition::LightWind]);
        assert_eq!(current_conditions(&current(0.0, 0.0, 0.0, 100.0)), vec![Condition::Wind]);
        assert_eq!(current_conditions(&current(0.0, 0.0, 95.0, 0.0)), vec![Condition::StrongWind]);
    }

    #[test]
    fn test_average_conditions() {
        let mut day = hourly(1, |_| 15.0);
        day.precipitation = vec![0.1; 24];
        day.visibility = vec![500.0; 24];
        day.wind_speed_10m[0] = f64::NAN;
        day.cloud_cover = vec![70.0; 24];

        let conditions = average_conditions(&day);
        assert!(conditions.contains(&Condition::Rain));
        assert!(conditions.contains(&Condition::PartlyCloudy));
        assert!(conditions.contains(&Condition::Fog));
        assert!(!conditions.contains(&Condition::LightWind));
    }

    #[test]
    fn test_icon_selection() {
        use Condition::*;
        assert_eq!(icon_for(&[Snow], true), Icon::SunSnow);
        assert_eq!(icon_for(&[Snow], false), Icon::CloudSnow);
        assert_eq!(icon_for(&[Snow, Cloudy], true), Icon::CloudSnow);
        assert_eq!(icon_for(&[Rain, Cloudy, Wind], true), Icon::CloudRainWind);
        assert_eq!(icon_for(&[LightRain, Cloudy, Wind], true), Icon::CloudDrizzle);
        assert_eq!(icon_for(&[HeavyRain], true), Icon::CloudRain);
        assert_eq!(icon_for(&[Cloudy], true), Icon::Cloudy);
        assert_eq!(icon_for(&[PartlyCloudy], true), Icon::CloudSun);
        assert_eq!(icon_for(&[PartlyCloudy], false), Icon::CloudMoon);
        assert_eq!(icon_for(&[], true), Icon::Sun);
        assert_eq!(icon_for(&[LightWind], false), Icon::Moon);
    }

    #[test]
    fn test_indicator_levels() {
        let heavy = current_conditions(&current(6.0, 0.0, 95.0, 0.0));
        let rain = Level::from_conditions(&heavy, Condition::LightRain, Condition::Rain, Condition::HeavyRain);
        let wind = Level::from_conditions(&heavy, Condition::LightWind, Condition::Wind, Condition::StrongWind);
        assert_eq!(rain, Level::High);
        assert_eq!(wind, Level::High);

        let light = current_conditions(&current(0.3, 0.0, 55.0, 0.0));
        let rain = Level::from_conditions(&light, Condition::LightRain, Condition::Rain, Condition::HeavyRain);
        assert_eq!(rain, Level::Low);
    }

    #[test]
    fn test_trend_against_previous_hour() {
        // current reading at 10:15, previous hour sample is 09:00
        let series = hourly(1, |h| if h == 9 { 20.0 } else { 10.0 });
        assert_eq!(temperature_trend(&current(0.0, 0.0, 0.0, 0.0), &series), Trend::Falling);

        let series = hourly(1, |h| if h == 9 { 15.0 } else { 30.0 });
        assert_eq!(temperature_trend(&current(0.0, 0.0, 0.0, 0.0), &series), Trend::Rising);

        let series = hourly(0, |_| 0.0);
        assert_eq!(temperature_trend(&current(0.0, 0.0, 0.0, 0.0), &series), Trend::Steady);
    }

    #[test]
    fn test_dark_soon() {
        let at = |h, m| Local.with_ymd_and_hms(2025, 6, 28, h, m, 0).unwrap();
        let sunrise = Some(at(5, 0));
        let sunset = Some(at(21, 0));

        assert!(dark_soon(at(4, 20), sunrise, sunset));
        assert!(!dark_soon(at(4, 31), sunrise, sunset));
        assert!(!dark_soon(at(12, 0), sunrise, sunset));
        assert!(!dark_soon(at(20, 40), sunrise, sunset));
        assert!(dark_soon(at(20, 41), sunrise, sunset));
        assert!(!dark_soon(at(23, 0), None, sunset));
    }

    #[test]
    fn test_forecast_uses_full_days() {
        let mut series = hourly(5, |h| (h % 24) as f64);
        series = series.slice(0..110);
        let days = forecast(&series);

        assert_eq!(days.len(), 4);
        assert_eq!(days[0].max_temperature, 23.0);
        assert_eq!(days[0].min_temperature, 0.0);
        assert_eq!(days[0].icon, Icon::Sun);

        let short = hourly(1, |_| 1.0).slice(0..20);
        assert!(forecast(&short).is_empty());
    }

    #[test]
    fn test_card_from_report() {
        let report = WeatherReport {
            current: current(0.0, 10.0, 5.0, 10.0),
            hourly: hourly(2, |h| h as f64),
            daily: DailyWeather {
                time: vec![Utc.with_ymd_and_hms(2025, 6, 28, 0, 0, 0).unwrap()],
                sunrise: vec![Utc.with_ymd_and_hms(2025, 6, 28, 3, 43, 0).unwrap()],
                sunset: vec![Utc.with_ymd_and_hms(2025, 6, 28, 20, 20, 0).unwrap()],
                uv_index_max: vec![6.0],
                uv_index_clear_sky_max: vec![7.0],
            },
        };
        let now = Utc.with_ymd_and_hms(2025, 6, 28, 10, 20, 0).unwrap().with_timezone(&Local);
        let card = WeatherCard::new(&report, now);

        assert_eq!(card.actual.icon, Icon::Sun);
        assert_eq!(card.actual.max_temperature, 23.0);
        assert_eq!(card.actual.min_temperature, 0.0);
        assert_eq!(card.actual.trend, Trend::Rising);
        assert!(!card.actual.indicators.dark);
        assert_eq!(card.forecast.len(), 2);

        let text = card.to_string();
        assert!(text.starts_with("Weather  sunrise "));
        assert!(text.contains("sun 18°C ↑ (high 23 / low 0)"));
        assert!(text.contains("rain: none  wind: none  dark: no  fog: no"));
    }
}
