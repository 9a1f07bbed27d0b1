use anyhow::{bail, Context, Result};
use dashboard_types::Household;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_TRANSPORT_URL: &str = "https://transportapi.com";
pub const DEFAULT_WEATHER_URL: &str = "https://api.open-meteo.com";
pub const DEFAULT_CALENDAR_URL: &str = "https://www.googleapis.com";
pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// Directory holding the token and cache files
    pub state_dir: PathBuf,
    /// `None` when no Google client is configured; the calendar card is then disabled
    pub google: Option<GoogleAuthConfig>,
    pub calendar: CalendarConfig,
    pub transport: TransportConfig,
    pub weather: WeatherConfig,
    /// Minutes needed to walk to the station
    pub walk_time_mins: i64,
    pub household: Household,
}

#[derive(Debug, Clone)]
pub struct GoogleAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub auth_url: String,
    pub token_url: String,
}

#[derive(Debug, Clone)]
pub struct CalendarConfig {
    pub base_url: String,
    pub calendar_id: String,
    pub max_results: u32,
    pub poll_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub base_url: String,
    pub app_id: String,
    pub app_key: String,
    /// Station code, e.g. `RYN`
    pub station: String,
    pub live: bool,
    /// ISO-8601 look-ahead window
    pub to_offset: String,
    /// Page size requested from the provider
    pub limit: Option<u32>,
    pub cache: bool,
    /// Serve the built-in sample response instead of calling the provider
    pub testing: bool,
}

#[derive(Debug, Clone)]
pub struct WeatherConfig {
    pub base_url: String,
    pub latitude: f64,
    pub longitude: f64,
    pub poll_interval: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_TRANSPORT_URL.to_string(),
            app_id: String::new(),
            app_key: String::new(),
            station: "RYN".to_string(),
            live: true,
            to_offset: "PT10:00:00".to_string(),
            limit: None,
            cache: false,
            testing: false,
        }
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_WEATHER_URL.to_string(),
            latitude: 51.7718,
            longitude: 0.0403,
            poll_interval: Duration::from_secs(600), // 10 minutes
        }
    }
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_CALENDAR_URL.to_string(),
            calendar_id: "primary".to_string(),
            max_results: 10,
            poll_interval: Duration::from_secs(900), // 15 minutes
        }
    }
}

impl DashboardConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let google = match var("GOOGLE_CLIENT_ID") {
            Some(client_id) => Some(GoogleAuthConfig {
                client_id,
                client_secret: var("GOOGLE_CLIENT_SECRET")
                    .context("GOOGLE_CLIENT_SECRET must be set when GOOGLE_CLIENT_ID is")?,
                redirect_uri: var("GOOGLE_REDIRECT_URI")
                    .unwrap_or_else(|| "http://localhost:5173".to_string()),
                auth_url: GOOGLE_AUTH_URL.to_string(),
                token_url: GOOGLE_TOKEN_URL.to_string(),
            }),
            None => None,
        };

        let calendar_defaults = CalendarConfig::default();
        let calendar = CalendarConfig {
            base_url: var("CALENDAR_API_URL").unwrap_or(calendar_defaults.base_url),
            calendar_id: var("GOOGLE_CALENDAR_ID").unwrap_or(calendar_defaults.calendar_id),
            max_results: parse_var(&var, "CALENDAR_MAX_RESULTS", calendar_defaults.max_results)?,
            poll_interval: Duration::from_secs(parse_var(
                &var,
                "CALENDAR_POLL_INTERVAL_SECS",
                calendar_defaults.poll_interval.as_secs(),
            )?),
        };

        let transport_defaults = TransportConfig::default();
        let testing = parse_flag(&var, "TRANSPORT_TESTING", false)?;
        let (app_id, app_key) = if testing {
            (
                var("TRANSPORT_APP_ID").unwrap_or_default(),
                var("TRANSPORT_APP_KEY").unwrap_or_default(),
            )
        } else {
            (
                var("TRANSPORT_APP_ID").context("TRANSPORT_APP_ID must be set")?,
                var("TRANSPORT_APP_KEY").context("TRANSPORT_APP_KEY must be set")?,
            )
        };
        let transport = TransportConfig {
            base_url: var("TRANSPORT_API_URL").unwrap_or(transport_defaults.base_url),
            app_id,
            app_key,
            station: var("TRANSPORT_STATION").unwrap_or(transport_defaults.station),
            live: parse_flag(&var, "TRANSPORT_LIVE", transport_defaults.live)?,
            to_offset: var("TRANSPORT_TO_OFFSET").unwrap_or(transport_defaults.to_offset),
            limit: var("TRANSPORT_LIMIT")
                .map(|s| s.parse())
                .transpose()
                .context("TRANSPORT_LIMIT must be a valid number")?,
            cache: parse_flag(&var, "TRANSPORT_CACHE", transport_defaults.cache)?,
            testing,
        };

        let weather_defaults = WeatherConfig::default();
        let weather = WeatherConfig {
            base_url: var("WEATHER_API_URL").unwrap_or(weather_defaults.base_url),
            latitude: parse_var(&var, "WEATHER_LATITUDE", weather_defaults.latitude)?,
            longitude: parse_var(&var, "WEATHER_LONGITUDE", weather_defaults.longitude)?,
            poll_interval: Duration::from_secs(parse_var(
                &var,
                "WEATHER_POLL_INTERVAL_SECS",
                weather_defaults.poll_interval.as_secs(),
            )?),
        };

        Ok(Self {
            state_dir: var("DASHBOARD_STATE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".dashboard")),
            google,
            calendar,
            transport,
            weather,
            walk_time_mins: parse_var(&var, "WALK_TIME_MINS", 15)?,
            household: var("HOUSEHOLD_MEMBERS")
                .map(|list| Household::parse(&list))
                .unwrap_or_default(),
        })
    }
}

fn parse_var<T>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(key) {
        Some(value) => value
            .trim()
            .parse()
            .with_context(|| format!("{} must be a valid number", key)),
        None => Ok(default),
    }
}

fn parse_flag(var: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> Result<bool> {
    let Some(value) = var(key) else {
        return Ok(default);
    };
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        other => bail!("{} must be on/off or true/false, got {:?}", key, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_with_transport_credentials() {
        let config = DashboardConfig::from_vars(lookup(&[
            ("TRANSPORT_APP_ID", "id"),
            ("TRANSPORT_APP_KEY", "key"),
        ]))
        .unwrap();

        assert!(config.google.is_none());
        assert_eq!(config.transport.station, "RYN");
        assert_eq!(config.transport.to_offset, "PT10:00:00");
        assert!(config.transport.live);
        assert!(!config.transport.cache);
        assert_eq!(config.weather.poll_interval, Duration::from_secs(600));
        assert_eq!(config.calendar.poll_interval, Duration::from_secs(900));
        assert_eq!(config.walk_time_mins, 15);
        assert_eq!(config.state_dir, PathBuf::from(".dashboard"));
    }

    #[test]
    fn test_missing_transport_credentials_fail() {
        let err = DashboardConfig::from_vars(lookup(&[])).unwrap_err();
        assert!(err.to_string().contains("TRANSPORT_APP_ID"));
    }

    #[test]
    fn test_testing_mode_does_not_need_credentials() {
        let config = DashboardConfig::from_vars(lookup(&[("TRANSPORT_TESTING", "true")])).unwrap();
        assert!(config.transport.testing);
        assert!(config.transport.app_id.is_empty());
    }

    #[test]
    fn test_google_requires_secret() {
        let err = DashboardConfig::from_vars(lookup(&[
            ("TRANSPORT_TESTING", "on"),
            ("GOOGLE_CLIENT_ID", "client"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("GOOGLE_CLIENT_SECRET"));
    }

    #[test]
    fn test_overrides_are_parsed() {
        let config = DashboardConfig::from_vars(lookup(&[
            ("TRANSPORT_TESTING", "on"),
            ("TRANSPORT_CACHE", "on"),
            ("TRANSPORT_LIMIT", "20"),
            ("WEATHER_LATITUDE", "52.2"),
            ("WALK_TIME_MINS", "10"),
            ("HOUSEHOLD_MEMBERS", "Sam=sam"),
            ("GOOGLE_CLIENT_ID", "client"),
            ("GOOGLE_CLIENT_SECRET", "secret"),
        ]))
        .unwrap();

        assert!(config.transport.cache);
        assert_eq!(config.transport.limit, Some(20));
        assert_eq!(config.weather.latitude, 52.2);
        assert_eq!(config.walk_time_mins, 10);
        assert_eq!(config.household.identify("sam@example.com"), Some("Sam"));
        let google = config.google.unwrap();
        assert_eq!(google.redirect_uri, "http://localhost:5173");
    }

    #[test]
    fn test_invalid_number_names_variable() {
        let err = DashboardConfig::from_vars(lookup(&[
            ("TRANSPORT_TESTING", "on"),
            ("WALK_TIME_MINS", "soon"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("WALK_TIME_MINS"));
    }

    #[test]
    fn test_invalid_flag_is_rejected() {
        assert!(DashboardConfig::from_vars(lookup(&[("TRANSPORT_TESTING", "maybe")])).is_err());
    }
}
