use chrono::{DateTime, Local, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};

pub mod weather;

pub use weather::{CurrentWeather, DailyWeather, HourlyWeather, WeatherReport};

// ============================================================================
// Trains
// ============================================================================

/// Departure status as shown on the trains card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrainStatus {
    #[serde(rename = "On Time")]
    OnTime,
    Delayed,
    Cancelled,
}

impl TrainStatus {
    pub fn as_str(&self) -> &str {
        match self {
            TrainStatus::OnTime => "On Time",
            TrainStatus::Delayed => "Delayed",
            TrainStatus::Cancelled => "Cancelled",
        }
    }
}

/// A single departure from the home station.
///
/// Times are today's local instants built from the provider's "HH:MM"
/// strings; either may be missing when the provider has no estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Train {
    pub time: Option<DateTime<Local>>,
    pub expected_time: Option<DateTime<Local>>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub status: TrainStatus,
}

/// Result of one transit query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainDepartures {
    pub trains: Vec<Train>,
    pub queried_at: DateTime<Local>,
}

// ============================================================================
// Calendar
// ============================================================================

/// Start or end of a calendar event: all-day events only carry a date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventTime {
    Date(NaiveDate),
    DateTime(DateTime<Local>),
}

impl EventTime {
    pub fn is_all_day(&self) -> bool {
        matches!(self, EventTime::Date(_))
    }

    /// Local calendar date of this boundary
    pub fn date(&self) -> NaiveDate {
        match self {
            EventTime::Date(date) => *date,
            EventTime::DateTime(dt) => dt.date_naive(),
        }
    }

    /// Instant of this boundary; all-day boundaries start at local midnight.
    pub fn to_local(&self) -> DateTime<Local> {
        match self {
            EventTime::DateTime(dt) => *dt,
            EventTime::Date(date) => {
                let midnight = date.and_hms_opt(0, 0, 0).unwrap_or_default();
                Local
                    .from_local_datetime(&midnight)
                    .earliest()
                    .unwrap_or_else(|| Local.from_utc_datetime(&midnight))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub summary: String,
    pub creator: Option<String>,
    pub organizer: Option<String>,
    pub attendees: Vec<String>,
    pub start: EventTime,
    pub end: EventTime,
    pub location: Option<String>,
}

impl CalendarEvent {
    /// Every email address attached to the event, creator first
    pub fn emails(&self) -> impl Iterator<Item = &str> {
        self.creator
            .iter()
            .chain(self.organizer.iter())
            .chain(self.attendees.iter())
            .map(String::as_str)
    }
}

// ============================================================================
// Household
// ============================================================================

/// A person living in the household and the email local-parts they use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub name: String,
    pub aliases: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Household {
    pub members: Vec<Member>,
}

impl Household {
    /// Parse `Name=alias1,alias2;Other=alias3`.
    ///
    /// Entries without a name or without aliases are skipped.
    pub fn parse(list: &str) -> Self {
        let members = list
            .split(';')
            .filter_map(|entry| {
                let (name, aliases) = entry.split_once('=')?;
                let name = name.trim();
                let aliases: Vec<String> = aliases
                    .split(',')
                    .map(|alias| alias.trim().to_lowercase())
                    .filter(|alias| !alias.is_empty())
                    .collect();
                if name.is_empty() || aliases.is_empty() {
                    return None;
                }
                Some(Member {
                    name: name.to_string(),
                    aliases,
                })
            })
            .collect();

        Self { members }
    }

    /// Name of the member owning `email`, matched on the part before `@`.
    pub fn identify(&self, email: &str) -> Option<&str> {
        let local_part = email.split('@').next()?.to_lowercase();
        self.members
            .iter()
            .find(|member| member.aliases.iter().any(|alias| *alias == local_part))
            .map(|member| member.name.as_str())
    }
}

// ============================================================================
// Theme
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}
