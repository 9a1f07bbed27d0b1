//! Upcoming events from the household's Google calendar.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Local, NaiveDate, SecondsFormat, Utc};
use dashboard_types::{CalendarEvent, EventTime};
use serde::Deserialize;

use super::{decode_json, send_checked, Authenticator, Provider};
use crate::config::CalendarConfig;
use crate::error::{DashboardError, DashboardResult};

const PROVIDER: &str = "calendar";

#[derive(Debug, Deserialize)]
struct EventsResponse {
    #[serde(default)]
    items: Vec<EventItem>,
}

#[derive(Debug, Deserialize)]
struct EventItem {
    id: String,
    #[serde(default)]
    summary: Option<String>,
    creator: Option<Person>,
    organizer: Option<Person>,
    #[serde(default)]
    attendees: Vec<Person>,
    start: Option<Boundary>,
    end: Option<Boundary>,
    location: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Person {
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Boundary {
    date: Option<NaiveDate>,
    date_time: Option<DateTime<FixedOffset>>,
}

impl Boundary {
    fn into_event_time(self) -> Option<EventTime> {
        match (self.date_time, self.date) {
            (Some(dt), _) => Some(EventTime::DateTime(dt.with_timezone(&Local))),
            (None, Some(date)) => Some(EventTime::Date(date)),
            (None, None) => None,
        }
    }
}

impl EventsResponse {
    fn into_events(self) -> DashboardResult<Vec<CalendarEvent>> {
        self.items.into_iter().map(EventItem::into_event).collect()
    }
}

impl EventItem {
    fn into_event(self) -> DashboardResult<CalendarEvent> {
        let missing = |field: &str| {
            DashboardError::validation(PROVIDER, format!("event {} has no {}", self.id, field))
        };
        let start = self
            .start
            .and_then(Boundary::into_event_time)
            .ok_or_else(|| missing("start"))?;
        let end = self
            .end
            .and_then(Boundary::into_event_time)
            .ok_or_else(|| missing("end"))?;

        Ok(CalendarEvent {
            id: self.id,
            summary: self.summary.unwrap_or_default(),
            creator: self.creator.and_then(|p| p.email),
            organizer: self.organizer.and_then(|p| p.email),
            attendees: self.attendees.into_iter().filter_map(|p| p.email).collect(),
            start,
            end,
            location: self.location,
        })
    }
}

/// Validate an events listing into calendar events.
pub fn parse_events(body: &str) -> DashboardResult<Vec<CalendarEvent>> {
    let response: EventsResponse =
        serde_json::from_str(body).map_err(|e| DashboardError::validation(PROVIDER, e.to_string()))?;
    response.into_events()
}

pub struct CalendarClient {
    config: CalendarConfig,
    client: reqwest::Client,
    auth: Authenticator,
}

impl CalendarClient {
    pub fn new(config: CalendarConfig, auth: Authenticator) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            auth,
        }
    }

    fn request(&self, access_token: &str, now: DateTime<Utc>) -> reqwest::RequestBuilder {
        let url = format!(
            "{}/calendar/v3/calendars/{}/events",
            self.config.base_url.trim_end_matches('/'),
            urlencoding::encode(&self.config.calendar_id)
        );
        self.client
            .get(url)
            .bearer_auth(access_token)
            .query(&[
                ("timeMin", now.to_rfc3339_opts(SecondsFormat::Secs, true)),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
                ("maxResults", self.config.max_results.to_string()),
            ])
    }

    /// Upcoming events, soonest first.
    pub async fn events(&self) -> DashboardResult<Vec<CalendarEvent>> {
        let access_token = self.auth.access_token().await?;
        let response = send_checked(self.request(&access_token, Utc::now())).await?;
        let response: EventsResponse = decode_json(PROVIDER, response).await?;
        let events = response.into_events()?;
        tracing::info!("Fetched {} calendar events", events.len());
        Ok(events)
    }
}

#[async_trait]
impl Provider for CalendarClient {
    type Output = Vec<CalendarEvent>;

    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn fetch(&self) -> DashboardResult<Vec<CalendarEvent>> {
        self.events().await
    }
}
