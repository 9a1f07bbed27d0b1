use chrono::{DateTime, Days, Local};
use dashboard_types::{CalendarEvent, EventTime, Household};
use std::fmt;

use super::{clock, short_day, Card};

/// Shown for attendees who are not part of the household
pub const GUEST: &str = "guest";

#[derive(Debug, Clone, PartialEq)]
pub struct EventRow {
    pub summary: String,
    /// Already started
    pub active: bool,
    /// Start, or now for events that are under way
    pub display_date: DateTime<Local>,
    pub time_label: String,
    /// Sorted, distinct household names
    pub attendees: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalendarCard {
    pub now: DateTime<Local>,
    pub events: Vec<EventRow>,
}

impl CalendarCard {
    pub fn new(events: &[CalendarEvent], household: &Household, now: DateTime<Local>) -> Self {
        let mut events: Vec<&CalendarEvent> = events.iter().collect();
        events.sort_by_key(|event| event.start.to_local());

        Self {
            now,
            events: events
                .into_iter()
                .map(|event| event_row(event, household, now))
                .collect(),
        }
    }
}

pub fn event_row(event: &CalendarEvent, household: &Household, now: DateTime<Local>) -> EventRow {
    let start = event.start.to_local();
    EventRow {
        summary: event.summary.clone(),
        active: start <= now,
        display_date: start.max(now),
        time_label: time_label(&event.start, &event.end),
        attendees: attendees(event, household),
    }
}

/// Date range for multi-day events, clock range for timed events, else "All day".
///
/// All-day end dates are exclusive, so a one-day all-day event ends on the
/// following date.
pub fn time_label(start: &EventTime, end: &EventTime) -> String {
    let last_day = match end {
        EventTime::Date(date) => date.checked_sub_days(Days::new(1)).unwrap_or(*date).max(start.date()),
        EventTime::DateTime(dt) => dt.date_naive(),
    };

    if start.date() != last_day {
        return format!("{} - {}", start.date().format("%b %-d"), last_day.format("%b %-d"));
    }
    match (start, end) {
        (EventTime::DateTime(from), EventTime::DateTime(to)) => {
            format!("{}-{}", clock(from), clock(to))
        }
        _ => "All day".to_string(),
    }
}

/// Household members involved in the event; anyone else counts as a guest.
pub fn attendees(event: &CalendarEvent, household: &Household) -> Vec<String> {
    let mut names: Vec<String> = event
        .emails()
        .map(|email| household.identify(email).unwrap_or(GUEST).to_string())
        .collect();
    names.sort();
    names.dedup();
    names
}

impl Card for CalendarCard {
    const TITLE: &'static str = "Calendar";
}

impl fmt::Display for CalendarCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}  {} {}", Self::TITLE, clock(&self.now), short_day(&self.now))?;
        if self.events.is_empty() {
            return writeln!(f, "  Nothing planned");
        }
        for event in &self.events {
            let marker = if event.active { "*" } else { " " };
            write!(
                f,
                " {}{:7} {}  {}",
                marker,
                short_day(&event.display_date),
                event.summary,
                event.time_label
            )?;
            if !event.attendees.is_empty() {
                write!(f, "  [{}]", event.attendees.join(", "))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
