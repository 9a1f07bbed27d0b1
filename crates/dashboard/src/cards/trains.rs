use chrono::{DateTime, Local};
use dashboard_types::{Train, TrainDepartures, TrainStatus};
use std::fmt;

use super::{clock, Card};

/// Number of departures listed on the card
const MAX_ROWS: usize = 5;

/// How relaxed the walk to the station can be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    Relaxed,
    Hurry,
    Missed,
}

impl Urgency {
    pub fn from_minutes(minutes_to_leave: i64) -> Self {
        if minutes_to_leave >= 0 {
            Urgency::Relaxed
        } else if minutes_to_leave >= -4 {
            Urgency::Hurry
        } else {
            Urgency::Missed
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Urgency::Relaxed => "relaxed",
            Urgency::Hurry => "hurry",
            Urgency::Missed => "missed",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainRow {
    pub expected: DateTime<Local>,
    pub aimed: DateTime<Local>,
    pub destination: String,
    pub status: TrainStatus,
}

/// Departures still to come plus when to set off for the first one.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainsCard {
    pub rows: Vec<TrainRow>,
    /// Minutes until leaving for the first listed train; negative once late
    pub leave_in: Option<i64>,
    pub queried_at: DateTime<Local>,
}

impl TrainsCard {
    pub fn new(departures: &TrainDepartures, now: DateTime<Local>, walk_time_mins: i64) -> Self {
        let rows = upcoming(&departures.trains, now);
        let leave_in = rows
            .first()
            .map(|row| minutes_to_leave(row.expected, now, walk_time_mins));

        Self {
            rows,
            leave_in,
            queried_at: departures.queried_at,
        }
    }

    pub fn urgency(&self) -> Option<Urgency> {
        self.leave_in.map(Urgency::from_minutes)
    }
}

/// Trains with both times known that leave strictly after `now`, soonest first.
pub fn upcoming(trains: &[Train], now: DateTime<Local>) -> Vec<TrainRow> {
    let mut rows: Vec<TrainRow> = trains
        .iter()
        .filter_map(|train| {
            Some(TrainRow {
                expected: train.expected_time?,
                aimed: train.time?,
                destination: train.to.clone().unwrap_or_default(),
                status: train.status,
            })
        })
        .collect();

    rows.sort_by_key(|row| row.expected);
    rows.retain(|row| row.expected > now);
    rows.truncate(MAX_ROWS);
    rows
}

/// Whole minutes until departure, less the walk, counting the current minute.
pub fn minutes_to_leave(expected: DateTime<Local>, now: DateTime<Local>, walk_time_mins: i64) -> i64 {
    (expected - now).num_seconds().div_euclid(60) - walk_time_mins + 1
}

impl Card for TrainsCard {
    const TITLE: &'static str = "Trains";
}

impl fmt::Display for TrainsCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Self::TITLE)?;
        if let (Some(minutes), Some(urgency)) = (self.leave_in, self.urgency()) {
            let unit = if minutes == 1 { "min" } else { "mins" };
            write!(f, "  leave in {} {} ({})", minutes, unit, urgency.as_str())?;
        }
        writeln!(f)?;

        if self.rows.is_empty() {
            return writeln!(f, "  No departures");
        }
        for row in &self.rows {
            let aimed = if row.aimed != row.expected {
                format!("({})", clock(&row.aimed))
            } else {
                String::new()
            };
            let marker = match row.status {
                TrainStatus::OnTime => String::new(),
                status => format!("  [{}]", status.as_str()),
            };
            writeln!(
                f,
                "  {} {:7} {}{}",
                clock(&row.expected),
                aimed,
                row.destination,
                marker
            )?;
        }
        Ok(())
    }
}
