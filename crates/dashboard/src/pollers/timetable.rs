//! Fixed daily wake-up timetables.

use chrono::{DateTime, Days, NaiveDate, NaiveTime, TimeZone};
use std::time::Duration;

/// Refresh times used by the trains card: early morning commute slots, then
/// half past every hour until late evening.
pub const DEFAULT_WAKE_UPS: &[(u32, u32)] = &[
    (5, 30),
    (6, 30),
    (6, 45),
    (7, 0),
    (7, 15),
    (7, 30),
    (8, 30),
    (9, 30),
    (10, 30),
    (11, 30),
    (12, 30),
    (13, 30),
    (14, 30),
    (15, 30),
    (16, 30),
    (17, 30),
    (18, 30),
    (19, 30),
    (20, 30),
    (21, 30),
    (22, 30),
    (23, 30),
];

/// Ascending list of times of day at which a refresh should happen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timetable {
    entries: Vec<NaiveTime>,
}

impl Timetable {
    /// Build a timetable from `(hour, minute)` pairs.
    ///
    /// Returns `None` when the list is empty, not sorted, or contains an
    /// invalid time of day.
    pub fn new(entries: &[(u32, u32)]) -> Option<Self> {
        let entries = entries
            .iter()
            .map(|&(hour, minute)| NaiveTime::from_hms_opt(hour, minute, 0))
            .collect::<Option<Vec<_>>>()?;

        if entries.is_empty() || entries.windows(2).any(|pair| pair[0] > pair[1]) {
            return None;
        }
        Some(Self { entries })
    }

    /// Next wake-up strictly after `now`, wrapping to the first entry of the
    /// following day once today's entries are used up.
    pub fn next_wake_up<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> DateTime<Tz> {
        let today = now.date_naive();
        let later_today = self
            .entries
            .iter()
            .filter_map(|time| at(&now.timezone(), today, *time))
            .find(|candidate| candidate > now);

        if let Some(next) = later_today {
            return next;
        }

        // Skip forward until a day where the first entry exists locally
        let mut day = today;
        loop {
            day = day + Days::new(1);
            if let Some(next) = at(&now.timezone(), day, self.entries[0]) {
                return next;
            }
        }
    }

    /// Delay from `now` until [`Timetable::next_wake_up`].
    pub fn next_delay<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Duration {
        let next = self.next_wake_up(now);
        (next - now.clone()).to_std().unwrap_or(Duration::ZERO)
    }
}

impl Default for Timetable {
    fn default() -> Self {
        Self {
            entries: DEFAULT_WAKE_UPS
                .iter()
                .filter_map(|&(hour, minute)| NaiveTime::from_hms_opt(hour, minute, 0))
                .collect(),
        }
    }
}

/// Local instant for `time` on `date`; `None` inside a DST gap.
fn at<Tz: TimeZone>(tz: &Tz, date: NaiveDate, time: NaiveTime) -> Option<DateTime<Tz>> {
    tz.from_local_datetime(&date.and_time(time)).earliest()
}
