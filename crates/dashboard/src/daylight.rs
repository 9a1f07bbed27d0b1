//! Approximate sunrise and sunset times.
//!
//! Day length follows a sinusoid over the year, peaking near the June
//! solstice. Sunrise and sunset sit symmetrically around 12:00 UTC, which is
//! close enough for choosing a light or dark theme at mid latitudes.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone};
use std::f64::consts::PI;

/// Hours by which the longest and shortest days differ from twelve
const DAY_LENGTH_AMPLITUDE: f64 = 4.06;

#[derive(Debug, Clone)]
pub struct SunTimes<Tz: TimeZone> {
    pub sunrise: DateTime<Tz>,
    pub sunset: DateTime<Tz>,
}

/// 1-based day of the year
pub fn day_of_year(date: NaiveDate) -> u32 {
    date.ordinal()
}

/// Estimated hours of daylight on `date`
pub fn day_length_hours(date: NaiveDate) -> f64 {
    let day = day_of_year(date) as f64;
    12.0 + DAY_LENGTH_AMPLITUDE * (PI * (day - 80.0) / 182.5).sin()
}

/// Sun times for `date`, expressed in `tz`.
pub fn sun_times_in<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> SunTimes<Tz> {
    let half = day_length_hours(date) / 2.0;
    let hours = half.floor();
    let minutes = ((half - hours) * 60.0).floor();
    let offset = Duration::hours(hours as i64) + Duration::minutes(minutes as i64);

    let noon = tz.from_utc_datetime(&date.and_time(NaiveTime::default())) + Duration::hours(12);

    SunTimes {
        sunrise: noon.clone() - offset,
        sunset: noon + offset,
    }
}
