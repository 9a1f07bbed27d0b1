//! Text renderings of the dashboard cards.
//!
//! Each card is a plain view model built from fetched data and the current
//! minute tick, with a `Display` impl that lays it out for the terminal.

pub mod calendar;
pub mod trains;
pub mod weather;

use chrono::{DateTime, TimeZone};
use std::fmt;

use crate::pollers::PollState;

pub use calendar::CalendarCard;
pub use trains::TrainsCard;
pub use weather::WeatherCard;

/// A renderable card with a fixed heading
pub trait Card: fmt::Display {
    const TITLE: &'static str;
}

/// What a card shows for the current poll state
#[derive(Debug, Clone, PartialEq)]
pub enum CardView<V> {
    Loading,
    Failed(String),
    Ready(V),
}

impl<V> CardView<V> {
    /// Build the view from a poll state.
    ///
    /// Data that is present is always shown, even when the latest poll
    /// failed; the error placeholder only appears while nothing was ever
    /// fetched.
    pub fn from_state<T>(state: &PollState<T>, build: impl FnOnce(&T) -> V) -> Self {
        match (&state.data, &state.last_error) {
            (Some(data), _) => CardView::Ready(build(data)),
            (None, Some(error)) if !state.loading => CardView::Failed(error.clone()),
            (None, _) => CardView::Loading,
        }
    }
}

impl<V: Card> fmt::Display for CardView<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CardView::Loading => writeln!(f, "{}\n  Loading...", V::TITLE),
            CardView::Failed(message) => writeln!(f, "{}\n  Failed to load: {}", V::TITLE, message),
            CardView::Ready(card) => write!(f, "{}", card),
        }
    }
}

/// 24-hour `HH:MM`
pub fn clock<Tz: TimeZone>(time: &DateTime<Tz>) -> String
where
    Tz::Offset: fmt::Display,
{
    time.format("%H:%M").to_string()
}

/// Short weekday and day of month, e.g. `Sat 28`
pub fn short_day<Tz: TimeZone>(time: &DateTime<Tz>) -> String
where
    Tz::Offset: fmt::Display,
{
    time.format("%a %-d").to_string()
}
