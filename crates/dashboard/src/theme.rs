//! Day/night theme switching.

use chrono::{DateTime, TimeZone};
use dashboard_types::Theme;

use crate::daylight::sun_times_in;

/// Theme appropriate for `now`: dark from sunset until sunrise.
pub fn theme_at<Tz: TimeZone>(now: &DateTime<Tz>) -> Theme {
    let sun = sun_times_in(now.date_naive(), &now.timezone());
    if *now >= sun.sunset || *now <= sun.sunrise {
        Theme::Dark
    } else {
        Theme::Light
    }
}

/// Owns the dashboard's current theme and re-evaluates it on hour ticks.
#[derive(Debug, Default)]
pub struct ThemeController {
    theme: Theme,
}

impl ThemeController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    /// Re-evaluate the theme, returning the new one when it changed.
    pub fn update<Tz: TimeZone>(&mut self, now: &DateTime<Tz>) -> Option<Theme> {
        let theme = theme_at(now);
        if theme == self.theme {
            return None;
        }
        tracing::info!("Switching theme from {} to {}", self.theme.as_str(), theme.as_str());
        self.theme = theme;
        Some(theme)
    }
}
