//! Top-level wiring: pollers, ticker and theme, rendered once a minute.

use chrono::{DateTime, Local};
use dashboard_types::{CalendarEvent, Theme, TrainDepartures, WeatherReport};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::Cache;
use crate::cards::{CalendarCard, CardView, TrainsCard, WeatherCard};
use crate::clients::{Authenticator, CalendarClient, Provider, Token, TransportClient, WeatherClient};
use crate::config::DashboardConfig;
use crate::pollers::{every, on_timetable, Poller, Timetable};
use crate::theme::ThemeController;
use crate::ticker::Ticker;

/// Spawn a poller that fetches from `provider`.
pub fn poll_provider<P, I>(provider: Arc<P>, interval: I, immediate: bool) -> Poller<P::Output>
where
    P: Provider + 'static,
    P::Output: Clone + Sync + 'static,
    I: Fn(DateTime<Local>) -> Option<Duration> + Send + 'static,
{
    let name = provider.name();
    Poller::spawn(
        name,
        move || {
            let provider = provider.clone();
            async move { provider.fetch().await }
        },
        interval,
        immediate,
    )
}

pub struct Dashboard {
    config: DashboardConfig,
    trains: Poller<TrainDepartures>,
    weather: Poller<WeatherReport>,
    calendar: Option<Poller<Vec<CalendarEvent>>>,
    token_refresh: Option<Poller<Token>>,
    auth: Option<Authenticator>,
    ticker: Ticker,
    theme: ThemeController,
}

impl Dashboard {
    /// Start every background task.
    ///
    /// Without a Google client the calendar card is left out. A token found
    /// on disk is refreshed straight away; otherwise the refresh poller keeps
    /// checking for a sign-in made with `dashboard-cli`.
    pub async fn start(config: DashboardConfig) -> Self {
        let cache = Cache::new(config.state_dir.join("cache"));

        let trains = poll_provider(
            Arc::new(TransportClient::new(config.transport.clone(), cache)),
            on_timetable(Timetable::default()),
            true,
        );
        let weather = poll_provider(
            Arc::new(WeatherClient::new(config.weather.clone())),
            every(config.weather.poll_interval),
            true,
        );

        let (calendar, token_refresh, auth) = match &config.google {
            Some(google) => {
                let auth = Authenticator::load(google.clone(), &config.state_dir).await;
                let signed_in = auth.is_signed_in();
                if !signed_in {
                    tracing::warn!("Not signed in to Google, visit {} and run dashboard-cli sign-in", auth.auth_url());
                }

                let refresher = auth.clone();
                let refresh = Poller::spawn(
                    "token refresh",
                    move || {
                        let auth = refresher.clone();
                        async move { auth.refresh().await }
                    },
                    auth.refresh_interval(),
                    signed_in,
                );

                let calendar = poll_provider(
                    Arc::new(CalendarClient::new(config.calendar.clone(), auth.clone())),
                    every(config.calendar.poll_interval),
                    true,
                );
                (Some(calendar), Some(refresh), Some(auth))
            }
            None => {
                tracing::info!("GOOGLE_CLIENT_ID not set, calendar card disabled");
                (None, None, None)
            }
        };

        let mut theme = ThemeController::new();
        theme.update(&Local::now());

        tracing::info!("Dashboard started");
        Self {
            config,
            trains,
            weather,
            calendar,
            token_refresh,
            auth,
            ticker: Ticker::spawn(),
            theme,
        }
    }

    pub fn theme(&self) -> Theme {
        self.theme.theme()
    }

    /// Lay out every card as of `now`.
    pub fn render(&self, now: DateTime<Local>) -> String {
        let mut out = format!("[{} theme]\n\n", self.theme.theme().as_str());

        let trains = CardView::from_state(&self.trains.state(), |departures| {
            TrainsCard::new(departures, now, self.config.walk_time_mins)
        });
        out.push_str(&trains.to_string());
        out.push('\n');

        let weather = CardView::from_state(&self.weather.state(), |report| WeatherCard::new(report, now));
        out.push_str(&weather.to_string());

        if let Some(calendar) = &self.calendar {
            let card = CardView::from_state(&calendar.state(), |events| {
                CalendarCard::new(events, &self.config.household, now)
            });
            out.push('\n');
            out.push_str(&card.to_string());
            if let Some(prompt) = self.auth.as_ref().and_then(sign_in_prompt) {
                out.push_str(&prompt);
            }
        }
        out
    }

    /// Render on every minute tick until `shutdown` resolves, then tear down.
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) {
        let mut ticks = self.ticker.subscribe();
        let mut last_hour = self.ticker.current().every_hour;
        tokio::pin!(shutdown);

        println!("{}", self.render(Local::now()));
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested");
                    break;
                }
                changed = ticks.changed() => {
                    if changed.is_err() {
                        tracing::error!("Ticker stopped unexpectedly");
                        break;
                    }
                    let current = *ticks.borrow_and_update();
                    if current.every_hour != last_hour {
                        last_hour = current.every_hour;
                        self.theme.update(&current.every_hour);
                    }
                    println!("{}", self.render(current.every_minute));
                }
            }
        }

        self.shutdown();
    }

    /// Stop every poller and the ticker.
    pub fn shutdown(self) {
        let Dashboard {
            trains,
            weather,
            calendar,
            token_refresh,
            ticker,
            ..
        } = self;

        trains.cancel();
        weather.cancel();
        if let Some(calendar) = calendar {
            calendar.cancel();
        }
        if let Some(refresh) = token_refresh {
            refresh.cancel();
        }
        drop(ticker);
        tracing::info!("Dashboard stopped");
    }
}

/// Line asking the operator to sign in, shown under the calendar card while
/// no Google token is held.
fn sign_in_prompt(auth: &Authenticator) -> Option<String> {
    if auth.is_signed_in() {
        return None;
    }
    Some(format!(
        "  Sign in required: open {} and run `dashboard-cli sign-in <code>`\n",
        auth.auth_url()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl Provider for Counting {
        type Output = usize;

        fn name(&self) -> &'static str {
            "counting"
        }

        async fn fetch(&self) -> crate::error::DashboardResult<usize> {
            Ok(self.calls.fetch_add(1, Ordering::SeqCst) + 1)
        }
    }

    fn config() -> DashboardConfig {
        DashboardConfig::from_vars(|key| match key {
            "TRANSPORT_TESTING" => Some("true".to_string()),
            "DASHBOARD_STATE_DIR" => Some(
                std::env::temp_dir()
                    .join(format!("household-dashboard-wiring-{}", std::process::id()))
                    .to_string_lossy()
                    .into_owned(),
            ),
            _ => None,
        })
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_provider_fetches_on_interval() {
        let provider = Arc::new(Counting {
            calls: AtomicUsize::new(0),
        });
        let poller = poll_provider(provider.clone(), every(Duration::from_secs(60)), true);
        let mut state = poller.subscribe();

        state.changed().await.unwrap();
        assert_eq!(state.borrow_and_update().data, Some(1));

        state.changed().await.unwrap();
        assert_eq!(state.borrow_and_update().data, Some(2));
        assert_eq!(poller.name(), "counting");
        poller.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cards_show_loading_until_first_poll() {
        let mut config = config();
        config.weather.base_url = "http://127.0.0.1:9".to_string();
        let dashboard = Dashboard::start(config).await;

        let text = dashboard.render(Local::now());
        assert!(text.contains("Weather\n  Loading..."));
        assert!(!text.contains("Calendar"));
        dashboard.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_trains_card_renders_sample_departures() {
        let dashboard = Dashboard::start(config()).await;

        let mut trains = dashboard.trains.subscribe();
        trains.changed().await.unwrap();
        assert!(trains.borrow().data.is_some());

        let text = dashboard.render(Local::now());
        assert!(text.starts_with(&format!("[{} theme]", dashboard.theme().as_str())));
        assert!(!text.contains("Trains\n  Loading..."));
        dashboard.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_calendar_prompts_for_sign_in_without_token() {
        let state_dir = std::env::temp_dir().join(format!("household-dashboard-sign-in-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&state_dir);
        let state_dir = state_dir.to_string_lossy().into_owned();

        let mut config = DashboardConfig::from_vars(|key| match key {
            "TRANSPORT_TESTING" => Some("true".to_string()),
            "GOOGLE_CLIENT_ID" => Some("client".to_string()),
            "GOOGLE_CLIENT_SECRET" => Some("secret".to_string()),
            "DASHBOARD_STATE_DIR" => Some(state_dir.clone()),
            _ => None,
        })
        .unwrap();
        config.weather.base_url = "http://127.0.0.1:9".to_string();
        let dashboard = Dashboard::start(config).await;

        let text = dashboard.render(Local::now());
        assert!(text.contains("Calendar"));
        assert!(text.contains("Sign in required: open https://accounts.google.com/o/oauth2/v2/auth?client_id=client"));
        assert!(dashboard.token_refresh.is_some());
        dashboard.shutdown();
    }
}
