//! Background polling tasks that refresh the dashboard cards.
//!
//! A [`Poller`] owns one tokio task that repeatedly fetches a value, records
//! it in a watch channel and asks an interval function how long to sleep
//! before the next attempt. Dropping the poller tears the task down.

pub mod timetable;

use chrono::{DateTime, Local};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub use timetable::Timetable;

/// Snapshot of what a poller has fetched so far
#[derive(Debug, Clone, PartialEq)]
pub struct PollState<T> {
    /// Last successfully fetched value; kept across failed polls
    pub data: Option<T>,
    /// When the fetch producing `data` started
    pub poll_time: Option<DateTime<Local>>,
    /// True until the first poll settles
    pub loading: bool,
    /// Message of the most recent failure, cleared by the next success
    pub last_error: Option<String>,
}

/// Handle to a running poll loop.
///
/// Dropping the handle (or calling [`Poller::cancel`]) stops the loop: the
/// pending timer is abandoned and a fetch that is already in flight has its
/// result discarded.
pub struct Poller<T> {
    name: &'static str,
    state: watch::Receiver<PollState<T>>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl<T> Poller<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Start polling.
    ///
    /// With `immediate` set the first fetch runs straight away; otherwise it
    /// waits for the first delay returned by `interval`. After every attempt
    /// `interval` is called with the current time; returning `None` ends the
    /// loop for good.
    pub fn spawn<F, Fut, E, I>(name: &'static str, fetch: F, interval: I, immediate: bool) -> Self
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Display + Send + 'static,
        I: Fn(DateTime<Local>) -> Option<Duration> + Send + 'static,
    {
        let (state_tx, state) = watch::channel(PollState {
            data: None,
            poll_time: None,
            loading: immediate,
            last_error: None,
        });
        let (shutdown, shutdown_rx) = watch::channel(false);

        tracing::info!("{} poller started (immediate: {})", name, immediate);
        let task = tokio::spawn(run_poll_loop(
            name,
            fetch,
            interval,
            immediate,
            state_tx,
            shutdown_rx,
        ));

        Self {
            name,
            state,
            shutdown,
            task,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Current poll state
    pub fn state(&self) -> PollState<T> {
        self.state.borrow().clone()
    }

    /// Receiver notified after every settled poll
    pub fn subscribe(&self) -> watch::Receiver<PollState<T>> {
        self.state.clone()
    }

    /// Stop polling. Equivalent to dropping the handle.
    pub fn cancel(self) {
        tracing::debug!("Cancelling {} poller", self.name);
        let _ = self.shutdown.send(true);
    }

    /// Wait for the loop to end on its own, i.e. once `interval` returns `None`.
    pub async fn join(self) {
        let Poller { task, shutdown, .. } = self;
        if let Err(e) = task.await {
            tracing::error!("Poller task error: {:?}", e);
        }
        drop(shutdown);
    }
}

/// Interval function that always waits `period`
pub fn every(period: Duration) -> impl Fn(DateTime<Local>) -> Option<Duration> + Send + Sync + 'static {
    move |_| Some(period)
}

/// Interval function that wakes at the entries of `table`
pub fn on_timetable(
    table: Timetable,
) -> impl Fn(DateTime<Local>) -> Option<Duration> + Send + Sync + 'static {
    move |now| Some(table.next_delay(&now))
}

async fn run_poll_loop<T, F, Fut, E, I>(
    name: &'static str,
    fetch: F,
    interval: I,
    immediate: bool,
    state: watch::Sender<PollState<T>>,
    mut shutdown: watch::Receiver<bool>,
) where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
    I: Fn(DateTime<Local>) -> Option<Duration>,
{
    let mut delay = if immediate {
        Some(Duration::ZERO)
    } else {
        interval(Local::now())
    };

    while let Some(wait) = delay {
        if !wait.is_zero() {
            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = shutdown.changed() => {}
            }
        }
        if is_cancelled(&shutdown) {
            break;
        }

        let poll_time = Local::now();
        tracing::debug!("Polling {} at {}", name, poll_time.to_rfc3339());
        let result = fetch().await;

        if is_cancelled(&shutdown) {
            tracing::debug!("{} poller torn down mid-fetch, discarding result", name);
            return;
        }

        match result {
            Ok(data) => state.send_modify(|s| {
                s.data = Some(data);
                s.poll_time = Some(poll_time);
                s.loading = false;
                s.last_error = None;
            }),
            Err(e) => {
                tracing::error!("Polling error ({}): {}", name, e);
                state.send_modify(|s| {
                    s.loading = false;
                    s.last_error = Some(e.to_string());
                });
            }
        }

        let now = Local::now();
        delay = interval(now);
        match delay {
            Some(next) => {
                let at = now + chrono::Duration::from_std(next).unwrap_or_else(|_| chrono::Duration::zero());
                tracing::debug!("Next {} poll at {} (in {:?})", name, at.to_rfc3339(), next);
            }
            None => tracing::info!("{} poller has no further wake-ups", name),
        }
    }

    tracing::debug!("{} poller stopped", name);
}

/// Set once the owner asked to stop or went away
fn is_cancelled(shutdown: &watch::Receiver<bool>) -> bool {
    *shutdown.borrow() || shutdown.has_changed().is_err()
}
