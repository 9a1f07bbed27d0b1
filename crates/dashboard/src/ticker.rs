//! Minute and hour clock ticks shared by the cards.

use chrono::{DateTime, Local, TimeZone, Timelike};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Offset into each minute at which the ticker fires
const TICK_OFFSET: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticks {
    /// Time of the latest minute tick
    pub every_minute: DateTime<Local>,
    /// Time of the latest tick that fell on the hour
    pub every_hour: DateTime<Local>,
}

impl Ticks {
    pub fn starting_at(now: DateTime<Local>) -> Self {
        Self {
            every_minute: now,
            every_hour: now,
        }
    }

    /// Record a tick at `now`; returns true when the hour tick moved too.
    pub fn advance(&mut self, now: DateTime<Local>) -> bool {
        self.every_minute = now;
        if now.minute() == 0 {
            self.every_hour = now;
            return true;
        }
        false
    }
}

/// Background task publishing [`Ticks`]. Dropping the ticker stops it.
pub struct Ticker {
    ticks: watch::Receiver<Ticks>,
    task: JoinHandle<()>,
}

impl Ticker {
    pub fn spawn() -> Self {
        let (tx, ticks) = watch::channel(Ticks::starting_at(Local::now()));

        let task = tokio::spawn(async move {
            loop {
                tokio::time::sleep(until_next_tick(&Local::now())).await;
                let now = Local::now();
                let mut on_the_hour = false;
                tx.send_modify(|ticks| on_the_hour = ticks.advance(now));
                if on_the_hour {
                    tracing::debug!("Hour tick at {}", now.to_rfc3339());
                }
            }
        });

        Self { ticks, task }
    }

    pub fn subscribe(&self) -> watch::Receiver<Ticks> {
        self.ticks.clone()
    }

    pub fn current(&self) -> Ticks {
        *self.ticks.borrow()
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Delay from `now` until one second past the next minute boundary.
pub fn until_next_tick<Tz: TimeZone>(now: &DateTime<Tz>) -> Duration {
    // nanosecond() exceeds one second only during a leap second
    let into_minute = Duration::from_secs(now.second() as u64)
        + Duration::from_nanos(now.nanosecond().min(999_999_999) as u64);

    if into_minute < TICK_OFFSET {
        TICK_OFFSET - into_minute
    } else {
        Duration::from_secs(60) + TICK_OFFSET - into_minute
    }
}
