use std::time::{Duration, Instant};

use chrono::{DateTime, Local, Utc};

/// Time source for the controller, swapped for a manual one in tests.
pub trait Clock {
    fn now(&self) -> Instant;
    fn utc(&self) -> DateTime<Utc>;

    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Recurring one-second ticker measuring time since the connection opened.
#[derive(Debug, Clone)]
pub struct Ticker {
    started_at: Instant,
    next_due: Instant,
    period: Duration,
}

impl Ticker {
    pub const PERIOD: Duration = Duration::from_secs(1);

    pub fn start(started_at: Instant) -> Self {
        Self {
            started_at,
            next_due: started_at + Self::PERIOD,
            period: Self::PERIOD,
        }
    }

    /// Returns the elapsed time when a tick is due. Missed ticks collapse into one.
    pub fn poll(&mut self, now: Instant) -> Option<Duration> {
        if now < self.next_due {
            return None;
        }
        while self.next_due <= now {
            self.next_due += self.period;
        }
        Some(now.duration_since(self.started_at))
    }
}
