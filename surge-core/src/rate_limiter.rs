#![forbid(unsafe_code)]

//! Smooth token-bucket pacer with a burst capacity of one token.
//!
//! Permits are spaced `1 / rate` seconds apart. An idle limiter stores at most a single token,
//! so the first `acquire` after a pause returns immediately and the following ones are paced
//! again. Changing the rate takes effect from the permit after the one already scheduled.

use std::time::Duration;
use tokio::time::{sleep_until, Instant};

/// Longest spacing the limiter will ever wait between two permits.
pub const MAX_INTERVAL: Duration = Duration::from_secs(3600);

#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    next_free: Instant,
}

impl RateLimiter {
    /// `rate` is in permits per second. Non-positive or non-finite rates pace at [`MAX_INTERVAL`].
    pub fn new(rate: f64) -> Self {
        Self { interval: interval_for(rate), next_free: Instant::now() }
    }

    /// Wait until the next permit is available and consume it.
    pub async fn acquire(&mut self) {
        let now = Instant::now();
        if self.next_free > now {
            sleep_until(self.next_free).await;
        }
        // Unused time beyond one interval is not banked: burst stays at one token.
        self.next_free = self.next_free.max(now) + self.interval;
    }

    pub fn set_rate(&mut self, rate: f64) {
        self.interval = interval_for(rate);
    }

    /// Current rate in permits per second.
    pub fn rate(&self) -> f64 {
        1.0 / self.interval.as_secs_f64()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

fn interval_for(rate: f64) -> Duration {
    if !(rate.is_finite() && rate > 0.0) {
        return MAX_INTERVAL;
    }
    Duration::try_from_secs_f64(1.0 / rate)
        .unwrap_or(MAX_INTERVAL)
        .min(MAX_INTERVAL)
}
