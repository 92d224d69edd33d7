//! Request pacing against a per-minute quota
//!
//! A [`Pacer`] spaces dispatches at least `60 / rate` seconds apart. One
//! instance is shared (behind an [`Arc`](std::sync::Arc)) by every task that
//! talks to the API, so adding workers never raises the effective request
//! rate. No bursts are allowed: the very first dispatch is immediate, every
//! later one waits for the remainder of the interval.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

use crate::config::ConfigError;
use crate::metrics;

/// Requests-per-minute quota
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quota {
    rate: u32,
}

impl Quota {
    /// Create a quota of `rate` requests per minute
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidValue`] when `rate` is zero
    pub fn per_minute(rate: u32) -> Result<Self, ConfigError> {
        if rate == 0 {
            return Err(ConfigError::InvalidValue {
                field: "rate",
                reason: "must be positive, got 0".to_string(),
            });
        }
        Ok(Self { rate })
    }

    /// Requests per minute
    pub fn rate(&self) -> u32 {
        self.rate
    }

    /// Minimum spacing between two dispatches
    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(60.0 / f64::from(self.rate))
    }
}

/// Leaky-bucket pacer shared by all callers of one client
#[derive(Debug)]
pub struct Pacer {
    quota: Quota,
    interval: Duration,
    last_dispatch: Mutex<Option<Instant>>,
}

impl Pacer {
    /// Create a pacer for `quota`
    pub fn new(quota: Quota) -> Self {
        Self {
            interval: quota.interval(),
            quota,
            last_dispatch: Mutex::new(None),
        }
    }

    /// Create a pacer for `rate` requests per minute
    pub fn per_minute(rate: u32) -> Result<Self, ConfigError> {
        Ok(Self::new(Quota::per_minute(rate)?))
    }

    /// The quota this pacer enforces
    pub fn quota(&self) -> Quota {
        self.quota
    }

    /// Minimum spacing between dispatches
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait for the next dispatch slot and claim it
    ///
    /// The lock is held across the sleep, so concurrent callers queue up
    /// in arrival order and each claims its own slot.
    ///
    /// # Returns
    /// How long this call actually waited
    pub async fn wait(&self) -> Duration {
        let mut last = self.last_dispatch.lock().await;
        let now = Instant::now();

        let waited = match *last {
            Some(previous) => {
                let next_slot = previous + self.interval;
                if next_slot > now {
                    sleep_until(next_slot).await;
                    next_slot - now
                } else {
                    Duration::ZERO
                }
            }
            None => Duration::ZERO,
        };

        *last = Some(Instant::now());
        drop(last);

        if !waited.is_zero() {
            debug!(waited_ms = waited.as_millis() as u64, "Pacer delayed dispatch");
        }
        metrics::record_pacer_wait(waited);
        waited
    }

    /// Forget the last dispatch so the next wait is immediate
    pub async fn reset(&self) {
        *self.last_dispatch.lock().await = None;
    }
}
