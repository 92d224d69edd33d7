//! Quota-rejection retry policy and `Retry-After` parsing

use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::config::{ClientConfig, DEFAULT_RETRY_MAX_ATTEMPTS, DEFAULT_RETRY_WAIT_SECS};

/// How the executor reacts to a 429 response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retry after a 429 instead of failing immediately
    pub retry_on_quota_rejection: bool,
    /// Wait used when the response has no usable `Retry-After` header
    pub fallback_wait: Duration,
    /// Total dispatches allowed for one call, including the first
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retry_on_quota_rejection: true,
            fallback_wait: Duration::from_secs(DEFAULT_RETRY_WAIT_SECS),
            max_attempts: DEFAULT_RETRY_MAX_ATTEMPTS,
        }
    }
}

impl RetryPolicy {
    /// Policy that fails on the first 429
    pub fn no_retry() -> Self {
        Self {
            retry_on_quota_rejection: false,
            ..Self::default()
        }
    }

    /// Build the policy from client configuration
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            retry_on_quota_rejection: config.retry_on_429,
            fallback_wait: config.retry_wait(),
            max_attempts: config.retry_max_attempts.max(1),
        }
    }

    /// Whether another dispatch is allowed after `attempt` (1-based) was rejected
    pub fn allows_retry_after(&self, attempt: u32) -> bool {
        self.retry_on_quota_rejection && attempt < self.max_attempts
    }

    /// Wait before the next dispatch: the header value when usable, else the fallback
    pub fn wait_for(&self, retry_after: Option<&str>) -> Duration {
        retry_after
            .and_then(|value| parse_retry_after(value, Utc::now()))
            .unwrap_or(self.fallback_wait)
    }
}

/// Parse a `Retry-After` header value
///
/// Accepts a non-negative integer number of seconds (`0` means retry now) or
/// an HTTP-date in any of its three forms (IMF-fixdate, RFC 850, asctime).
/// A date in the past yields a zero wait.
///
/// # Returns
/// `None` when the value is neither form, so callers fall back to their default
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if value.bytes().all(|b| b.is_ascii_digit()) {
        return value.parse::<u64>().ok().map(Duration::from_secs);
    }

    let date: DateTime<Utc> = httpdate::parse_http_date(value).ok()?.into();
    let delta = date - now;
    Some(delta.to_std().unwrap_or(Duration::ZERO))
}
