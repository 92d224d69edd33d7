//! Client configuration and fixed retry constants
//!
//! [`ClientConfig`] carries the two quota knobs (requests per minute and
//! worker count) plus the quota-rejection retry settings. Every constructor
//! funnels through [`ClientConfig::validate`], so a built client never holds
//! an out-of-range value.

use serde::Deserialize;
use std::time::Duration;

/// Default sustained request rate (requests per minute), the most restrictive tier.
pub const DEFAULT_RATE_LIMIT: u32 = 5;

/// Default worker count for range fetches (serial).
pub const DEFAULT_MAX_WORKERS: usize = 1;

/// Default wait after a 429 that carried no usable `Retry-After` header.
/// Slightly over five minutes so a full quota window has rolled over.
pub const DEFAULT_RETRY_WAIT_SECS: u64 = 310;

/// Default number of dispatches allowed for one call that keeps hitting 429.
pub const DEFAULT_RETRY_MAX_ATTEMPTS: u32 = 3;

/// Default per-request timeout (seconds).
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// TCP connect timeout (seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default page ceiling for one paginated fetch.
pub const DEFAULT_MAX_PAGES: usize = 2_000;

/// Idle connections kept per host on top of the worker count.
pub const POOL_HEADROOM: usize = 10;

/// Maximum retries applied by the transport for transient server errors.
pub const TRANSIENT_MAX_RETRIES: u32 = 3;

/// Status codes treated as transient server errors.
pub const TRANSIENT_STATUSES: [u16; 4] = [500, 502, 503, 504];

/// Multiplicative backoff factor for transient retries (seconds).
pub const TRANSIENT_BACKOFF_FACTOR: f64 = 0.5;

/// Upper bound on a single transient backoff (seconds).
pub const TRANSIENT_BACKOFF_MAX_SECS: f64 = 120.0;

/// Maximum length of a response body (or error message) kept on an error.
pub const RESPONSE_BODY_MAX_LENGTH: usize = 2048;

/// Characters of a malformed body embedded in a decode error message.
pub const ERROR_PREVIEW_CHARS: usize = 200;

/// Calculate the transient-error backoff before retry number `retry` (1-based).
///
/// The first retry goes out immediately; later ones wait
/// `factor * 2^(retry - 1)` seconds, capped at [`TRANSIENT_BACKOFF_MAX_SECS`].
pub fn calculate_backoff(retry: u32) -> Duration {
    if retry <= 1 {
        return Duration::ZERO;
    }
    let exponent = (retry - 1).min(31) as i32;
    let secs = (TRANSIENT_BACKOFF_FACTOR * 2f64.powi(exponent)).min(TRANSIENT_BACKOFF_MAX_SECS);
    Duration::from_secs_f64(secs)
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A numeric knob is out of range
    #[error("invalid {field}: {reason}")]
    InvalidValue {
        /// Name of the offending field
        field: &'static str,
        /// Why the value was rejected
        reason: String,
    },

    /// The HTTP client could not be built
    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}

/// Client configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// API base URL; request paths are appended verbatim
    pub base_url: String,
    /// API key sent as `x-api-key`
    pub api_key: Option<String>,
    /// Sustained request rate (requests per minute)
    pub rate_limit: u32,
    /// Concurrent per-day fetches during a range fetch
    pub max_workers: usize,
    /// Retry after a 429 instead of failing immediately
    pub retry_on_429: bool,
    /// Fallback wait after a 429 without a usable `Retry-After`
    pub retry_wait_seconds: u64,
    /// Total dispatches allowed for one call that keeps receiving 429;
    /// `0` behaves like `1` (no retry)
    pub retry_max_attempts: u32,
    /// Per-request timeout (seconds)
    pub request_timeout_secs: u64,
    /// Page ceiling for one paginated fetch
    pub max_pages: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: None,
            rate_limit: DEFAULT_RATE_LIMIT,
            max_workers: DEFAULT_MAX_WORKERS,
            retry_on_429: true,
            retry_wait_seconds: DEFAULT_RETRY_WAIT_SECS,
            retry_max_attempts: DEFAULT_RETRY_MAX_ATTEMPTS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

impl ClientConfig {
    /// Create a configuration for `base_url` with every other knob at its default
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Set the API key (surrounding whitespace is stripped)
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into().trim().to_string());
        self
    }

    /// Set the sustained request rate (requests per minute)
    pub fn with_rate_limit(mut self, rate_limit: u32) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    /// Set the worker count used by range fetches
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    /// Enable or disable retrying after a 429
    pub fn with_retry_on_429(mut self, enabled: bool) -> Self {
        self.retry_on_429 = enabled;
        self
    }

    /// Set the fallback wait after a 429
    pub fn with_retry_wait_seconds(mut self, seconds: u64) -> Self {
        self.retry_wait_seconds = seconds;
        self
    }

    /// Set the dispatch budget for calls that keep receiving 429
    pub fn with_retry_max_attempts(mut self, attempts: u32) -> Self {
        self.retry_max_attempts = attempts;
        self
    }

    /// Set the per-request timeout
    pub fn with_request_timeout_secs(mut self, seconds: u64) -> Self {
        self.request_timeout_secs = seconds;
        self
    }

    /// Set the page ceiling for paginated fetches
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Check every knob, naming the first offending field
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rate_limit == 0 {
            return Err(ConfigError::invalid("rate_limit", "must be positive, got 0"));
        }
        if self.max_workers == 0 {
            return Err(ConfigError::invalid("max_workers", "must be positive, got 0"));
        }
        if self.retry_wait_seconds == 0 {
            return Err(ConfigError::invalid(
                "retry_wait_seconds",
                "must be positive, got 0",
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "request_timeout_secs",
                "must be positive, got 0",
            ));
        }
        if self.max_pages == 0 {
            return Err(ConfigError::invalid("max_pages", "must be positive, got 0"));
        }
        if let Some(key) = &self.api_key {
            if key.trim().is_empty() {
                return Err(ConfigError::invalid("api_key", "must not be empty"));
            }
        }
        Ok(())
    }

    /// Fallback wait after a 429 as a [`Duration`]
    pub fn retry_wait(&self) -> Duration {
        Duration::from_secs(self.retry_wait_seconds)
    }

    /// Per-request timeout as a [`Duration`]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Idle connections to keep per host
    pub fn pool_size(&self) -> usize {
        self.max_workers + POOL_HEADROOM
    }
}
