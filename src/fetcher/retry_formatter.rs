//! Retry log message formatting
//!
//! Both retry loops (the transport's 5xx loop and the executor's 429 loop)
//! describe each retry through a [`RetryContext`] so the `warn!` lines read
//! the same regardless of which layer is retrying.

use std::time::Duration;

use super::request::HttpMethod;

/// Why a request is being retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryErrorType {
    /// HTTP 429 quota rejection
    QuotaRejection,
    /// HTTP 5xx transient server error
    ServerError(u16),
}

impl RetryErrorType {
    /// Description used inside retry log messages
    pub fn description(&self) -> &'static str {
        match self {
            Self::QuotaRejection => "quota rejection (429)",
            Self::ServerError(code) => match code {
                500 => "internal server error",
                502 => "bad gateway",
                503 => "service unavailable",
                504 => "gateway timeout",
                _ => "server error",
            },
        }
    }

    /// Short label for the `reason` metric dimension
    pub fn label(&self) -> &'static str {
        match self {
            Self::QuotaRejection => "quota",
            Self::ServerError(_) => "server_error",
        }
    }
}

/// Context for formatting retry messages
#[derive(Debug, Clone)]
pub struct RetryContext {
    /// Attempt about to be made (1-based, counting the first dispatch)
    pub attempt: u32,
    /// Maximum number of dispatches
    pub max_attempts: u32,
    /// What triggered the retry
    pub error_type: RetryErrorType,
    /// Wait before the next dispatch (excludes pacer spacing)
    pub wait: Duration,
    /// Method of the request being retried
    pub method: HttpMethod,
    /// Path of the request being retried
    pub path: String,
}

impl RetryContext {
    /// Create a context for one retry
    pub fn new(
        attempt: u32,
        max_attempts: u32,
        error_type: RetryErrorType,
        wait: Duration,
        method: HttpMethod,
        path: impl Into<String>,
    ) -> Self {
        Self {
            attempt,
            max_attempts,
            error_type,
            wait,
            method,
            path: path.into(),
        }
    }

    /// "Retrying (attempt n/m) after <reason> - waiting x.y seconds... (GET /path)"
    pub fn format_retry(&self) -> String {
        format!(
            "Retrying (attempt {}/{}) after {} - waiting {:.1} seconds... ({} {})",
            self.attempt,
            self.max_attempts,
            self.error_type.description(),
            self.wait.as_secs_f64(),
            self.method,
            self.path
        )
    }

    /// Message logged when a retried request finally succeeds
    pub fn format_success(&self) -> String {
        format!(
            "Retry attempt {}/{} succeeded ({} {})",
            self.attempt, self.max_attempts, self.method, self.path
        )
    }

    /// Message logged when the retry budget is spent
    pub fn format_failure(&self) -> String {
        format!(
            "Giving up after {} attempts: {} ({} {})",
            self.max_attempts,
            self.error_type.description(),
            self.method,
            self.path
        )
    }
}
