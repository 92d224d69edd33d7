//! Request execution pipeline
//!
//! Layers, leaf first:
//! - [`pacer`]: spaces dispatches against the per-minute quota
//! - [`transport`]: one HTTP exchange, plus bounded 5xx retry
//! - [`executor`]: pacing, 429 handling and status classification
//! - [`pagination`]: walks continuation tokens into one record list

use serde_json::Value;

use crate::config::{ERROR_PREVIEW_CHARS, RESPONSE_BODY_MAX_LENGTH};

pub mod executor;
pub mod pacer;
pub mod pagination;
pub mod request;
pub mod retry;
pub mod retry_formatter;
pub mod transport;

/// One decoded record from a paginated `data` list
pub type Record = serde_json::Map<String, Value>;

/// Suffix appended to bodies and messages that were cut
const TRUNCATION_SUFFIX: &str = "... (truncated)";

/// Network-level failures, surfaced without reinterpretation
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failure reported by the HTTP client (connect, timeout, body read)
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// I/O failure from a non-reqwest transport
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// Whether the failure was a timeout
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Http(err) => err.is_timeout(),
            Self::Io(err) => err.kind() == std::io::ErrorKind::TimedOut,
        }
    }

    /// Whether the failure happened while connecting
    pub fn is_connect(&self) -> bool {
        match self {
            Self::Http(err) => err.is_connect(),
            Self::Io(err) => matches!(
                err.kind(),
                std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
            ),
        }
    }
}

/// Fetcher errors
#[derive(Debug, thiserror::Error)]
pub enum FetcherError {
    /// 403: bad credentials, plan not entitled, or invalid path. Never retried.
    #[error("access forbidden (status {status}): {message}")]
    Forbidden {
        /// HTTP status
        status: u16,
        /// Server-provided message, truncated
        message: String,
        /// Response body, truncated
        body: String,
    },

    /// 429 with retry disabled, or quota-rejection retries exhausted
    #[error("rate limit exceeded (status {status}): {message}")]
    RateLimited {
        /// Status of the final attempt
        status: u16,
        /// Server-provided message, truncated
        message: String,
        /// Response body, truncated
        body: String,
    },

    /// Any other non-2xx status, or a response that broke the body contract
    #[error("{}", format_api_error(.status, .message))]
    Api {
        /// HTTP status; `None` for client-observed contract violations
        status: Option<u16>,
        /// Description
        message: String,
        /// Response body, truncated
        body: Option<String>,
    },

    /// Connection or timeout failure from the HTTP layer
    #[error(transparent)]
    Transport(#[from] TransportError),
}

fn format_api_error(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(status) => format!("API error (status {status}): {message}"),
        None => format!("API error: {message}"),
    }
}

impl FetcherError {
    /// Contract violation detected on the client side (no HTTP status)
    pub fn contract(message: impl Into<String>) -> Self {
        Self::Api {
            status: None,
            message: message.into(),
            body: None,
        }
    }

    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Forbidden { status, .. } | Self::RateLimited { status, .. } => Some(*status),
            Self::Api { status, .. } => *status,
            Self::Transport(_) => None,
        }
    }

    /// Truncated response body, if one was received
    pub fn response_body(&self) -> Option<&str> {
        match self {
            Self::Forbidden { body, .. } | Self::RateLimited { body, .. } => Some(body),
            Self::Api { body, .. } => body.as_deref(),
            Self::Transport(_) => None,
        }
    }

    /// Whether this is a network-level failure rather than an API answer
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// Result type for fetcher operations
pub type FetcherResult<T> = Result<T, FetcherError>;

/// Cut `text` to at most `max` characters, marking the cut
pub fn truncate_text(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let keep = max.saturating_sub(TRUNCATION_SUFFIX.len());
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(TRUNCATION_SUFFIX);
    out
}

/// Truncate a response body for storage on an error
pub fn truncate_body(body: &str) -> String {
    truncate_text(body, RESPONSE_BODY_MAX_LENGTH)
}

/// Human-readable message for a non-2xx body
///
/// Uses the `message` field of a JSON object body when present (serialized
/// when it is not a string), otherwise the body text itself.
pub fn error_message_from_body(body: &str) -> String {
    let message = match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => match map.get("message") {
            Some(Value::String(text)) => text.clone(),
            Some(other) => other.to_string(),
            None => body.to_string(),
        },
        _ => body.to_string(),
    };
    truncate_body(&message)
}

/// First characters of a malformed body, for decode-error messages
pub fn body_preview(body: &str) -> String {
    if body.is_empty() {
        return "(empty)".to_string();
    }
    body.chars().take(ERROR_PREVIEW_CHARS).collect()
}
