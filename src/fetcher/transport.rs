//! HTTP transport layer
//!
//! [`HttpTransport`] is the seam between the fetch pipeline and the network:
//! one call, one HTTP exchange. [`ReqwestTransport`] is the production
//! implementation; [`RetryingTransport`] wraps any transport with the fixed
//! transient-error policy (up to 3 retries on 500/502/503/504, safe methods
//! only, exponential backoff). Network faults are never retried here and
//! never reinterpreted: they surface as [`TransportError`].

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Method};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::pacer::Pacer;
use super::request::{HttpMethod, RawResponse, RequestSpec};
use super::retry::parse_retry_after;
use super::retry_formatter::{RetryContext, RetryErrorType};
use super::TransportError;
use crate::config::{
    calculate_backoff, ClientConfig, ConfigError, CONNECT_TIMEOUT_SECS, TRANSIENT_MAX_RETRIES,
    TRANSIENT_STATUSES,
};
use crate::metrics;

/// `User-Agent` sent with every request
pub const USER_AGENT: &str = concat!("quota-fetch/", env!("CARGO_PKG_VERSION"));

/// Header carrying the API key
pub const API_KEY_HEADER: &str = "x-api-key";

/// Sends one HTTP request and returns the fully read response
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Perform a single HTTP exchange
    ///
    /// # Errors
    /// Returns [`TransportError`] on connection, timeout or body-read failure.
    /// Non-2xx statuses are returned as responses, not errors.
    async fn send(&self, spec: &RequestSpec) -> Result<RawResponse, TransportError>;
}

/// Production transport over a pooled [`reqwest::Client`]
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    base_url: String,
}

impl ReqwestTransport {
    /// Build a transport from client configuration
    ///
    /// # Errors
    /// Returns [`ConfigError`] if the API key is not a valid header value or
    /// the TLS backend cannot be initialized
    pub fn new(config: &ClientConfig) -> Result<Self, ConfigError> {
        let mut headers = HeaderMap::new();
        if let Some(key) = &config.api_key {
            let mut value = HeaderValue::from_str(key).map_err(|_| ConfigError::InvalidValue {
                field: "api_key",
                reason: "contains characters not allowed in an HTTP header".to_string(),
            })?;
            value.set_sensitive(true);
            headers.insert(API_KEY_HEADER, value);
        }

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(config.request_timeout())
            .pool_max_idle_per_host(config.pool_size())
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self::with_client(client, config.base_url.clone()))
    }

    /// Use an already configured client
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Base URL requests are resolved against
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

fn reqwest_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Head => Method::HEAD,
        HttpMethod::Post => Method::POST,
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, spec: &RequestSpec) -> Result<RawResponse, TransportError> {
        let url = self.url_for(&spec.path);
        debug!(method = %spec.method, url = %url, params = spec.query.len(), "Sending request");

        let mut request = self
            .client
            .request(reqwest_method(spec.method), &url)
            .query(&spec.query);
        if let Some(body) = &spec.body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let bytes = response.bytes().await?;

        Ok(RawResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }
}

/// Wraps a transport with bounded retry of transient server errors
///
/// Every retry claims a slot from the shared [`Pacer`] first, so retries
/// consume quota like fresh requests. When the retry budget is spent the
/// last 5xx response is returned for the caller to classify.
pub struct RetryingTransport {
    inner: Arc<dyn HttpTransport>,
    pacer: Arc<Pacer>,
    max_retries: u32,
}

impl RetryingTransport {
    /// Wrap `inner`, pacing retries through `pacer`
    pub fn new(inner: Arc<dyn HttpTransport>, pacer: Arc<Pacer>) -> Self {
        Self {
            inner,
            pacer,
            max_retries: TRANSIENT_MAX_RETRIES,
        }
    }

    fn is_transient(status: u16) -> bool {
        TRANSIENT_STATUSES.contains(&status)
    }

    /// Backoff before retry number `retry`; a 503 may override it via `Retry-After`
    fn retry_wait(response: &RawResponse, retry: u32) -> Duration {
        if response.status == 503 {
            if let Some(wait) = response
                .retry_after()
                .and_then(|value| parse_retry_after(value, Utc::now()))
            {
                return wait;
            }
        }
        calculate_backoff(retry)
    }

    async fn send_once(&self, spec: &RequestSpec) -> Result<RawResponse, TransportError> {
        let response = self.inner.send(spec).await?;
        metrics::record_request(response.status);
        Ok(response)
    }
}

#[async_trait]
impl HttpTransport for RetryingTransport {
    async fn send(&self, spec: &RequestSpec) -> Result<RawResponse, TransportError> {
        let mut response = self.send_once(spec).await?;
        if !spec.method.is_safe() {
            return Ok(response);
        }

        for retry in 1..=self.max_retries {
            if !Self::is_transient(response.status) {
                break;
            }

            let wait = Self::retry_wait(&response, retry);
            let context = RetryContext::new(
                retry + 1,
                self.max_retries + 1,
                RetryErrorType::ServerError(response.status),
                wait,
                spec.method,
                spec.path.clone(),
            );
            warn!(status = response.status, "{}", context.format_retry());
            metrics::record_retry(context.error_type.label());

            if !wait.is_zero() {
                tokio::time::sleep(wait).await;
            }
            self.pacer.wait().await;
            response = self.send_once(spec).await?;

            if !Self::is_transient(response.status) {
                debug!("{}", context.format_success());
            } else if retry == self.max_retries {
                warn!(status = response.status, "{}", context.format_failure());
            }
        }

        Ok(response)
    }
}
