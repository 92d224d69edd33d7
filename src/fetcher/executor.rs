//! Request executor: pacing, quota-rejection handling and classification
//!
//! [`RequestExecutor::execute`] claims a pacer slot before every dispatch,
//! retries 429 responses according to the [`RetryPolicy`], and turns every
//! non-2xx answer into a typed [`FetcherError`]. [`RequestExecutor::fetch_json`]
//! adds body decoding on top.

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::pacer::Pacer;
use super::request::{RawResponse, RequestSpec};
use super::retry::RetryPolicy;
use super::retry_formatter::{RetryContext, RetryErrorType};
use super::transport::HttpTransport;
use super::{body_preview, error_message_from_body, truncate_body, FetcherError, FetcherResult};
use crate::metrics;

/// Sends one logical request and classifies the outcome
#[derive(Clone)]
pub struct RequestExecutor {
    transport: Arc<dyn HttpTransport>,
    pacer: Arc<Pacer>,
    policy: RetryPolicy,
}

impl RequestExecutor {
    /// Create an executor
    ///
    /// `pacer` must be the same instance the transport uses for its own retries.
    pub fn new(transport: Arc<dyn HttpTransport>, pacer: Arc<Pacer>, policy: RetryPolicy) -> Self {
        Self {
            transport,
            pacer,
            policy,
        }
    }

    /// The shared pacer
    pub fn pacer(&self) -> &Arc<Pacer> {
        &self.pacer
    }

    /// The quota-rejection policy
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Send `spec` and return the 2xx response
    ///
    /// # Errors
    /// - [`FetcherError::Forbidden`] on 403
    /// - [`FetcherError::RateLimited`] on 429 with retry disabled or the attempt budget spent
    /// - [`FetcherError::Api`] on any other non-2xx status
    /// - [`FetcherError::Transport`] on network failure
    pub async fn execute(&self, spec: &RequestSpec) -> FetcherResult<RawResponse> {
        let mut attempt: u32 = 1;

        loop {
            self.pacer.wait().await;
            debug!(method = %spec.method, path = %spec.path, attempt, "Dispatching request");
            let response = match self.transport.send(spec).await {
                Ok(response) => response,
                Err(err) => {
                    debug!(
                        path = %spec.path,
                        timeout = err.is_timeout(),
                        connect = err.is_connect(),
                        "Transport failure: {err}"
                    );
                    return Err(err.into());
                }
            };

            match response.status {
                200..=299 => {
                    if attempt > 1 {
                        let context = self.retry_context(spec, attempt, Duration::ZERO);
                        debug!("{}", context.format_success());
                    }
                    return Ok(response);
                }
                403 => {
                    return Err(FetcherError::Forbidden {
                        status: response.status,
                        message: error_message_from_body(&response.body),
                        body: truncate_body(&response.body),
                    });
                }
                429 => {
                    metrics::record_quota_rejection();
                    if !self.policy.allows_retry_after(attempt) {
                        if self.policy.retry_on_quota_rejection {
                            let context = self.retry_context(spec, attempt, Duration::ZERO);
                            warn!("{}", context.format_failure());
                        }
                        return Err(FetcherError::RateLimited {
                            status: response.status,
                            message: error_message_from_body(&response.body),
                            body: truncate_body(&response.body),
                        });
                    }

                    let wait = self.policy.wait_for(response.retry_after());
                    attempt += 1;
                    let context = self.retry_context(spec, attempt, wait);
                    warn!(
                        retry_after = response.retry_after().unwrap_or("-"),
                        "{}",
                        context.format_retry()
                    );
                    metrics::record_retry(RetryErrorType::QuotaRejection.label());
                    if !wait.is_zero() {
                        tokio::time::sleep(wait).await;
                    }
                }
                status => {
                    return Err(FetcherError::Api {
                        status: Some(status),
                        message: error_message_from_body(&response.body),
                        body: Some(truncate_body(&response.body)),
                    });
                }
            }
        }
    }

    /// Send `spec` and decode the body as JSON
    ///
    /// # Errors
    /// Everything [`execute`](Self::execute) returns, plus
    /// [`FetcherError::Api`] with no status when the body is not valid JSON
    pub async fn fetch_json(&self, spec: &RequestSpec) -> FetcherResult<Value> {
        let response = self.execute(spec).await?;
        decode_json(&spec.path, &response.body)
    }

    fn retry_context(&self, spec: &RequestSpec, attempt: u32, wait: Duration) -> RetryContext {
        RetryContext::new(
            attempt,
            self.policy.max_attempts,
            RetryErrorType::QuotaRejection,
            wait,
            spec.method,
            spec.path.clone(),
        )
    }
}

/// Decode a response body, reporting malformed JSON as a contract violation
pub fn decode_json(path: &str, body: &str) -> FetcherResult<Value> {
    serde_json::from_str(body).map_err(|e| FetcherError::Api {
        status: None,
        message: format!(
            "Failed to parse JSON response from {path}: {e}. Body preview: {}",
            body_preview(body)
        ),
        body: Some(truncate_body(body)),
    })
}
