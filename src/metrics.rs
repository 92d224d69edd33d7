//! Observability metrics for request pacing and retries
//!
//! Recording goes through the `metrics` facade, so every `record_*` call is a
//! no-op until a recorder is installed. [`init_metrics`] installs the
//! Prometheus exporter; host applications that already run their own
//! recorder can skip it.
//!
//! ## Exported series
//!
//! - `http_requests_total{status}`: every HTTP exchange, retries included
//! - `http_429_errors_total`: quota rejections received
//! - `http_retries_total{reason}`: retries scheduled (`quota` or `server_error`)
//! - `pacer_wait_seconds`: time spent waiting for a dispatch slot
//! - `pages_fetched_total`: pages walked by paginated fetches
//! - `range_days_fetched_total`: days completed by range fetches

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::Lazy;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Global metrics registry initialization flag
static METRICS_INITIALIZED: Lazy<Arc<RwLock<bool>>> = Lazy::new(|| Arc::new(RwLock::new(false)));

/// Metrics setup errors
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// The Prometheus exporter could not be installed
    #[error("failed to install Prometheus exporter: {0}")]
    Install(String),
}

/// Initialize metrics with a Prometheus scrape endpoint
///
/// Idempotent: later calls return `Ok(())` without reinstalling.
///
/// # Arguments
/// * `addr` - Socket address for the scrape endpoint (e.g., "0.0.0.0:9090")
pub async fn init_metrics(addr: SocketAddr) -> Result<(), MetricsError> {
    let mut initialized = METRICS_INITIALIZED.write().await;
    if *initialized {
        debug!("Metrics already initialized, skipping");
        return Ok(());
    }

    info!("Initializing metrics system on {}", addr);

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| MetricsError::Install(e.to_string()))?;

    describe_counter!(
        "http_requests_total",
        Unit::Count,
        "Total number of HTTP exchanges, retries included"
    );
    describe_counter!(
        "http_429_errors_total",
        Unit::Count,
        "Total number of 429 quota rejections received"
    );
    describe_counter!(
        "http_retries_total",
        Unit::Count,
        "Total number of retries scheduled"
    );
    describe_histogram!(
        "pacer_wait_seconds",
        Unit::Seconds,
        "Time spent waiting for a dispatch slot"
    );
    describe_counter!(
        "pages_fetched_total",
        Unit::Count,
        "Total number of pages walked by paginated fetches"
    );
    describe_counter!(
        "range_days_fetched_total",
        Unit::Count,
        "Total number of days completed by range fetches"
    );

    *initialized = true;
    info!("Metrics system initialized successfully on {}", addr);
    Ok(())
}

/// Check if [`init_metrics`] has completed
pub async fn is_initialized() -> bool {
    *METRICS_INITIALIZED.read().await
}

/// Record one HTTP exchange
pub fn record_request(status: u16) {
    counter!("http_requests_total", "status" => status.to_string()).increment(1);
}

/// Record a 429 response
pub fn record_quota_rejection() {
    counter!("http_429_errors_total").increment(1);
}

/// Record a scheduled retry
pub fn record_retry(reason: &'static str) {
    counter!("http_retries_total", "reason" => reason).increment(1);
}

/// Record time spent in the pacer
pub fn record_pacer_wait(waited: Duration) {
    histogram!("pacer_wait_seconds").record(waited.as_secs_f64());
}

/// Record pages walked by one paginated fetch
pub fn record_pages(pages: u64) {
    counter!("pages_fetched_total").increment(pages);
}

/// Record one completed day of a range fetch
pub fn record_range_day() {
    counter!("range_days_fetched_total").increment(1);
}
