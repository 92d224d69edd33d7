//! API client facade
//!
//! [`ApiClient`] owns one [`Pacer`] and wires it into every layer: the
//! executor waits on it before each dispatch, the transport before each 5xx
//! retry, and range fetches reach it through the per-day closures that call
//! back into the same client. Cloning the client shares the pacer.

use chrono::NaiveDate;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

use crate::config::{ClientConfig, ConfigError};
use crate::fetcher::executor::RequestExecutor;
use crate::fetcher::pacer::Pacer;
use crate::fetcher::pagination::{PageWalker, PAGINATION_KEY};
use crate::fetcher::request::{RawResponse, RequestSpec};
use crate::fetcher::retry::RetryPolicy;
use crate::fetcher::transport::{HttpTransport, ReqwestTransport, RetryingTransport};
use crate::fetcher::{FetcherResult, Record};
use crate::range::{RangeExecutor, RangeRequest, RangeResult};
use crate::table::Table;

/// Client for a quota-limited, paginated HTTP API
#[derive(Clone)]
pub struct ApiClient {
    config: ClientConfig,
    pacer: Arc<Pacer>,
    executor: RequestExecutor,
    walker: PageWalker,
    range: RangeExecutor,
}

impl ApiClient {
    /// Create a client that talks to `config.base_url` over HTTP
    ///
    /// # Errors
    /// Returns [`ConfigError`] if any knob is out of range or the HTTP client cannot be built
    pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let transport = ReqwestTransport::new(&config)?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Create a client over a caller-supplied transport
    ///
    /// The transient-error retry layer is added on top of `transport`.
    pub fn with_transport(
        config: ClientConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let pacer = Arc::new(Pacer::per_minute(config.rate_limit)?);
        let retrying = Arc::new(RetryingTransport::new(transport, Arc::clone(&pacer)));
        let executor = RequestExecutor::new(
            retrying,
            Arc::clone(&pacer),
            RetryPolicy::from_config(&config),
        );
        let walker = PageWalker::new(executor.clone()).with_max_pages(config.max_pages);
        let range = RangeExecutor::new(config.max_workers);

        debug!(
            base_url = %config.base_url,
            rate_limit = config.rate_limit,
            max_workers = config.max_workers,
            "API client created"
        );

        Ok(Self {
            config,
            pacer,
            executor,
            walker,
            range,
        })
    }

    /// Configuration the client was built with
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The pacer shared by every request this client sends
    pub fn pacer(&self) -> &Arc<Pacer> {
        &self.pacer
    }

    /// Send one request and return the 2xx response
    pub async fn execute(&self, spec: &RequestSpec) -> FetcherResult<RawResponse> {
        self.executor.execute(spec).await
    }

    /// GET `path` and return the body text
    pub async fn get_raw<K, V, I>(&self, path: &str, params: I) -> FetcherResult<String>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let spec = RequestSpec::get(path).with_params(params);
        Ok(self.executor.execute(&spec).await?.body)
    }

    /// Send one request and decode the body as JSON
    pub async fn fetch_json(&self, spec: &RequestSpec) -> FetcherResult<Value> {
        self.executor.fetch_json(spec).await
    }

    /// GET every page of `path` and concatenate the `data` records
    ///
    /// `params` are sent on every page; the continuation token is added as
    /// the `pagination_key` query parameter.
    pub async fn fetch_all_pages<K, V, I>(&self, path: &str, params: I) -> FetcherResult<Vec<Record>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let base = RequestSpec::get(path).with_params(params);
        self.walker
            .fetch_all_pages(|token| match token {
                Some(token) => base.clone().with_query(PAGINATION_KEY, token),
                None => base.clone(),
            })
            .await
    }

    /// Walk pages with a caller-built request per page
    pub async fn fetch_pages_with<F>(&self, build: F) -> FetcherResult<Vec<Record>>
    where
        F: FnMut(Option<&str>) -> RequestSpec,
    {
        self.walker.fetch_all_pages(build).await
    }

    /// Fetch every day of a range with `max_workers` concurrency
    ///
    /// `per_day` should issue its requests through this client so that all
    /// days share the pacer.
    pub async fn fetch_range<F, Fut>(&self, request: &RangeRequest, per_day: F) -> RangeResult<Table>
    where
        F: Fn(NaiveDate) -> Fut,
        Fut: Future<Output = FetcherResult<Vec<Record>>>,
    {
        self.range.run(request, per_day).await
    }
}
