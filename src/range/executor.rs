//! Per-day orchestration over a date range

use chrono::NaiveDate;
use futures_util::stream::{self, StreamExt, TryStreamExt};
use std::future::Future;
use tracing::debug;

use super::date::{DateInput, DateRange};
use super::RangeResult;
use crate::config::DEFAULT_MAX_WORKERS;
use crate::fetcher::{FetcherResult, Record};
use crate::metrics;
use crate::table::{Schema, Table};

/// What to fetch and how to shape the merged result
#[derive(Debug, Clone)]
pub struct RangeRequest {
    start: DateInput,
    end: Option<DateInput>,
    sort_keys: Vec<String>,
    schema: Schema,
    ensure_all_columns: bool,
}

impl RangeRequest {
    /// Range from `start` to today
    pub fn new(start: impl Into<DateInput>) -> Self {
        Self {
            start: start.into(),
            end: None,
            sort_keys: Vec::new(),
            schema: Schema::default(),
            ensure_all_columns: false,
        }
    }

    /// Range from `start` to `end`, both inclusive
    pub fn between(start: impl Into<DateInput>, end: impl Into<DateInput>) -> Self {
        Self::new(start).with_end(end)
    }

    /// Set the last day (inclusive)
    pub fn with_end(mut self, end: impl Into<DateInput>) -> Self {
        self.end = Some(end.into());
        self
    }

    /// Natural ordering of the dataset, e.g. `["Date", "Code"]`
    pub fn with_sort_keys<S: Into<String>>(mut self, keys: impl IntoIterator<Item = S>) -> Self {
        self.sort_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Declared columns, used for empty results and column ordering
    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    /// Restrict rows to the declared columns, filling gaps with null
    pub fn with_ensure_all_columns(mut self, enabled: bool) -> Self {
        self.ensure_all_columns = enabled;
        self
    }

    /// Declared schema
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Sort keys
    pub fn sort_keys(&self) -> &[String] {
        &self.sort_keys
    }

    /// Resolve and validate the dates
    pub fn resolve(&self) -> RangeResult<DateRange> {
        DateRange::resolve(&self.start, self.end.as_ref())
    }
}

/// Runs per-day fetches serially or through a bounded pool
#[derive(Debug, Clone, Copy)]
pub struct RangeExecutor {
    workers: usize,
}

impl Default for RangeExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_WORKERS)
    }
}

impl RangeExecutor {
    /// Create an executor running at most `workers` days at once
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    /// Configured worker count
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Fetch every day of the range and merge the results
    ///
    /// With one worker, days are fetched one after another in ascending
    /// order. With more, up to `workers` days are in flight at once, started
    /// in ascending order. Every per-day fetch should go through the same
    /// client so the shared pacer bounds the combined request rate.
    ///
    /// Days with no records are dropped. If none remain the result is an
    /// empty table with the declared schema; otherwise the records are
    /// concatenated in date order and sorted by the sort keys.
    ///
    /// # Errors
    /// [`RangeError::Validation`](super::RangeError::Validation) before any
    /// fetch, or the first per-day failure, which abandons the range
    pub async fn run<F, Fut>(&self, request: &RangeRequest, per_day: F) -> RangeResult<Table>
    where
        F: Fn(NaiveDate) -> Fut,
        Fut: Future<Output = FetcherResult<Vec<Record>>>,
    {
        let range = request.resolve()?;
        debug!(
            start = %range.start(),
            end = %range.end(),
            days = range.len(),
            workers = self.workers,
            "Starting range fetch"
        );

        let mut parts: Vec<(NaiveDate, Vec<Record>)> = if self.workers == 1 {
            let mut parts = Vec::with_capacity(range.len());
            for day in range.days() {
                let records = per_day(day).await?;
                metrics::record_range_day();
                parts.push((day, records));
            }
            parts
        } else {
            stream::iter(range.days())
                .map(|day| {
                    let fetch = per_day(day);
                    async move {
                        let records = fetch.await?;
                        metrics::record_range_day();
                        FetcherResult::Ok((day, records))
                    }
                })
                .buffer_unordered(self.workers)
                .try_collect::<Vec<_>>()
                .await?
        };

        parts.sort_by_key(|(day, _)| *day);
        Ok(merge(request, parts))
    }
}

fn merge(request: &RangeRequest, parts: Vec<(NaiveDate, Vec<Record>)>) -> Table {
    let tables: Vec<Table> = parts
        .into_iter()
        .filter(|(_, records)| !records.is_empty())
        .map(|(_, records)| Table::from_records(&request.schema, records))
        .collect();

    if tables.is_empty() {
        debug!("Range fetch returned no rows");
        return Table::empty(request.schema.clone());
    }

    let mut table = Table::concat(&request.schema, tables);
    table.sort_by_keys(&request.sort_keys);
    if request.ensure_all_columns {
        table.conform_to(&request.schema);
    }
    debug!(rows = table.len(), "Range fetch merged");
    table
}
