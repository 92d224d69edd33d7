//! Continuation-token pagination
//!
//! Paginated endpoints answer with `{"data": [...], "pagination_key": "..."}`.
//! [`PageWalker`] follows the token until a page omits it, concatenating the
//! `data` records in page order. Structural surprises are reported as
//! [`FetcherError::Api`] without a status, never as silent truncation.

use serde_json::Value;
use std::collections::HashSet;
use tracing::debug;

use super::executor::RequestExecutor;
use super::request::RequestSpec;
use super::{FetcherError, FetcherResult, Record};
use crate::config::DEFAULT_MAX_PAGES;
use crate::metrics;

/// Response field and query parameter carrying the continuation token
pub const PAGINATION_KEY: &str = "pagination_key";

/// Response field holding the page's records
pub const DATA_FIELD: &str = "data";

/// One decoded page
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// Records in server order
    pub records: Vec<Record>,
    /// Token for the next page; `None` on the last page
    pub next_token: Option<String>,
}

impl Page {
    /// Validate the shape of a decoded page body
    ///
    /// # Errors
    /// [`FetcherError::Api`] (no status) when the body is not an object, has no
    /// list under `data`, holds a non-object record, or carries a token that
    /// is neither a string nor null
    pub fn parse(path: &str, value: Value) -> FetcherResult<Self> {
        let mut object = match value {
            Value::Object(object) => object,
            other => {
                return Err(FetcherError::contract(format!(
                    "Unexpected response from {path}: expected dict, got {}",
                    json_type_name(&other)
                )))
            }
        };

        let data = object.remove(DATA_FIELD).ok_or_else(|| {
            FetcherError::contract(format!(
                "Unexpected response from {path}: missing '{DATA_FIELD}' field"
            ))
        })?;

        let items = match data {
            Value::Array(items) => items,
            other => {
                return Err(FetcherError::contract(format!(
                    "Unexpected response from {path}: '{DATA_FIELD}' expected list, got {}",
                    json_type_name(&other)
                )))
            }
        };

        let mut records = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            match item {
                Value::Object(record) => records.push(record),
                other => {
                    return Err(FetcherError::contract(format!(
                        "Unexpected response from {path}: '{DATA_FIELD}[{index}]' expected dict, got {}",
                        json_type_name(&other)
                    )))
                }
            }
        }

        let next_token = match object.remove(PAGINATION_KEY) {
            None | Some(Value::Null) => None,
            Some(Value::String(token)) if token.is_empty() => None,
            Some(Value::String(token)) => Some(token),
            Some(other) => {
                return Err(FetcherError::contract(format!(
                    "Unexpected response from {path}: '{PAGINATION_KEY}' expected string, got {}",
                    json_type_name(&other)
                )))
            }
        };

        Ok(Self {
            records,
            next_token,
        })
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

/// Walks a paginated endpoint into one record list
#[derive(Clone)]
pub struct PageWalker {
    executor: RequestExecutor,
    max_pages: usize,
}

impl PageWalker {
    /// Create a walker with the default page ceiling
    pub fn new(executor: RequestExecutor) -> Self {
        Self {
            executor,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    /// Set the page ceiling
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    /// Page ceiling in effect
    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    /// Fetch every page and concatenate the records
    ///
    /// `build` receives `None` for the first page and the previous page's
    /// continuation token afterwards.
    ///
    /// # Errors
    /// Any [`RequestExecutor::fetch_json`] error, a malformed page (see
    /// [`Page::parse`]), a token repeated from an earlier page, or more than
    /// `max_pages` pages
    pub async fn fetch_all_pages<F>(&self, mut build: F) -> FetcherResult<Vec<Record>>
    where
        F: FnMut(Option<&str>) -> RequestSpec,
    {
        let mut records = Vec::new();
        let mut seen_tokens = HashSet::new();
        let mut token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let spec = build(token.as_deref());
            let value = self.executor.fetch_json(&spec).await?;
            let page = Page::parse(&spec.path, value)?;
            pages += 1;

            debug!(
                path = %spec.path,
                page = pages,
                records = page.records.len(),
                more = page.next_token.is_some(),
                "Fetched page"
            );
            records.extend(page.records);

            let Some(next) = page.next_token else {
                break;
            };
            if pages >= self.max_pages {
                return Err(FetcherError::contract(format!(
                    "Pagination for {} exceeded max_pages ({})",
                    spec.path, self.max_pages
                )));
            }
            if !seen_tokens.insert(next.clone()) {
                return Err(FetcherError::contract(format!(
                    "Pagination for {}: pagination_key repeated ({next})",
                    spec.path
                )));
            }
            token = Some(next);
        }

        metrics::record_pages(pages as u64);
        Ok(records)
    }
}
