//! # quota-fetch
//!
//! Client core for HTTP data APIs that enforce a per-minute request quota and
//! serve results in pages.
//!
//! ## Features
//!
//! - **Pacing**: one shared pacer spaces every dispatch, retries included
//! - **Retries**: bounded retry of 5xx responses and of 429 quota rejections,
//!   honouring `Retry-After`
//! - **Typed errors**: forbidden, throttled, API failure and network failure
//!   are distinct variants
//! - **Pagination**: continuation tokens walked into one record list, with
//!   runaway and malformed-page detection
//! - **Date ranges**: per-day fetches run serially or through a bounded pool,
//!   merged into a deterministically sorted table
//!
//! ## Quick Start
//!
//! ```no_run
//! use quota_fetch::{ApiClient, ClientConfig, RangeRequest};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::new("https://api.example.com/v2")
//!     .with_api_key("secret")
//!     .with_rate_limit(60)
//!     .with_max_workers(4);
//! let client = ApiClient::new(config)?;
//!
//! let listed = client.fetch_all_pages("/equities/master", [("code", "7203")]).await?;
//! println!("{} listings", listed.len());
//!
//! let request = RangeRequest::between("2024-01-15", "2024-01-19").with_sort_keys(["Date", "Code"]);
//! let table = client
//!     .fetch_range(&request, |day| {
//!         let client = &client;
//!         async move {
//!             client
//!                 .fetch_all_pages("/equities/bars/daily", [("date", day.to_string())])
//!                 .await
//!         }
//!     })
//!     .await?;
//! println!("{} rows", table.len());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod client;
pub mod config;
pub mod fetcher;
pub mod metrics;
pub mod range;
pub mod table;

pub use client::ApiClient;
pub use config::{ClientConfig, ConfigError};
pub use fetcher::executor::RequestExecutor;
pub use fetcher::pacer::{Pacer, Quota};
pub use fetcher::pagination::PageWalker;
pub use fetcher::request::{HttpMethod, RawResponse, RequestSpec};
pub use fetcher::retry::RetryPolicy;
pub use fetcher::transport::{HttpTransport, ReqwestTransport, RetryingTransport};
pub use fetcher::{FetcherError, FetcherResult, Record, TransportError};
pub use range::{DateInput, DateRange, RangeError, RangeExecutor, RangeRequest};
pub use table::{Column, ColumnKind, Schema, Table};
