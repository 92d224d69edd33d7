//! Date-range fetching
//!
//! [`RangeExecutor`] calls a per-day fetch for every date of an inclusive
//! range, serially or through a bounded pool, and merges the partial results
//! into one sorted [`Table`](crate::table::Table).

use crate::fetcher::FetcherError;

pub mod date;
pub mod executor;

pub use date::{normalize_date, DateInput, DateRange};
pub use executor::{RangeExecutor, RangeRequest};

/// Range fetch errors
#[derive(Debug, thiserror::Error)]
pub enum RangeError {
    /// Bad date input or `start > end`; raised before any request is sent
    #[error("invalid date range: {0}")]
    Validation(String),

    /// A per-day fetch failed; the whole range is abandoned
    #[error(transparent)]
    Fetch(#[from] FetcherError),
}

/// Result type for range operations
pub type RangeResult<T> = Result<T, RangeError>;
