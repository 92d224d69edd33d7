//! Calendar date inputs and inclusive ranges

use chrono::{Local, NaiveDate};
use std::fmt;

use super::{RangeError, RangeResult};

/// A date given either as a value or as `YYYY-MM-DD` text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateInput {
    /// Already a calendar date
    Date(NaiveDate),
    /// Text such as `2024-01-05` or `2024-1-5`
    Text(String),
}

impl From<NaiveDate> for DateInput {
    fn from(date: NaiveDate) -> Self {
        Self::Date(date)
    }
}

impl From<&str> for DateInput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for DateInput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl fmt::Display for DateInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            Self::Text(text) => f.write_str(text),
        }
    }
}

fn is_digits(part: &str, min: usize, max: usize) -> bool {
    (min..=max).contains(&part.len()) && part.bytes().all(|b| b.is_ascii_digit())
}

/// Resolve `input` to a calendar date
///
/// Text must be `YYYY-MM-DD`; one-digit month and day are accepted
/// (`2024-1-5` equals `2024-01-05`). `field` names the argument in errors.
///
/// # Errors
/// [`RangeError::Validation`] for any other shape (notably `YYYYMMDD`) or an
/// impossible date
pub fn normalize_date(input: &DateInput, field: &str) -> RangeResult<NaiveDate> {
    let text = match input {
        DateInput::Date(date) => return Ok(*date),
        DateInput::Text(text) => text.trim(),
    };

    let parts: Vec<&str> = text.split('-').collect();
    let well_formed = matches!(
        parts.as_slice(),
        [year, month, day] if is_digits(year, 4, 4) && is_digits(month, 1, 2) && is_digits(day, 1, 2)
    );
    if !well_formed {
        return Err(RangeError::Validation(format!(
            "{field} must be in YYYY-MM-DD format (e.g. 2024-01-15), got '{text}'; \
             compact YYYYMMDD is not accepted"
        )));
    }

    let parse = |s: &str| s.parse::<u32>().unwrap_or(0);
    let year = parse(parts[0]) as i32;
    NaiveDate::from_ymd_opt(year, parse(parts[1]), parse(parts[2])).ok_or_else(|| {
        RangeError::Validation(format!("{field} is not a valid calendar date: '{text}'"))
    })
}

/// Inclusive range of calendar dates with `start <= end`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Create a range from already resolved dates
    ///
    /// # Errors
    /// [`RangeError::Validation`] when `start > end`
    pub fn new(start: NaiveDate, end: NaiveDate) -> RangeResult<Self> {
        if start > end {
            return Err(RangeError::Validation(format!(
                "start_dt ({}) must not be after end_dt ({})",
                start.format("%Y-%m-%d"),
                end.format("%Y-%m-%d")
            )));
        }
        Ok(Self { start, end })
    }

    /// Resolve inputs and build the range; a missing `end` means today
    pub fn resolve(start: &DateInput, end: Option<&DateInput>) -> RangeResult<Self> {
        let start = normalize_date(start, "start_dt")?;
        let end = match end {
            Some(end) => normalize_date(end, "end_dt")?,
            None => Local::now().date_naive(),
        };
        Self::new(start, end)
    }

    /// First day
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last day (inclusive)
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of days, counting both ends
    pub fn len(&self) -> usize {
        self.end.signed_duration_since(self.start).num_days() as usize + 1
    }

    /// Always false; a valid range holds at least one day
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Every day in ascending order
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |day| *day <= end)
    }
}
