//! Unit tests for date normalization and range enumeration

use chrono::NaiveDate;
use quota_fetch::range::{normalize_date, DateInput, DateRange, RangeError};

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn test_text_and_value_inputs_agree() {
    let inputs: [DateInput; 4] = [
        "2024-1-5".into(),
        "2024-01-05".into(),
        " 2024-01-05 ".into(),
        ymd(2024, 1, 5).into(),
    ];
    for input in &inputs {
        assert_eq!(normalize_date(input, "start_dt").unwrap(), ymd(2024, 1, 5), "{input}");
    }
}

#[test]
fn test_rejected_shapes() {
    for text in ["20240105", "2024-01", "2024-01-05-01", "2024-001-05", "abcd-01-05", "", "2024-１-05"] {
        let err = normalize_date(&text.into(), "start_dt").unwrap_err();
        assert!(matches!(err, RangeError::Validation(_)), "{text}");
    }
}

#[test]
fn test_compact_form_message_is_friendly() {
    let err = normalize_date(&"20240115".into(), "start_dt").unwrap_err();
    let message = err.to_string();
    assert!(message.contains("YYYY-MM-DD"));
    assert!(message.contains("YYYYMMDD"));
    assert!(message.contains("start_dt"));
}

#[test]
fn test_single_day_range() {
    let range = DateRange::resolve(&"2024-01-15".into(), Some(&"2024-1-15".into())).unwrap();
    assert_eq!(range.days().collect::<Vec<_>>(), vec![ymd(2024, 1, 15)]);
}

#[test]
fn test_range_crosses_year_boundary() {
    let range = DateRange::new(ymd(2023, 12, 30), ymd(2024, 1, 2)).unwrap();
    let days: Vec<_> = range.days().collect();
    assert_eq!(
        days,
        vec![ymd(2023, 12, 30), ymd(2023, 12, 31), ymd(2024, 1, 1), ymd(2024, 1, 2)]
    );
}

#[test]
fn test_start_after_end_rejected() {
    let err = DateRange::new(ymd(2024, 1, 20), ymd(2024, 1, 15)).unwrap_err();
    assert!(matches!(err, RangeError::Validation(_)));
}
