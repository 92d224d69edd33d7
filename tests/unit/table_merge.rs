//! Unit tests for range merging, independent of any transport

use chrono::{Datelike, NaiveDate};
use quota_fetch::range::{RangeExecutor, RangeRequest};
use quota_fetch::table::{Column, ColumnKind, Schema, Table};
use quota_fetch::{FetcherResult, Record};
use serde_json::{json, Value};
use std::time::Duration;

fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        other => panic!("not an object: {other}"),
    }
}

/// Two rows per day, except the 16th which is empty. Later days finish
/// first so pooled completion order is the reverse of date order.
async fn fake_day(day: NaiveDate) -> FetcherResult<Vec<Record>> {
    let delay = 40 - u64::from(day.day());
    tokio::time::sleep(Duration::from_millis(delay)).await;
    if day.day() == 16 {
        return Ok(Vec::new());
    }
    let date = day.to_string();
    Ok(vec![
        record(json!({"Date": date, "Code": "72030", "Close": 2500.0})),
        record(json!({"Date": date, "Code": "13010", "Close": 3100.5})),
    ])
}

fn request() -> RangeRequest {
    RangeRequest::between("2024-01-15", "2024-01-19").with_sort_keys(["Date", "Code"])
}

fn codes(table: &Table) -> Vec<String> {
    table
        .rows()
        .iter()
        .map(|row| format!("{}/{}", row["Date"].as_str().unwrap(), row["Code"].as_str().unwrap()))
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_pooled_and_serial_results_match() {
    let serial = RangeExecutor::new(1).run(&request(), fake_day).await.unwrap();
    let pooled = RangeExecutor::new(3).run(&request(), fake_day).await.unwrap();

    assert_eq!(serial, pooled);
    assert_eq!(serial.len(), 8);
    assert_eq!(
        codes(&serial)[..3],
        [
            "2024-01-15/13010".to_string(),
            "2024-01-15/72030".to_string(),
            "2024-01-17/13010".to_string()
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_all_empty_days_keep_declared_schema() {
    let schema = Schema::new([
        Column::new("Date", ColumnKind::Date),
        Column::new("Code", ColumnKind::String),
        Column::new("Close", ColumnKind::Float),
    ]);
    let request = request().with_schema(schema.clone());

    let table = RangeExecutor::new(2)
        .run(&request, |_day| async { FetcherResult::Ok(Vec::new()) })
        .await
        .unwrap();

    assert!(table.is_empty());
    assert_eq!(table.schema(), &schema);
}

#[tokio::test(start_paused = true)]
async fn test_ensure_all_columns_reorders_and_fills() {
    let schema = Schema::new([
        Column::new("Code", ColumnKind::String),
        Column::new("Date", ColumnKind::Date),
        Column::new("Value", ColumnKind::Integer),
        Column::new("Extra", ColumnKind::String),
    ]);
    let request = RangeRequest::between("2024-01-15", "2024-01-15")
        .with_schema(schema.clone())
        .with_sort_keys(["Code"])
        .with_ensure_all_columns(true);

    let table = RangeExecutor::new(1)
        .run(&request, |day| async move {
            FetcherResult::Ok(vec![record(
                json!({"Value": 100, "Code": "1301", "Date": day.to_string(), "Ignored": true}),
            )])
        })
        .await
        .unwrap();

    let names: Vec<_> = table.schema().names().collect();
    assert_eq!(names, ["Code", "Date", "Value", "Extra"]);
    let row = &table.rows()[0];
    assert_eq!(row["Extra"], Value::Null);
    assert!(row.get("Ignored").is_none());
}

#[tokio::test(start_paused = true)]
async fn test_extra_columns_kept_without_ensure() {
    let schema = Schema::new([Column::new("Code", ColumnKind::String)]);
    let request = RangeRequest::between("2024-01-15", "2024-01-15").with_schema(schema);

    let table = RangeExecutor::new(1)
        .run(&request, |_day| async {
            FetcherResult::Ok(vec![record(json!({"Code": "1301", "Turnover": 12}))])
        })
        .await
        .unwrap();

    assert!(table.schema().contains("Turnover"));
    assert_eq!(table.schema().names().next(), Some("Code"));
}

#[tokio::test(start_paused = true)]
async fn test_sort_puts_nulls_last() {
    let request = RangeRequest::between("2024-01-15", "2024-01-15").with_sort_keys(["Close"]);
    let table = RangeExecutor::new(1)
        .run(&request, |_day| async {
            FetcherResult::Ok(vec![
                record(json!({"Close": null})),
                record(json!({"Close": 10})),
                record(json!({"Close": 2.5})),
            ])
        })
        .await
        .unwrap();

    let closes: Vec<_> = table.column_values("Close").cloned().collect();
    assert_eq!(closes, vec![json!(2.5), json!(10), Value::Null]);
}
