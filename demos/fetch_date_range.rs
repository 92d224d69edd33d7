//! Example fetching a paginated dataset and a date range
//!
//! Run with:
//! ```bash
//! API_BASE_URL=https://api.example.com/v2 API_KEY=... cargo run --example fetch_date_range
//! ```
//!
//! Set `METRICS_ADDR=0.0.0.0:9090` to expose Prometheus metrics while it runs.

use quota_fetch::table::{Column, ColumnKind, Schema};
use quota_fetch::{metrics, ApiClient, ClientConfig, RangeRequest};
use std::net::SocketAddr;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("quota_fetch=debug")),
        )
        .init();

    if let Ok(addr) = std::env::var("METRICS_ADDR") {
        let addr: SocketAddr = addr.parse()?;
        metrics::init_metrics(addr).await?;
    }

    let base_url = std::env::var("API_BASE_URL")?;
    let mut config = ClientConfig::new(base_url).with_rate_limit(60).with_max_workers(3);
    if let Ok(key) = std::env::var("API_KEY") {
        config = config.with_api_key(key);
    }
    let client = ApiClient::new(config)?;

    let listed = client
        .fetch_all_pages("/equities/master", Vec::<(String, String)>::new())
        .await?;
    info!(count = listed.len(), "Fetched listed issues");

    let schema = Schema::new([
        Column::new("Date", ColumnKind::Date),
        Column::new("Code", ColumnKind::String),
        Column::new("Close", ColumnKind::Float),
    ]);
    let request = RangeRequest::between("2024-01-15", "2024-01-19")
        .with_schema(schema)
        .with_sort_keys(["Date", "Code"]);

    let table = client
        .fetch_range(&request, |day| {
            let client = &client;
            async move {
                client
                    .fetch_all_pages("/equities/bars/daily", [("date", day.to_string())])
                    .await
            }
        })
        .await?;

    let columns: Vec<_> = table.schema().names().collect();
    println!("{} rows, columns: {}", table.len(), columns.join(", "));
    for row in table.rows().iter().take(5) {
        println!("{}", serde_json::Value::Object(row.clone()));
    }
    Ok(())
}
