//! Integration tests for the reqwest transport against a mock HTTP server

use quota_fetch::{ApiClient, ClientConfig, FetcherError, RequestSpec};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{header, header_regex, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(base_url: &str) -> ClientConfig {
    ClientConfig::new(base_url)
        .with_api_key("  test-key  ")
        .with_rate_limit(6_000)
        .with_request_timeout_secs(5)
}

#[tokio::test]
async fn test_headers_and_query_sent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/equities/master"))
        .and(query_param("code", "7203"))
        .and(query_param("date", "2024-01-15"))
        .and(header("x-api-key", "test-key"))
        .and(header_regex("user-agent", "^quota-fetch/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [{ "Code": "7203" }] })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = ApiClient::new(config_for(&mock_server.uri())).unwrap();
    let records = client
        .fetch_all_pages("/equities/master", [("code", "7203"), ("date", "2024-01-15")])
        .await
        .unwrap();
    assert_eq!(records.len(), 1);

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url.query(), Some("code=7203&date=2024-01-15"));
}

#[tokio::test]
async fn test_pagination_key_sent_as_query_parameter() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/fins/summary"))
        .and(query_param_is_missing("pagination_key"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "data": [{ "n": 1 }], "pagination_key": "abc+/=" })),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/fins/summary"))
        .and(query_param("pagination_key", "abc+/="))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [{ "n": 2 }] })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = ApiClient::new(config_for(&mock_server.uri())).unwrap();
    let records = client
        .fetch_all_pages("/fins/summary", [("code", "7203")])
        .await
        .unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1]["n"], 2);

    let requests = mock_server.received_requests().await.unwrap();
    let second = requests[1].url.query().unwrap_or_default();
    assert!(second.contains("pagination_key=abc%2B%2F%3D"), "{second}");
}

#[tokio::test]
async fn test_service_unavailable_retried_over_network() {
    let mock_server = MockServer::start().await;

    // Answer 503 once, then fall through to the success mock
    Mock::given(method("GET"))
        .and(path("/markets/calendar"))
        .respond_with(
            ResponseTemplate::new(503)
                .set_body_string("busy")
                .insert_header("Retry-After", "0"),
        )
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/markets/calendar"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = ApiClient::new(config_for(&mock_server.uri())).unwrap();
    let value = client
        .fetch_json(&RequestSpec::get("/markets/calendar"))
        .await
        .unwrap();
    assert_eq!(value["ok"], true);
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_status_classification_over_network() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/listed/info"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({ "message": "forbidden" })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/prices/daily_quotes"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({ "message": "Rate exceeded" })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client =
        ApiClient::new(config_for(&mock_server.uri()).with_retry_on_429(false)).unwrap();

    match client.execute(&RequestSpec::get("/listed/info")).await {
        Err(FetcherError::Forbidden { status, message, .. }) => {
            assert_eq!(status, 403);
            assert_eq!(message, "forbidden");
        }
        other => panic!("expected Forbidden, got {other:?}"),
    }
    match client.execute(&RequestSpec::get("/prices/daily_quotes")).await {
        Err(FetcherError::RateLimited { status, message, .. }) => {
            assert_eq!(status, 429);
            assert_eq!(message, "Rate exceeded");
        }
        other => panic!("expected RateLimited, got {other:?}"),
    }
}

#[tokio::test]
async fn test_slow_response_is_timeout_transport_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/listed/info"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "data": [] }))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&mock_server)
        .await;

    let config = config_for(&mock_server.uri()).with_request_timeout_secs(1);
    let client = ApiClient::new(config).unwrap();
    let err = client
        .execute(&RequestSpec::get("/listed/info"))
        .await
        .unwrap_err();

    match err {
        FetcherError::Transport(inner) => assert!(inner.is_timeout(), "{inner:?}"),
        other => panic!("expected a transport timeout, got {other:?}"),
    }
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    drop(mock_server);

    let client = ApiClient::new(config_for(&base_url)).unwrap();
    let err = client
        .execute(&RequestSpec::get("/listed/info"))
        .await
        .unwrap_err();

    assert!(err.is_transport(), "{err:?}");
    assert_eq!(err.status(), None);
}
