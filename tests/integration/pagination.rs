//! Integration tests for continuation-token pagination

use crate::support::{client_over, page, test_config, ScriptedTransport};
use quota_fetch::{FetcherError, RawResponse, RequestSpec};
use serde_json::json;
use std::sync::Arc;

#[tokio::test(start_paused = true)]
async fn test_pages_concatenated_in_order() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .respond_json(200, page(json!([{"Code": "1301"}]), Some("key1")))
            .respond_json(200, page(json!([{"Code": "1302"}, {"Code": "1303"}]), Some("key2")))
            .respond_json(200, page(json!([{"Code": "1304"}]), None)),
    );
    let client = client_over(test_config(), &transport);

    let records = client
        .fetch_all_pages("/equities/master", [("date", "2024-01-15")])
        .await
        .unwrap();

    let codes: Vec<_> = records.iter().map(|r| r["Code"].as_str().unwrap()).collect();
    assert_eq!(codes, ["1301", "1302", "1303", "1304"]);

    let requests = transport.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[0].query_value("pagination_key"), None);
    assert_eq!(requests[1].query_value("pagination_key"), Some("key1"));
    assert_eq!(requests[2].query_value("pagination_key"), Some("key2"));
    for request in &requests {
        assert_eq!(request.query_value("date"), Some("2024-01-15"));
    }
}

#[tokio::test(start_paused = true)]
async fn test_single_page_makes_one_call() {
    let transport =
        Arc::new(ScriptedTransport::new().respond_json(200, page(json!([{"Code": "1301"}]), None)));
    let client = client_over(test_config(), &transport);

    let records = client
        .fetch_all_pages("/equities/master", Vec::<(String, String)>::new())
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(transport.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_runaway_pagination_hits_ceiling() {
    let transport = Arc::new(ScriptedTransport::new().with_handler(|spec| {
        let next = match spec.query_value("pagination_key") {
            Some(key) => key.parse::<u32>().unwrap() + 1,
            None => 1,
        };
        RawResponse::new(200, page(json!([{"n": next}]), Some(&next.to_string())).to_string())
    }));
    let client = client_over(test_config().with_max_pages(3), &transport);

    let err = client
        .fetch_all_pages("/equities/master", [("code", "7203")])
        .await
        .unwrap_err();

    assert_eq!(err.status(), None);
    assert!(err.to_string().contains("max_pages"));
    assert_eq!(transport.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_repeated_token_rejected() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .respond_json(200, page(json!([{"Code": "1301"}]), Some("same_key")))
            .respond_json(200, page(json!([{"Code": "1302"}]), Some("same_key"))),
    );
    let client = client_over(test_config(), &transport);

    let err = client
        .fetch_all_pages("/equities/master", [("code", "7203")])
        .await
        .unwrap_err();
    assert!(err.to_string().contains("pagination_key repeated"));
    assert_eq!(err.status(), None);
    assert_eq!(transport.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_structural_violation_aborts_walk() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .respond_json(200, page(json!([{"Code": "1301"}]), Some("key1")))
            .respond_json(200, json!({"info": []})),
    );
    let client = client_over(test_config(), &transport);

    let err = client
        .fetch_all_pages("/fins/summary", [("code", "7203")])
        .await
        .unwrap_err();
    match err {
        FetcherError::Api { status: None, message, .. } => {
            assert!(message.contains("/fins/summary"));
            assert!(message.contains("data"));
        }
        other => panic!("expected contract violation, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_each_page_consumes_a_pacer_slot() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .respond_json(200, page(json!([]), Some("a")))
            .respond_json(200, page(json!([]), Some("b")))
            .respond_json(200, page(json!([]), None)),
    );
    let client = client_over(test_config().with_rate_limit(12), &transport);

    client
        .fetch_all_pages("/equities/master", [("code", "7203")])
        .await
        .unwrap();
    for gap in transport.gaps() {
        assert!(gap >= std::time::Duration::from_secs(5), "gap {gap:?}");
    }
}

#[tokio::test(start_paused = true)]
async fn test_custom_request_builder() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .respond_json(200, page(json!([{"v": 1}]), Some("t")))
            .respond_json(200, page(json!([{"v": 2}]), None)),
    );
    let client = client_over(test_config(), &transport);

    let records = client
        .fetch_pages_with(|token| {
            let spec = RequestSpec::get("/derivatives/bars/daily/options").with_query("date", "2024-01-15");
            match token {
                Some(token) => spec.with_query("cursor", token),
                None => spec,
            }
        })
        .await
        .unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(transport.requests()[1].query_value("cursor"), Some("t"));
}
