//! Pipeline tests against local Gemini and analytics stand-ins
//!
//! These exercise the real HTTP clients: request shapes, auth headers,
//! query-string encoding and upstream error propagation.

mod common;

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::json;

use common::{ANALYTICS_KEY, BAYC, FakeAnalytics, FakeGemini, GEMINI_KEY};
use crunchbot::Error;
use crunchbot::analytics::EndpointName;
use crunchbot::pipeline::Pipeline;

async fn pipeline(gemini: &FakeGemini, analytics: &FakeAnalytics) -> Pipeline {
    let config = common::config(&gemini.start().await, &analytics.start().await);
    Pipeline::from_config(&config).unwrap()
}

#[tokio::test]
async fn test_bayc_sales_trends_end_to_end() {
    let gemini = FakeGemini::new([
        format!(
            "```json\n{{\"endpoint\": \"analytics\", \"queryParams\": {{\"contract_address\": \"{BAYC}\", \"time_range\": \"30d\", \"sort_by\": \"sales\"}}}}\n```"
        ),
        r#"{"summary": "Sales rose like a queue forming outside a bakery.", "graph": {"x": ["2024-05-01", "2024-05-02"], "x_label": "Date", "y": [12, 30], "y_label": "Sales"}}"#.to_string(),
    ]);
    let payload = json!({"data": [{"sales": 42, "sales_trend": [12, 30], "block_dates": ["2024-05-01", "2024-05-02"]}]});
    let analytics = FakeAnalytics::new(StatusCode::OK, payload.clone());

    let response = pipeline(&gemini, &analytics)
        .await
        .query("Show me BAYC sales trends")
        .await
        .unwrap();

    assert_eq!(response.source, EndpointName::Analytics);
    assert_eq!(response.data, payload);
    assert!(response.summary.starts_with("Sales rose"));
    let graph = response.graph.unwrap();
    assert_eq!(graph.x_label, "Date");
    assert_eq!(graph.y.len(), 2);

    let hits = analytics.hits();
    assert_eq!(hits.len(), 1);
    let hit = &hits[0];
    assert_eq!(hit.path, "/nft/collection/analytics");
    assert_eq!(hit.api_key.as_deref(), Some(ANALYTICS_KEY));
    assert_eq!(hit.param("blockchain"), Some("ethereum"));
    assert_eq!(hit.param("contract_address"), Some(BAYC));
    assert_eq!(hit.param("time_range"), Some("30d"));
    assert_eq!(hit.param("sort_by"), Some("sales"));

    let requests = gemini.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].0.as_deref(), Some(GEMINI_KEY));
    let route_prompt = requests[0].1["systemInstruction"]["parts"][0]["text"]
        .as_str()
        .unwrap();
    assert!(route_prompt.contains("whales"));
    assert!(route_prompt.contains("holders"));
    assert_eq!(
        requests[0].1["contents"][0]["parts"][0]["text"],
        "User: Show me BAYC sales trends"
    );
}

#[tokio::test]
async fn test_whales_defaults_and_invalid_sort_dropped() {
    let gemini = FakeGemini::new([
        r#"{"endpoint": "whales", "queryParams": {"sort_by": "floor_price", "contract_address": ""}}"#,
        r#"{"summary": "Whales are quiet.", "graph": null}"#,
    ]);
    let analytics = FakeAnalytics::new(StatusCode::OK, json!({"data": []}));

    pipeline(&gemini, &analytics)
        .await
        .query("who are the whales?")
        .await
        .unwrap();

    let hit = &analytics.hits()[0];
    assert_eq!(hit.path, "/nft/collection/whales");
    assert_eq!(
        hit.query,
        vec![
            ("blockchain".to_string(), "ethereum".to_string()),
            ("offset".to_string(), "0".to_string()),
            ("limit".to_string(), "30".to_string()),
            ("sort_order".to_string(), "desc".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_gateway_error_stops_before_summary() {
    let gemini = FakeGemini::new([r#"{"endpoint": "scores", "queryParams": {}}"#]);
    let analytics = FakeAnalytics::new(
        StatusCode::FORBIDDEN,
        json!({"message": "Invalid API key"}),
    );

    let err = pipeline(&gemini, &analytics)
        .await
        .query("scores?")
        .await
        .unwrap_err();

    match err {
        Error::Gateway { status, body } => {
            assert_eq!(status, 403);
            assert!(body.contains("Invalid API key"));
        }
        other => panic!("expected gateway error, got {other:?}"),
    }
    assert_eq!(gemini.requests().len(), 1);
}

#[tokio::test]
async fn test_unparsable_routing_output() {
    let gemini = FakeGemini::new(["Sure! You probably want the whales endpoint."]);
    let analytics = FakeAnalytics::new(StatusCode::OK, json!({}));

    let err = pipeline(&gemini, &analytics)
        .await
        .query("whales")
        .await
        .unwrap_err();

    assert!(
        matches!(err, Error::Routing { ref raw, .. } if raw == "Sure! You probably want the whales endpoint.")
    );
    assert!(analytics.hits().is_empty());
}

#[tokio::test]
async fn test_llm_upstream_failure() {
    let gemini = FakeGemini::new(Vec::<String>::new());
    let analytics = FakeAnalytics::new(StatusCode::OK, json!({}));

    let err = pipeline(&gemini, &analytics)
        .await
        .route("anything")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Llm(_)));
}
