//! Integration tests for the probes, landing page and general HTTP behaviour.

mod common;

use axum::http::StatusCode;
use axum::{Json, Router, routing::get as get_route};
use common::{body_json, get};

// ---------------------------------------------------------------------------
// Test: GET /ping answers without touching the analysis API
// ---------------------------------------------------------------------------

#[tokio::test]
async fn ping_is_ok_even_when_api_is_down() {
    let app = common::build_test_app(&common::unreachable_api().await);
    let response = get(app, "/ping").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}

// ---------------------------------------------------------------------------
// Test: GET /health reflects analysis API reachability
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_is_degraded_when_api_is_unreachable() {
    let app = common::build_test_app(&common::unreachable_api().await);
    let json = body_json(get(app, "/health").await).await;

    assert_eq!(json["status"], "degraded");
    assert_eq!(json["services"]["analysis_api"]["reachable"], false);
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn health_is_healthy_when_api_answers() {
    let stub = Router::new().route("/", get_route(|| async { Json(serde_json::json!({})) }));
    let api = common::spawn_stub(stub).await;

    let app = common::build_test_app(&api);
    let json = body_json(get(app, "/health").await).await;

    assert_eq!(json["status"], "healthy");
    assert_eq!(json["services"]["analysis_api"]["reachable"], true);
}

// ---------------------------------------------------------------------------
// Test: landing page and submission page descriptors
// ---------------------------------------------------------------------------

#[tokio::test]
async fn landing_page_links_to_analyze() {
    let app = common::build_test_app(&common::unreachable_api().await);
    let json = body_json(get(app, "/").await).await;

    assert_eq!(json["features"].as_array().map(Vec::len), Some(4));
    assert_eq!(json["navigation"][0]["href"], "/analyze");
}

#[tokio::test]
async fn analyze_page_describes_upload_limits() {
    let app = common::build_test_app(&common::unreachable_api().await);
    let json = body_json(get(app, "/analyze").await).await;

    assert_eq!(json["max_files"], 20);
    assert_eq!(json["accepted_extensions"], serde_json::json!([".sol", ".solidity"]));
    assert_eq!(json["input_methods"][0]["id"], "github");
}

// ---------------------------------------------------------------------------
// Test: Unknown route returns 404
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_route_returns_404() {
    let app = common::build_test_app(&common::unreachable_api().await);
    let response = get(app, "/this-route-does-not-exist").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
