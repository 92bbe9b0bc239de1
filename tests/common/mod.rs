#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, Response, header::CONTENT_TYPE};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use smcvd_console::api::AppState;
use smcvd_console::build_router;
use smcvd_console::client::AnalysisClient;
use smcvd_console::config::Config;

/// Config pointed at `api_url` with millisecond polling so streams finish
/// quickly under real time.
pub fn test_config(api_url: &str) -> Config {
    Config {
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        analysis_api_url: api_url.to_string(),
        request_timeout_secs: 5,
        poll_interval_ms: 10,
        completion_delay_ms: 10,
        ..Config::default()
    }
}

/// Full application router talking to the analysis API at `api_url`.
pub fn build_test_app(api_url: &str) -> Router {
    let config = test_config(api_url);
    let client = AnalysisClient::new(&config.analysis_api_url, config.request_timeout())
        .expect("test API URL is valid");
    build_router(AppState::new(client, config))
}

/// Serve `router` as a stand-in analysis API on an ephemeral port and
/// return its base URL.
pub async fn spawn_stub(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub listener");
    let addr = listener.local_addr().expect("stub address");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("stub server");
    });
    format!("http://{}", addr)
}

/// A base URL nothing is listening on.
pub async fn unreachable_api() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind probe listener");
    let addr = listener.local_addr().expect("probe address");
    drop(listener);
    format!("http://{}", addr)
}

/// Shared request counter for stub handlers.
#[derive(Clone, Default)]
pub struct Hits(Arc<AtomicUsize>);

impl Hits {
    pub fn hit(&self) -> usize {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = body_bytes(response).await;
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}

/// Wait long enough for a few more poll intervals to have elapsed.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(100)).await;
}

/// Results payload with one high and two low findings.
pub fn sample_results() -> Value {
    serde_json::json!({
        "summary": {
            "total_files": 3,
            "files_analyzed": 3,
            "vulnerabilities_found": 3,
            "severity_breakdown": {"critical": 0, "high": 1, "medium": 0, "low": 2, "info": 0}
        },
        "vulnerabilities": [
            {
                "id": "vuln-1",
                "name": "Reentrancy",
                "severity": "high",
                "file_path": "contracts/Vault.sol",
                "line_number": 42,
                "function_name": "withdraw",
                "description": "External call before state update",
                "confidence": 0.87
            },
            {
                "id": "vuln-2",
                "name": "Floating pragma",
                "severity": "low",
                "file_path": "contracts/Token.sol",
                "line_number": 1,
                "function_name": "",
                "confidence": 0.5
            },
            {
                "id": "vuln-3",
                "name": "Unchecked return value",
                "severity": "LOW",
                "file_path": "contracts/Token.sol",
                "line_number": 77,
                "function_name": "transfer",
                "confidence": 0.64
            }
        ]
    })
}
