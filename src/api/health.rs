use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub checked_at: DateTime<Utc>,
    pub services: ServiceStatus,
}

#[derive(Serialize)]
pub struct ServiceStatus {
    pub analysis_api: AnalysisApiStatus,
}

#[derive(Serialize)]
pub struct AnalysisApiStatus {
    pub url: String,
    pub reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

#[derive(Serialize)]
pub struct PingResponse {
    pub status: &'static str,
}

/// Liveness probe. Answers immediately without touching the analysis API.
pub async fn ping() -> Json<PingResponse> {
    Json(PingResponse { status: "ok" })
}

/// Full health check: probes the analysis API base URL.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let probe = state.client.ping().await;
    if let Err(e) = &probe {
        tracing::warn!(error = %e, "Analysis API health probe failed");
    }

    let api = AnalysisApiStatus {
        url: state.client.base_url().to_string(),
        reachable: probe.is_ok(),
        latency_ms: probe.ok().map(|d| d.as_millis() as u64),
    };

    Json(HealthResponse {
        status: if api.reachable {
            "healthy".to_string()
        } else {
            "degraded".to_string()
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
        checked_at: Utc::now(),
        services: ServiceStatus { analysis_api: api },
    })
}
