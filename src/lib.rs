//! View gateway for the smart contract vulnerability detection service.
//!
//! Serves JSON views for each screen of the product (landing, submission,
//! progress dashboard, results, report builder) on top of the analysis
//! API, plus a single [`poller::JobPoller`] that follows a job until it
//! finishes.

use std::time::Duration;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
};
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

pub mod api;
pub mod client;
pub mod config;
pub mod intake;
pub mod models;
pub mod poller;

use api::AppState;

/// Full application router: views, CORS, compression and request tracing.
pub fn build_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins()
        .iter()
        .filter_map(|s| s.parse::<HeaderValue>().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        // Cache preflight requests for 1 hour
        .max_age(Duration::from_secs(3600));

    api::routes::view_routes().with_state(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors)
            .layer(CompressionLayer::new()),
    )
}
