use axum::{
    Router,
    routing::{get, post},
};

use super::AppState;
use super::{analyze, dashboard, health, landing, report, results};

/// View routes
///
/// ## Probes
/// - GET  /ping - Liveness, no upstream calls
/// - GET  /health - Reachability of the analysis API
///
/// ## Landing
/// - GET  / - Product overview and navigation
///
/// ## Submission
/// - GET  /analyze - Submission page descriptor
/// - POST /analyze/validate - Validate a GitHub repository URL
/// - POST /analyze/upload - Check an upload batch of Solidity files
/// - POST /analyze/start - Start an analysis job
///
/// ## Progress
/// - GET  /dashboard/{job_id} - Status snapshot with pipeline steps
/// - GET  /analyze/{job_id}/events - SSE stream of progress until the job ends
///
/// ## Results
/// - GET  /results/{job_id} - Summary, severity breakdown and findings
///
/// ## Report
/// - GET  /report/{job_id} - Report builder with every finding selected
/// - POST /report/{job_id}/toggle - Flip one finding in the selection
/// - POST /report/{job_id}/generate - Render the report markdown
/// - POST /report/{job_id}/download - Download the report as markdown or PDF
pub fn view_routes() -> Router<AppState> {
    Router::new()
        // ========================================
        // Probes
        // ========================================
        .route("/ping", get(health::ping))
        .route("/health", get(health::health_check))
        // ========================================
        // Landing
        // ========================================
        .route("/", get(landing::landing_page))
        // ========================================
        // Submission
        // ========================================
        .route("/analyze", get(analyze::analyze_page))
        .route("/analyze/validate", post(analyze::validate_repository))
        .route("/analyze/upload", post(analyze::upload_files))
        .route("/analyze/start", post(analyze::start_analysis))
        // ========================================
        // Progress
        // ========================================
        .route("/dashboard/{job_id}", get(dashboard::dashboard_page))
        .route("/analyze/{job_id}/events", get(dashboard::progress_events))
        // ========================================
        // Results
        // ========================================
        .route("/results/{job_id}", get(results::results_page))
        // ========================================
        // Report
        // ========================================
        .route("/report/{job_id}", get(report::report_page))
        .route("/report/{job_id}/toggle", post(report::toggle_selection))
        .route("/report/{job_id}/generate", post(report::generate_report))
        .route("/report/{job_id}/download", post(report::download_report))
}
