use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::AppState;
use super::error::{ApiError, bad_request, intake_error, upstream_error, validation_error};
use super::results::ResultsView;
use crate::client::analysis_client::{
    DOWNLOAD_FAILED_MESSAGE, REPORT_FAILED_MESSAGE, RESULTS_FAILED_MESSAGE,
};
use crate::intake;
use crate::models::report::report_file_stem;
use crate::models::{DownloadFormat, GeneratedReport, ReportConfig, ReportTemplate};

// ============================================
// Request/Response Types
// ============================================

#[derive(Debug, Serialize)]
pub struct TemplateOption {
    pub id: &'static str,
    pub label: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ReportPageView {
    pub results: ResultsView,
    pub config: ReportConfig,
    pub templates: Vec<TemplateOption>,
    pub can_generate: bool,
}

#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    pub config: ReportConfig,
    pub vulnerability_id: String,
}

#[derive(Debug, Serialize)]
pub struct SelectionView {
    pub config: ReportConfig,
    /// Whether `vulnerability_id` is selected after the toggle.
    pub selected: bool,
    pub can_generate: bool,
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub config: ReportConfig,
}

#[derive(Debug, Serialize)]
pub struct GeneratedReportView {
    #[serde(flatten)]
    pub report: GeneratedReport,
    pub generated_at: DateTime<Utc>,
    pub download: String,
}

#[derive(Debug, Deserialize)]
pub struct DownloadRequest {
    pub markdown: String,
    #[serde(default)]
    pub format: DownloadFormat,
}

// ============================================
// Handlers
// ============================================

/// Report builder: the job's findings with every one selected.
pub async fn report_page(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<ReportPageView>, ApiError> {
    let job_id = intake::job_id(&job_id).map_err(intake_error)?;
    let results = state
        .client
        .results(job_id)
        .await
        .map_err(|e| upstream_error(e, RESULTS_FAILED_MESSAGE))?;

    let config = ReportConfig::with_all_selected(results.vulnerabilities.iter().map(|v| v.id.clone()));

    Ok(Json(ReportPageView {
        can_generate: config.can_submit(),
        config,
        templates: ReportTemplate::ALL
            .iter()
            .map(|t| TemplateOption {
                id: t.id(),
                label: t.label(),
                description: t.description(),
            })
            .collect(),
        results: ResultsView::new(job_id, results),
    }))
}

pub async fn toggle_selection(
    Path(_job_id): Path<String>,
    Json(req): Json<ToggleRequest>,
) -> Json<SelectionView> {
    let mut config = req.config;
    let selected = config.toggle(&req.vulnerability_id);

    Json(SelectionView {
        can_generate: config.can_submit(),
        selected,
        config,
    })
}

/// Render the report for the selected findings.
///
/// An empty selection is refused here, without calling the analysis API.
pub async fn generate_report(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<GeneratedReportView>, ApiError> {
    let job_id = intake::job_id(&job_id).map_err(intake_error)?;
    req.config.validate().map_err(validation_error)?;
    if !req.config.can_submit() {
        return Err(bad_request(
            "Please select at least one vulnerability",
            "EMPTY_SELECTION",
        ));
    }

    let report = state
        .client
        .generate_report(job_id, &req.config)
        .await
        .map_err(|e| upstream_error(e, REPORT_FAILED_MESSAGE))?;

    tracing::info!(
        job_id = %job_id,
        report_id = %report.report_id,
        selected = req.config.selected_vulnerabilities.len(),
        "Report generated"
    );

    Ok(Json(GeneratedReportView {
        report,
        generated_at: Utc::now(),
        download: format!("/report/{}/download", job_id),
    }))
}

/// Stream a rendered report back as an attachment named
/// `security_report_{job_id}.{md|pdf}`.
pub async fn download_report(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    Json(req): Json<DownloadRequest>,
) -> Result<Response, ApiError> {
    let job_id = intake::job_id(&job_id).map_err(intake_error)?;
    if req.markdown.trim().is_empty() {
        return Err(bad_request("Generate the report first", "EMPTY_REPORT"));
    }

    let stem = report_file_stem(job_id);
    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}.{}\"",
        stem,
        req.format.extension()
    ))
    .map_err(|_| bad_request("Job id cannot be used in a filename", "INVALID_JOB_ID"))?;

    let bytes = state
        .client
        .download_report(&req.markdown, req.format, &stem)
        .await
        .map_err(|e| upstream_error(e, DOWNLOAD_FAILED_MESSAGE))?;

    Ok((
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static(req.format.content_type()),
            ),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}
