use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;

use super::AppState;
use super::error::{ApiError, intake_error, upstream_error};
use crate::client::analysis_client::RESULTS_FAILED_MESSAGE;
use crate::intake;
use crate::models::{AnalysisResults, ResultsSummary, Severity, Vulnerability};

#[derive(Debug, Serialize)]
pub struct SeverityCount {
    pub severity: Severity,
    pub count: u32,
}

#[derive(Debug, Serialize)]
pub struct FindingView {
    #[serde(flatten)]
    pub vulnerability: Vulnerability,
    pub location: String,
    pub confidence_percent: u8,
}

impl From<Vulnerability> for FindingView {
    fn from(vulnerability: Vulnerability) -> Self {
        Self {
            location: vulnerability.location(),
            confidence_percent: vulnerability.confidence_percent(),
            vulnerability,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ResultsView {
    pub job_id: String,
    pub summary: ResultsSummary,
    /// Only severities with at least one finding, highest first.
    pub severity_breakdown: Vec<SeverityCount>,
    pub vulnerabilities: Vec<FindingView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall_assessment: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<String>,
}

impl ResultsView {
    pub fn new(job_id: &str, results: AnalysisResults) -> Self {
        let severity_breakdown = results
            .summary
            .severity_breakdown
            .non_zero()
            .into_iter()
            .map(|(severity, count)| SeverityCount { severity, count })
            .collect();

        let report = (!results.vulnerabilities.is_empty()).then(|| format!("/report/{}", job_id));

        Self {
            job_id: job_id.to_string(),
            summary: results.summary,
            severity_breakdown,
            vulnerabilities: results
                .vulnerabilities
                .into_iter()
                .map(FindingView::from)
                .collect(),
            overall_assessment: results.overall_assessment,
            report,
        }
    }
}

pub async fn results_page(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<ResultsView>, ApiError> {
    let job_id = intake::job_id(&job_id).map_err(intake_error)?;
    let results = state
        .client
        .results(job_id)
        .await
        .map_err(|e| upstream_error(e, RESULTS_FAILED_MESSAGE))?;

    tracing::debug!(
        job_id = %job_id,
        findings = results.vulnerabilities.len(),
        "Loaded analysis results"
    );

    Ok(Json(ResultsView::new(job_id, results)))
}
