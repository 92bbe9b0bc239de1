use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::{
    Json,
    extract::{Path, State},
    response::sse::{Event, KeepAlive, KeepAliveStream, Sse},
};
use futures::stream::Stream;
use serde::Serialize;

use super::AppState;
use super::error::{ApiError, intake_error, poll_error, upstream_error};
use crate::client::analysis_client::STATUS_FAILED_MESSAGE;
use crate::intake;
use crate::models::{JobSnapshot, JobStatus, PIPELINE_STAGES};
use crate::poller::{FailureKind, PollEvent, PollSubscription};

// ============================================
// Pipeline steps
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    Completed,
    Active,
    Upcoming,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgressStep {
    pub id: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    pub state: StepState,
}

fn step_copy(stage: &JobStatus) -> (&'static str, &'static str, &'static str) {
    match stage {
        JobStatus::Initializing => (
            "initializing",
            "Initializing",
            "Setting up analysis environment",
        ),
        JobStatus::Fetching => ("fetching", "Fetching", "Downloading repository files"),
        JobStatus::Scanning => ("scanning", "Scanning", "Finding smart contract files"),
        JobStatus::Processing => ("processing", "Processing", "Analyzing contract code"),
        JobStatus::AiAnalysis => (
            "ai_analysis",
            "AI Analysis",
            "Running AI-powered vulnerability detection",
        ),
        _ => ("completed", "Completed", "Analysis finished successfully"),
    }
}

/// Mark each pipeline stage relative to `status`.
///
/// A completed job marks every step completed. Statuses outside the
/// pipeline (including `error`) leave every step upcoming.
pub fn progress_steps(status: &JobStatus) -> Vec<ProgressStep> {
    let current = status.stage_index();
    let finished = *status == JobStatus::Completed;

    PIPELINE_STAGES
        .iter()
        .enumerate()
        .map(|(index, stage)| {
            let (id, label, description) = step_copy(stage);
            let state = match current {
                _ if finished => StepState::Completed,
                Some(c) if index < c => StepState::Completed,
                Some(c) if index == c => StepState::Active,
                _ => StepState::Upcoming,
            };
            ProgressStep {
                id,
                label,
                description,
                state,
            }
        })
        .collect()
}

// ============================================
// Views
// ============================================

#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub job_id: String,
    pub status: JobStatus,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub steps: Vec<ProgressStep>,
    pub total_files: u32,
    pub files_analyzed: u32,
    pub vulnerabilities_found: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<String>,
}

impl DashboardView {
    pub fn from_snapshot(job_id: &str, snapshot: &JobSnapshot) -> Self {
        Self {
            job_id: job_id.to_string(),
            status: snapshot.status.clone(),
            progress: snapshot.progress,
            message: snapshot.message().map(str::to_string),
            steps: progress_steps(&snapshot.status),
            total_files: snapshot.total_files,
            files_analyzed: snapshot.files_analyzed,
            vulnerabilities_found: snapshot.vulnerabilities.len(),
            results: (snapshot.status == JobStatus::Completed).then(|| results_location(job_id)),
        }
    }
}

fn results_location(job_id: &str) -> String {
    format!("/results/{}", job_id)
}

#[derive(Debug, Serialize)]
struct CompletedPayload<'a> {
    job_id: &'a str,
    redirect: String,
}

#[derive(Debug, Serialize)]
struct FailedPayload<'a> {
    job_id: &'a str,
    kind: FailureKind,
    message: &'a str,
}

// ============================================
// SSE stream
// ============================================

/// Server-sent events for one job, driven by the stream's own poll
/// subscription. Dropping the stream (client disconnect) cancels polling.
pub struct ProgressEventStream {
    subscription: PollSubscription,
}

impl ProgressEventStream {
    pub fn new(subscription: PollSubscription) -> Self {
        Self { subscription }
    }

    fn to_sse(&self, event: PollEvent) -> Result<Event, axum::Error> {
        let job_id = self.subscription.job_id();
        match event {
            PollEvent::Progress(snapshot) => Event::default()
                .event("progress")
                .json_data(DashboardView::from_snapshot(job_id, &snapshot)),
            PollEvent::Completed(_) => Event::default().event("completed").json_data(
                CompletedPayload {
                    job_id,
                    redirect: results_location(job_id),
                },
            ),
            PollEvent::Failed(failure) => {
                Event::default().event("failed").json_data(FailedPayload {
                    job_id,
                    kind: failure.kind,
                    message: &failure.message,
                })
            }
        }
    }
}

impl Stream for ProgressEventStream {
    type Item = Result<Event, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match self.subscription.poll_event(cx) {
                Poll::Ready(Some(event)) => match self.to_sse(event) {
                    Ok(event) => return Poll::Ready(Some(Ok(event))),
                    Err(e) => {
                        tracing::warn!(error = %e, "Dropping unserializable progress event");
                    }
                },
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

// ============================================
// Handlers
// ============================================

/// One status read, shaped for the progress dashboard.
pub async fn dashboard_page(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<DashboardView>, ApiError> {
    let job_id = intake::job_id(&job_id).map_err(intake_error)?;
    let snapshot = state
        .client
        .job_status(job_id)
        .await
        .map_err(|e| upstream_error(e, STATUS_FAILED_MESSAGE))?;

    Ok(Json(DashboardView::from_snapshot(job_id, &snapshot)))
}

/// Live progress until the job completes or fails.
pub async fn progress_events(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Sse<KeepAliveStream<ProgressEventStream>>, ApiError> {
    let subscription = state.poller.watch(&job_id).map_err(poll_error)?;
    tracing::info!(job_id = %subscription.job_id(), "Streaming job progress");

    Ok(Sse::new(ProgressEventStream::new(subscription)).keep_alive(KeepAlive::default()))
}
