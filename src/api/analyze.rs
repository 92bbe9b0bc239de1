use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::AppState;
use super::error::{ApiError, ErrorResponse, bad_request, intake_error, upstream_error, validation_error};
use crate::client::analysis_client::{INVALID_REPOSITORY_MESSAGE, START_FAILED_MESSAGE};
use crate::intake::{self, ACCEPTED_EXTENSIONS};
use crate::models::{AnalysisRequest, ContractFile, RepositoryInfo, RepositoryValidation};

// ============================================
// Constants
// ============================================

/// Repository files listed in a successful validation
const PREVIEW_FILES: usize = 10;

// ============================================
// Request/Response Types
// ============================================

#[derive(Debug, Serialize)]
pub struct InputMethod {
    pub id: &'static str,
    pub label: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Serialize)]
pub struct AnalyzePageView {
    pub input_methods: Vec<InputMethod>,
    pub accepted_extensions: Vec<&'static str>,
    pub max_files: usize,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ValidateRepositoryRequest {
    #[serde(default)]
    #[validate(length(max = 2048))]
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct RepositoryCheckView {
    pub can_start: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<RepositoryInfo>,
    pub solidity_files: u32,
    pub files: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    #[serde(default)]
    pub files: Vec<ContractFile>,
}

#[derive(Debug, Serialize)]
pub struct AcceptedFile {
    pub name: String,
    pub size: usize,
}

#[derive(Debug, Serialize)]
pub struct UploadView {
    pub accepted: Vec<AcceptedFile>,
    pub message: String,
}

/// Either a repository URL or an inline file batch.
#[derive(Debug, Deserialize, Validate)]
pub struct StartAnalysisRequest {
    #[serde(default)]
    #[validate(length(max = 2048))]
    pub github_url: Option<String>,
    #[serde(default)]
    pub files: Option<Vec<ContractFile>>,
}

#[derive(Debug, Serialize)]
pub struct StartedView {
    pub job_id: String,
    pub dashboard: String,
    pub events: String,
}

// ============================================
// Handlers
// ============================================

pub async fn analyze_page(State(state): State<AppState>) -> Json<AnalyzePageView> {
    Json(AnalyzePageView {
        input_methods: vec![
            InputMethod {
                id: "github",
                label: "GitHub Repository",
                description: "Analyze every Solidity file in a public repository",
            },
            InputMethod {
                id: "upload",
                label: "Upload Files",
                description: "Upload individual Solidity contracts",
            },
        ],
        accepted_extensions: ACCEPTED_EXTENSIONS.to_vec(),
        max_files: state.max_upload_files(),
    })
}

/// Check a repository URL with the analysis API.
///
/// An invalid repository is a normal answer (`can_start: false` with the
/// API's message), not an error response.
pub async fn validate_repository(
    State(state): State<AppState>,
    Json(req): Json<ValidateRepositoryRequest>,
) -> Result<Json<RepositoryCheckView>, ApiError> {
    req.validate().map_err(validation_error)?;
    let url = intake::repository_url(&req.url).map_err(intake_error)?;

    let validation = state
        .client
        .validate_repository(url)
        .await
        .map_err(|e| upstream_error(e, INVALID_REPOSITORY_MESSAGE))?;

    Ok(Json(repository_check(validation)))
}

/// Validate an upload batch without starting anything.
pub async fn upload_files(
    State(state): State<AppState>,
    Json(req): Json<UploadRequest>,
) -> Result<Json<UploadView>, ApiError> {
    let files = intake::accept_upload(req.files, state.max_upload_files()).map_err(intake_error)?;

    Ok(Json(UploadView {
        message: format!("{} Solidity files ready for analysis", files.len()),
        accepted: files
            .iter()
            .map(|f| AcceptedFile {
                name: f.name.clone(),
                size: f.size(),
            })
            .collect(),
    }))
}

/// Start a job from a repository URL or an upload batch.
///
/// Repository URLs are validated again with the analysis API first, so a
/// repository that failed validation can never be submitted.
pub async fn start_analysis(
    State(state): State<AppState>,
    Json(req): Json<StartAnalysisRequest>,
) -> Result<(StatusCode, Json<StartedView>), ApiError> {
    req.validate().map_err(validation_error)?;

    // A blank URL next to a file batch means the batch was chosen.
    let github_url = req
        .github_url
        .filter(|url| !url.trim().is_empty() || req.files.is_none());

    let request = match (github_url, req.files) {
        (Some(raw), _) => {
            let url = intake::repository_url(&raw).map_err(intake_error)?;
            let validation = state
                .client
                .validate_repository(url)
                .await
                .map_err(|e| upstream_error(e, INVALID_REPOSITORY_MESSAGE))?;

            if let RepositoryValidation::Invalid { message } = validation {
                tracing::info!(url = %url, %message, "Refusing to start analysis of invalid repository");
                return Err((
                    StatusCode::BAD_REQUEST,
                    Json(ErrorResponse::new(message, "INVALID_REPOSITORY")),
                ));
            }

            AnalysisRequest::Github {
                github_url: url.to_string(),
            }
        }
        (None, Some(files)) => {
            let files =
                intake::accept_upload(files, state.max_upload_files()).map_err(intake_error)?;
            AnalysisRequest::Files { files }
        }
        (None, None) => {
            return Err(bad_request(
                "Provide a GitHub repository URL or Solidity files",
                "MISSING_INPUT",
            ));
        }
    };

    let job_id = state
        .client
        .start_analysis(&request)
        .await
        .map_err(|e| upstream_error(e, START_FAILED_MESSAGE))?;

    Ok((
        StatusCode::CREATED,
        Json(StartedView {
            dashboard: format!("/dashboard/{}", job_id),
            events: format!("/analyze/{}/events", job_id),
            job_id,
        }),
    ))
}

fn repository_check(validation: RepositoryValidation) -> RepositoryCheckView {
    match validation {
        RepositoryValidation::Valid {
            repository,
            solidity_files,
            mut files,
        } => {
            files.truncate(PREVIEW_FILES);
            RepositoryCheckView {
                can_start: true,
                message: None,
                repository,
                solidity_files,
                files,
            }
        }
        RepositoryValidation::Invalid { message } => RepositoryCheckView {
            can_start: false,
            message: Some(message),
            repository: None,
            solidity_files: 0,
            files: Vec::new(),
        },
    }
}
