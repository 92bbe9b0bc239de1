use axum::{Json, http::StatusCode};
use serde::Serialize;

use crate::client::ClientError;
use crate::intake::IntakeError;
use crate::poller::PollError;

#[derive(Debug, Serialize, Clone)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Error half of every view handler's result.
pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn bad_request(message: impl Into<String>, code: &str) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::new(message, code)),
    )
}

pub fn intake_error(err: IntakeError) -> ApiError {
    let (status, Json(body)) = bad_request(err.to_string(), err.code());
    let body = match &err {
        IntakeError::InvalidFiles { rejected } => body.with_details(rejected.join(", ")),
        IntakeError::TooManyFiles { count, .. } => {
            body.with_details(format!("{} files selected", count))
        }
        _ => body,
    };
    (status, Json(body))
}

pub fn poll_error(err: PollError) -> ApiError {
    match err {
        PollError::EmptyJobId => intake_error(IntakeError::EmptyJobId),
        PollError::InvalidJobId => intake_error(IntakeError::InvalidJobId),
    }
}

/// Map a failed analysis API call onto a response.
///
/// Upstream 4xx rejections keep their status and message. Upstream 5xx
/// and transport failures become `502 Bad Gateway`; transport failures
/// show `fallback` rather than the low-level error.
pub fn upstream_error(err: ClientError, fallback: &str) -> ApiError {
    match &err {
        ClientError::Rejected { status, message } => {
            let passthrough = StatusCode::from_u16(*status)
                .ok()
                .filter(|s| s.is_client_error());
            match passthrough {
                Some(status) => (
                    status,
                    Json(ErrorResponse::new(message.clone(), "UPSTREAM_REJECTED")),
                ),
                None => (
                    StatusCode::BAD_GATEWAY,
                    Json(ErrorResponse::new(message.clone(), "UPSTREAM_ERROR")),
                ),
            }
        }
        ClientError::Transport(_) | ClientError::Decode(_) => {
            tracing::error!(error = %err, "Analysis API unavailable");
            (
                StatusCode::BAD_GATEWAY,
                Json(
                    ErrorResponse::new(fallback, "UPSTREAM_UNAVAILABLE")
                        .with_details(err.to_string()),
                ),
            )
        }
        ClientError::InvalidJobId(_) => intake_error(IntakeError::InvalidJobId),
        ClientError::InvalidBaseUrl { .. } => {
            tracing::error!(error = %err, "Analysis API is misconfigured");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(fallback, "CONFIG_ERROR")),
            )
        }
    }
}

/// Turn `validator` failures into a 400 naming the offending fields.
pub fn validation_error(errors: validator::ValidationErrors) -> ApiError {
    let mut fields: Vec<String> = errors
        .field_errors()
        .keys()
        .map(|k| k.to_string())
        .collect();
    fields.sort_unstable();
    (
        StatusCode::BAD_REQUEST,
        Json(
            ErrorResponse::new("Invalid request", "VALIDATION_FAILED")
                .with_details(fields.join(", ")),
        ),
    )
}
