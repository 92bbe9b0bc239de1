// HTTP client for the remote analysis API

use std::time::{Duration, Instant};

use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::intake;
use crate::models::analysis::ValidationBody;
use crate::models::{
    AnalysisRequest, AnalysisResults, DownloadFormat, GeneratedReport, JobSnapshot, ReportConfig,
    RepositoryValidation, StartedAnalysis,
};

// ============================================
// Configuration Constants
// ============================================

/// Connection timeout for reaching the analysis API
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Report downloads may render a PDF upstream
const DOWNLOAD_TIMEOUT_SECS: u64 = 120;

/// Timeout for the reachability probe used by `/health`
const PING_TIMEOUT_SECS: u64 = 5;

// Messages surfaced when the API rejects a request without saying why
pub const INVALID_REPOSITORY_MESSAGE: &str = "Invalid repository URL";
pub const START_FAILED_MESSAGE: &str = "Analysis failed to start";
pub const STATUS_FAILED_MESSAGE: &str = "Failed to check progress";
pub const RESULTS_FAILED_MESSAGE: &str = "Failed to fetch results";
pub const REPORT_FAILED_MESSAGE: &str = "Failed to generate report";
pub const DOWNLOAD_FAILED_MESSAGE: &str = "Download failed";

// ============================================
// Errors
// ============================================

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The configured base URL cannot carry API paths.
    #[error("invalid analysis API URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// Network, DNS, TLS or timeout failure.
    #[error("analysis API request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// A success response whose body did not match the expected shape.
    #[error("malformed analysis API response: {0}")]
    Decode(#[from] serde_json::Error),

    /// A job id that cannot be sent as one path segment.
    #[error("invalid job id '{0}'")]
    InvalidJobId(String),

    /// Non-2xx status, or a payload that refuses the request.
    #[error("analysis API rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
}

impl ClientError {
    /// The message the API gave for a rejection.
    pub fn rejection_message(&self) -> Option<&str> {
        match self {
            ClientError::Rejected { message, .. } => Some(message),
            _ => None,
        }
    }

    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            ClientError::Rejected { status, .. } => Some(*status),
            ClientError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

// ============================================
// Client Implementation
// ============================================

#[derive(Debug, Clone)]
pub struct AnalysisClient {
    http: reqwest::Client,
    base_url: Url,
}

impl AnalysisClient {
    /// Create a client for the analysis API at `base_url`.
    ///
    /// `timeout` bounds every JSON request; report downloads get a longer
    /// allowance.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(timeout)
            .build()?;

        Self::with_client(http, base_url)
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(http: reqwest::Client, base_url: &str) -> Result<Self, ClientError> {
        let parsed = Url::parse(base_url).map_err(|e| ClientError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;

        if parsed.cannot_be_a_base() || !matches!(parsed.scheme(), "http" | "https") {
            return Err(ClientError::InvalidBaseUrl {
                url: base_url.to_string(),
                reason: "expected an http(s) URL".to_string(),
            });
        }

        Ok(Self {
            http,
            base_url: parsed,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Validate a GitHub repository URL.
    ///
    /// The API answers invalid repositories with `valid: false` (usually
    /// alongside a 4xx status); that is returned as
    /// [`RepositoryValidation::Invalid`], not as an error.
    ///
    /// # Errors
    /// - `Transport`: the API is unreachable
    /// - `Rejected`: the API failed without a validation verdict
    pub async fn validate_repository(
        &self,
        repo_url: &str,
    ) -> Result<RepositoryValidation, ClientError> {
        let response = self
            .http
            .post(self.endpoint(&["api", "github", "validate"]))
            .json(&serde_json::json!({ "url": repo_url }))
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        let body: ValidationBody = match serde_json::from_str(&text) {
            Ok(body) => body,
            Err(e) if status.is_success() => return Err(e.into()),
            Err(_) => return Err(rejection(status, &text, INVALID_REPOSITORY_MESSAGE)),
        };

        match body.valid {
            Some(true) if status.is_success() => {
                let files = body.file_paths();
                Ok(RepositoryValidation::Valid {
                    repository: body.repository,
                    solidity_files: body.solidity_files.unwrap_or(files.len() as u32),
                    files,
                })
            }
            Some(_) => {
                let message = non_blank(body.message.as_deref())
                    .unwrap_or(INVALID_REPOSITORY_MESSAGE)
                    .to_string();
                tracing::debug!(repo_url, %message, "Repository rejected by analysis API");
                Ok(RepositoryValidation::Invalid { message })
            }
            None => Err(ClientError::Rejected {
                status: status.as_u16(),
                message: non_blank(body.error.as_deref())
                    .or_else(|| non_blank(body.message.as_deref()))
                    .unwrap_or(INVALID_REPOSITORY_MESSAGE)
                    .to_string(),
            }),
        }
    }

    /// Submit a repository or a file set for analysis. Returns the job id.
    pub async fn start_analysis(&self, request: &AnalysisRequest) -> Result<String, ClientError> {
        let response = self
            .http
            .post(self.endpoint(&["api", "analyze"]))
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let started: StartedAnalysis = parse_response(response, START_FAILED_MESSAGE).await?;

        if intake::job_id(&started.job_id).is_err() {
            tracing::warn!(job_id = %started.job_id, "Analysis API issued an unusable job id");
            return Err(ClientError::Rejected {
                status: status.as_u16(),
                message: START_FAILED_MESSAGE.to_string(),
            });
        }

        tracing::info!(job_id = %started.job_id, "Analysis job started");
        Ok(started.job_id)
    }

    /// Read the current snapshot of a job.
    pub async fn job_status(&self, job_id: &str) -> Result<JobSnapshot, ClientError> {
        let response = self
            .http
            .get(self.endpoint(&["api", "status", checked(job_id)?]))
            .send()
            .await?;

        parse_response(response, STATUS_FAILED_MESSAGE).await
    }

    /// Fetch the results of a completed job.
    pub async fn results(&self, job_id: &str) -> Result<AnalysisResults, ClientError> {
        let response = self
            .http
            .get(self.endpoint(&["api", "results", checked(job_id)?]))
            .send()
            .await?;

        parse_response(response, RESULTS_FAILED_MESSAGE).await
    }

    /// Ask the API to render a report for the selected findings of a job.
    pub async fn generate_report(
        &self,
        job_id: &str,
        config: &ReportConfig,
    ) -> Result<GeneratedReport, ClientError> {
        let job_id = checked(job_id)?;
        let response = self
            .http
            .post(self.endpoint(&["api", "report", "generate"]))
            .json(&serde_json::json!({
                "job_id": job_id,
                "config": config,
            }))
            .send()
            .await?;

        parse_response(response, REPORT_FAILED_MESSAGE).await
    }

    /// Render report markdown into a downloadable file.
    pub async fn download_report(
        &self,
        markdown: &str,
        format: DownloadFormat,
        filename: &str,
    ) -> Result<Vec<u8>, ClientError> {
        let response = self
            .http
            .post(self.endpoint(&["api", "report", "download"]))
            .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
            .json(&serde_json::json!({
                "markdown": markdown,
                "format": format,
                "filename": filename,
            }))
            .send()
            .await?;

        let response = ensure_success(response, DOWNLOAD_FAILED_MESSAGE).await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// Reachability probe. Any HTTP answer counts as reachable.
    pub async fn ping(&self) -> Result<Duration, ClientError> {
        let started = Instant::now();
        self.http
            .get(self.base_url.clone())
            .timeout(Duration::from_secs(PING_TIMEOUT_SECS))
            .send()
            .await?;
        Ok(started.elapsed())
    }

    /// Join path segments onto the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // Base URLs are checked to be hierarchical in `with_client`.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

// ---- response helpers ----

/// `.` and `..` would be dropped by URL path normalisation, so only ids
/// that pass the intake check are sent.
fn checked(job_id: &str) -> Result<&str, ClientError> {
    intake::job_id(job_id).map_err(|_| ClientError::InvalidJobId(job_id.to_string()))
}

async fn ensure_success(
    response: reqwest::Response,
    fallback: &str,
) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<unreadable body>".to_string());
    let err = rejection(status, &body, fallback);
    tracing::warn!(status = status.as_u16(), error = %err, "Analysis API returned an error");
    Err(err)
}

async fn parse_response<T: DeserializeOwned>(
    response: reqwest::Response,
    fallback: &str,
) -> Result<T, ClientError> {
    let response = ensure_success(response, fallback).await?;
    let text = response.text().await?;
    Ok(serde_json::from_str(&text)?)
}

/// Build a rejection, preferring the `error` then `message` field of a
/// JSON body over `fallback`.
fn rejection(status: StatusCode, body: &str, fallback: &str) -> ClientError {
    let parsed = serde_json::from_str::<serde_json::Value>(body).ok();
    let message = parsed
        .as_ref()
        .and_then(|v| {
            ["error", "message"]
                .iter()
                .find_map(|key| non_blank(v.get(key).and_then(|m| m.as_str())))
        })
        .unwrap_or(fallback)
        .to_string();

    ClientError::Rejected {
        status: status.as_u16(),
        message,
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> AnalysisClient {
        AnalysisClient::with_client(reqwest::Client::new(), base).unwrap()
    }

    #[test]
    fn endpoint_joins_onto_bare_host() {
        let c = client("http://127.0.0.1:5000");
        assert_eq!(
            c.endpoint(&["api", "status", "abc"]).as_str(),
            "http://127.0.0.1:5000/api/status/abc"
        );
    }

    #[test]
    fn endpoint_keeps_base_path_prefix() {
        let c = client("https://scanner.example.com/smcvd/");
        assert_eq!(
            c.endpoint(&["api", "analyze"]).as_str(),
            "https://scanner.example.com/smcvd/api/analyze"
        );
    }

    #[test]
    fn job_id_is_encoded_as_one_segment() {
        let c = client("http://localhost:5000");
        let url = c.endpoint(&["api", "results", "../admin?x=1"]);
        assert_eq!(url.path(), "/api/results/..%2Fadmin%3Fx=1");
        assert_eq!(url.query(), None);
    }

    #[tokio::test]
    async fn dot_segment_job_ids_never_leave_the_client() {
        // Nothing listens on port 9; a request would fail as Transport.
        let c = client("http://127.0.0.1:9");
        for id in [".", ".."] {
            assert!(matches!(
                c.job_status(id).await,
                Err(ClientError::InvalidJobId(ref bad)) if bad == id
            ));
            assert!(matches!(
                c.results(id).await,
                Err(ClientError::InvalidJobId(_))
            ));
        }
    }

    #[test]
    fn rejects_non_http_base_urls() {
        for base in ["not a url", "mailto:team@example.com", "ftp://example.com"] {
            let result = AnalysisClient::with_client(reqwest::Client::new(), base);
            assert!(
                matches!(result, Err(ClientError::InvalidBaseUrl { .. })),
                "{base} should be rejected"
            );
        }
    }

    #[test]
    fn rejection_prefers_error_then_message_then_fallback() {
        let err = rejection(StatusCode::BAD_REQUEST, r#"{"error":"No data provided"}"#, "x");
        assert_eq!(err.rejection_message(), Some("No data provided"));

        let err = rejection(StatusCode::NOT_FOUND, r#"{"message":"not found"}"#, "x");
        assert_eq!(err.rejection_message(), Some("not found"));
        assert_eq!(err.upstream_status(), Some(404));

        let err = rejection(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>", "fallback");
        assert_eq!(err.rejection_message(), Some("fallback"));

        let err = rejection(StatusCode::INTERNAL_SERVER_ERROR, r#"{"error":"  "}"#, "fallback");
        assert_eq!(err.rejection_message(), Some("fallback"));
    }
}
